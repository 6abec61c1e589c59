use crate::math::Vec2;

/// A world-space vertex tagged with its index in the owning shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointFeature {
    pub point: Vec2,
    pub index: usize,
}

impl PointFeature {
    #[inline]
    pub const fn new(point: Vec2, index: usize) -> Self {
        Self { point, index }
    }
}

/// A world-space edge wound in the owning shape's counter-clockwise order.
///
/// `edge` is `v2 - v1`, so `edge.right()` is the outward face normal.
/// `max` is whichever endpoint was farthest along the query direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeFeature {
    pub v1: PointFeature,
    pub v2: PointFeature,
    pub max: PointFeature,
    pub edge: Vec2,
    /// Index of the edge in the owning shape
    pub index: usize,
}

impl EdgeFeature {
    #[inline]
    pub fn new(v1: PointFeature, v2: PointFeature, max: PointFeature, index: usize) -> Self {
        Self {
            v1,
            v2,
            max,
            edge: v2.point - v1.point,
            index,
        }
    }
}

/// The part of a shape farthest along a direction: a single vertex for round
/// shapes, otherwise the edge most perpendicular to the direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feature {
    Vertex(PointFeature),
    Edge(EdgeFeature),
}

/// A closed projection interval on an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    #[inline]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Length of the overlapping region; zero or negative when disjoint
    #[inline]
    pub fn overlap(self, other: Self) -> f32 {
        self.max.min(other.max) - self.min.max(other.min)
    }

    /// Returns true if `other` lies strictly inside this interval
    #[inline]
    pub fn contains_exclusive(self, other: Self) -> bool {
        other.min > self.min && other.max < self.max
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_overlap() {
        let a = Interval::new(0.0, 2.0);
        let b = Interval::new(1.5, 3.0);
        let c = Interval::new(2.5, 3.0);

        assert!((a.overlap(b) - 0.5).abs() < 1e-6);
        assert!(a.overlap(c) < 0.0);
        assert!(Interval::new(0.0, 4.0).contains_exclusive(Interval::new(1.0, 2.0)));
        assert!(!a.contains_exclusive(b));
    }

    #[test]
    fn test_edge_vector() {
        let v1 = PointFeature::new(Vec2::new(0.0, 0.0), 0);
        let v2 = PointFeature::new(Vec2::new(1.0, 0.0), 1);
        let edge = EdgeFeature::new(v1, v2, v2, 0);
        assert_eq!(edge.edge, Vec2::X);
        // outward normal of a counter-clockwise bottom edge points down
        assert_eq!(edge.edge.right(), Vec2::new(0.0, -1.0));
    }
}
