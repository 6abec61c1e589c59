use crate::math::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box defined by minimum and maximum points.
///
/// Used for broad-phase pair pruning, bounds checks and ray-cast culling.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner (smallest x, y values)
    pub min: Vec2,
    /// Maximum corner (largest x, y values)
    pub max: Vec2,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// An empty AABB that contains no points
    pub const EMPTY: Self = Self {
        min: Vec2::new(f32::INFINITY, f32::INFINITY),
        max: Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    /// Creates an AABB from minimum and maximum points
    #[inline]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates an AABB from center and half-extents
    #[inline]
    pub fn from_center_half_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Creates an AABB from a slice of points
    #[inline]
    pub fn from_points(points: &[Vec2]) -> Self {
        points
            .iter()
            .fold(Self::EMPTY, |aabb, &point| aabb.expand_to_include(point))
    }

    /// Returns the center of the AABB
    #[inline]
    pub fn center(self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Returns the half-extents (half the size in each dimension)
    #[inline]
    pub fn half_extents(self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Returns the full size (extents) of the AABB
    #[inline]
    pub fn size(self) -> Vec2 {
        self.max - self.min
    }

    /// Returns the area of the AABB
    #[inline]
    pub fn area(self) -> f32 {
        let size = self.size();
        size.x * size.y
    }

    /// Returns the perimeter of the AABB, the 2D surface-area-heuristic cost
    #[inline]
    pub fn perimeter(self) -> f32 {
        let size = self.size();
        2.0 * (size.x + size.y)
    }

    /// Returns true if this AABB is valid (min <= max in all dimensions)
    #[inline]
    pub fn is_valid(self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    /// Returns true if this AABB contains the given point
    #[inline]
    pub fn contains_point(self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Returns true if this AABB fully contains another AABB
    #[inline]
    pub fn contains_aabb(self, other: Self) -> bool {
        self.min.x <= other.min.x
            && self.max.x >= other.max.x
            && self.min.y <= other.min.y
            && self.max.y >= other.max.y
    }

    /// Returns true if this AABB intersects another AABB (touching counts)
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Returns a new AABB that is the union of this and another AABB
    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns a new AABB expanded to include a point
    #[inline]
    pub fn expand_to_include(self, point: Vec2) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    /// Returns a new AABB expanded by a margin in all directions
    #[inline]
    pub fn expand(self, margin: f32) -> Self {
        let m = Vec2::splat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Returns a new AABB stretched along a displacement.
    ///
    /// Only the side the displacement points to grows.
    #[inline]
    pub fn extend_along(self, displacement: Vec2) -> Self {
        let mut aabb = self;
        if displacement.x < 0.0 {
            aabb.min.x += displacement.x;
        } else {
            aabb.max.x += displacement.x;
        }
        if displacement.y < 0.0 {
            aabb.min.y += displacement.y;
        } else {
            aabb.max.y += displacement.y;
        }
        aabb
    }

    /// Returns a copy translated by `delta`
    #[inline]
    pub fn translated(self, delta: Vec2) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Tests intersection with a ray.
    /// Returns Some((t_min, t_max)) if the ray intersects, where t_min and t_max
    /// are the entry and exit distances along the ray.
    #[inline]
    pub fn ray_intersection(self, origin: Vec2, direction: Vec2) -> Option<(f32, f32)> {
        let inv_dir = Vec2::new(1.0 / direction.x, 1.0 / direction.y);

        let t1 = (self.min.x - origin.x) * inv_dir.x;
        let t2 = (self.max.x - origin.x) * inv_dir.x;
        let t3 = (self.min.y - origin.y) * inv_dir.y;
        let t4 = (self.max.y - origin.y) * inv_dir.y;

        let t_min = t1.min(t2).max(t3.min(t4));
        let t_max = t1.max(t2).min(t3.max(t4));

        if t_max >= t_min && t_max >= 0.0 {
            Some((t_min.max(0.0), t_max))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation() {
        let aabb = Aabb::new(Vec2::new(-1.0, -2.0), Vec2::new(1.0, 2.0));
        assert_eq!(aabb.center(), Vec2::ZERO);
        assert_eq!(aabb.half_extents(), Vec2::new(1.0, 2.0));
        assert_eq!(aabb.perimeter(), 12.0);
        assert_eq!(aabb.area(), 8.0);
    }

    #[test]
    fn test_intersects() {
        let a = Aabb::new(Vec2::ZERO, Vec2::ONE);
        let b = Aabb::new(Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5));
        let c = Aabb::new(Vec2::new(2.0, 0.0), Vec2::new(3.0, 1.0));

        assert!(a.intersects(b));
        assert!(b.intersects(a));
        assert!(!a.intersects(c));
    }

    #[test]
    fn test_union_and_contains() {
        let a = Aabb::new(Vec2::ZERO, Vec2::ONE);
        let b = Aabb::new(Vec2::new(2.0, 2.0), Vec2::new(3.0, 3.0));
        let u = a.union(b);

        assert_eq!(u.min, Vec2::ZERO);
        assert_eq!(u.max, Vec2::new(3.0, 3.0));
        assert!(u.contains_aabb(a));
        assert!(u.contains_aabb(b));
        assert!(!a.contains_aabb(u));
    }

    #[test]
    fn test_expand() {
        let aabb = Aabb::new(Vec2::ZERO, Vec2::ONE).expand(0.5);
        assert_eq!(aabb.min, Vec2::new(-0.5, -0.5));
        assert_eq!(aabb.max, Vec2::new(1.5, 1.5));
    }

    #[test]
    fn test_extend_along_grows_one_side() {
        let aabb = Aabb::new(Vec2::ZERO, Vec2::ONE).extend_along(Vec2::new(2.0, -1.0));
        assert_eq!(aabb.min, Vec2::new(0.0, -1.0));
        assert_eq!(aabb.max, Vec2::new(3.0, 1.0));
    }

    #[test]
    fn test_ray_intersection() {
        let aabb = Aabb::new(Vec2::ZERO, Vec2::ONE);

        let (t_min, t_max) = aabb
            .ray_intersection(Vec2::new(-1.0, 0.5), Vec2::X)
            .expect("ray should hit");
        assert!((t_min - 1.0).abs() < 1e-6);
        assert!((t_max - 2.0).abs() < 1e-6);

        assert!(aabb.ray_intersection(Vec2::new(-1.0, 2.0), Vec2::X).is_none());
    }

    #[test]
    fn test_from_points() {
        let points = [Vec2::new(1.0, 2.0), Vec2::new(-1.0, 0.0), Vec2::new(0.0, -2.0)];
        let aabb = Aabb::from_points(&points);

        assert_eq!(aabb.min, Vec2::new(-1.0, -2.0));
        assert_eq!(aabb.max, Vec2::new(1.0, 2.0));
    }
}
