use crate::geometry::Shape;
use crate::math::{Transform, Vec2};

use super::{circle_pair, circle_penetration, NarrowPhaseDetector, Penetration};

/// Separating Axis Theorem detector.
///
/// Tests every face normal of both shapes plus the focus axes round shapes
/// need (circle center to the closest vertex). The axis with the smallest
/// overlap gives the penetration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sat;

impl Sat {
    /// Overlap on one axis, or `None` if the axis separates the shapes.
    /// The returned axis may be flipped when one projection contains the other.
    fn axis_overlap(
        axis: Vec2,
        shape_a: &Shape,
        transform_a: Transform,
        shape_b: &Shape,
        transform_b: Transform,
    ) -> Option<(f32, Vec2)> {
        let ia = shape_a.project(axis, transform_a);
        let ib = shape_b.project(axis, transform_b);
        let mut overlap = ia.overlap(ib);
        if overlap <= 0.0 {
            return None;
        }

        let mut axis = axis;
        if ia.contains_exclusive(ib) || ib.contains_exclusive(ia) {
            // containment: also count the distance to push the inner one out
            let max = (ia.max - ib.max).abs();
            let min = (ia.min - ib.min).abs();
            if max > min {
                axis = -axis;
                overlap += min;
            } else {
                overlap += max;
            }
        }
        Some((overlap, axis))
    }
}

impl NarrowPhaseDetector for Sat {
    fn detect(
        &self,
        shape_a: &Shape,
        transform_a: Transform,
        shape_b: &Shape,
        transform_b: Transform,
    ) -> Option<Penetration> {
        if let Some((circle_a, circle_b)) = circle_pair(shape_a, shape_b) {
            return circle_penetration(circle_a, transform_a, circle_b, transform_b);
        }

        let foci_a: Vec<Vec2> = shape_a.foci(transform_a).into_iter().collect();
        let foci_b: Vec<Vec2> = shape_b.foci(transform_b).into_iter().collect();
        let axes = shape_a
            .sat_axes(&foci_b, transform_a)
            .into_iter()
            .chain(shape_b.sat_axes(&foci_a, transform_b));

        let mut best: Option<(f32, Vec2)> = None;
        for axis in axes {
            if axis.is_near_zero(f32::EPSILON) {
                continue;
            }
            let (overlap, axis) = Self::axis_overlap(axis, shape_a, transform_a, shape_b, transform_b)?;
            if best.map_or(true, |(smallest, _)| overlap < smallest) {
                best = Some((overlap, axis));
            }
        }

        let (depth, mut normal) = best?;
        let center_to_center = shape_b.world_center(transform_b) - shape_a.world_center(transform_a);
        if center_to_center.dot(normal) < 0.0 {
            normal = -normal;
        }
        Some(Penetration { normal, depth })
    }
}

#[cfg(test)]
mod tests {
    use super::super::Gjk;
    use super::*;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_boxes() {
        let shape = Shape::rectangle(2.0, 2.0).expect("rectangle");
        let ta = Transform::IDENTITY;

        let p = Sat
            .detect(&shape, ta, &shape, Transform::from_position(Vec2::new(-1.6, 0.3)))
            .expect("overlap");
        assert!(p.normal.distance(-Vec2::X) < EPSILON);
        assert!((p.depth - 0.4).abs() < EPSILON);

        assert!(Sat
            .detect(&shape, ta, &shape, Transform::from_position(Vec2::new(2.0, 0.0)))
            .is_none());
    }

    #[test]
    fn test_circle_against_box_corner() {
        let rect = Shape::rectangle(2.0, 2.0).expect("rectangle");
        let circle = Shape::circle(0.5).expect("circle");
        let ta = Transform::IDENTITY;

        // near the corner but outside along the diagonal
        let outside = Transform::from_position(Vec2::new(1.4, 1.4));
        assert!(Sat.detect(&rect, ta, &circle, outside).is_none());

        let inside = Transform::from_position(Vec2::new(1.3, 1.3));
        let p = Sat.detect(&rect, ta, &circle, inside).expect("overlap");
        let expected_depth = 0.5 - (0.3f32 * 0.3 * 2.0).sqrt();
        assert!((p.depth - expected_depth).abs() < EPSILON);
        assert!(p.normal.x > 0.0 && p.normal.y > 0.0);
    }

    #[test]
    fn test_containment() {
        let big = Shape::rectangle(10.0, 10.0).expect("rectangle");
        let small = Shape::rectangle(1.0, 1.0).expect("rectangle");
        let p = Sat
            .detect(&big, Transform::IDENTITY, &small, Transform::from_position(Vec2::new(3.5, 0.0)))
            .expect("overlap");
        // the small box spans x in [3, 4]; pushing it past x = 5 takes 2
        assert!((p.depth - 2.0).abs() < EPSILON);
        assert!(p.normal.distance(Vec2::X) < EPSILON);
    }

    #[test]
    fn test_agrees_with_gjk_on_segments() {
        let segment = Shape::segment(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0)).expect("segment");
        let triangle = Shape::triangle(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0))
            .expect("triangle");
        let gjk = Gjk::default();
        for (x, y) in [(0.0, -0.5), (0.5, 0.2), (2.0, 0.0), (0.2, -0.1)] {
            let tb = Transform::from_position(Vec2::new(x, y));
            assert_eq!(
                Sat.overlaps(&segment, Transform::IDENTITY, &triangle, tb),
                gjk.overlaps(&segment, Transform::IDENTITY, &triangle, tb),
                "disagreement at ({x}, {y})"
            );
        }
    }
}
