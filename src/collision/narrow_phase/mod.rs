//! Exact overlap, penetration and distance queries between convex shapes.

mod epa;
mod gjk;
mod sat;

pub use epa::Epa;
pub use gjk::{Gjk, MinkowskiPoint, Simplex};
pub use sat::Sat;

use crate::geometry::{Circle, Shape};
use crate::math::{Transform, Vec2};
use crate::settings::{NarrowPhaseKind, Settings};

/// Minimum translation needed to separate two overlapping shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Unit normal pointing from shape A towards shape B
    pub normal: Vec2,
    /// Overlap depth along the normal, always positive
    pub depth: f32,
}

/// Closest-feature information for two separated shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    /// Unit normal pointing from shape A towards shape B
    pub normal: Vec2,
    /// Distance between the closest points
    pub distance: f32,
    /// Closest point on shape A (world space)
    pub point_a: Vec2,
    /// Closest point on shape B (world space)
    pub point_b: Vec2,
}

/// Overlap and penetration test between two convex shapes
pub trait NarrowPhaseDetector {
    /// Returns the penetration if the shapes overlap. Touching shapes do not
    /// overlap.
    fn detect(&self, shape_a: &Shape, transform_a: Transform, shape_b: &Shape, transform_b: Transform)
        -> Option<Penetration>;

    /// Boolean overlap test
    fn overlaps(&self, shape_a: &Shape, transform_a: Transform, shape_b: &Shape, transform_b: Transform) -> bool {
        self.detect(shape_a, transform_a, shape_b, transform_b).is_some()
    }
}

/// Minimum distance between two convex shapes
pub trait DistanceDetector {
    /// Returns `None` when the shapes overlap or touch
    fn distance(&self, shape_a: &Shape, transform_a: Transform, shape_b: &Shape, transform_b: Transform)
        -> Option<Separation>;
}

/// Creates the detector selected by the settings
pub fn create(kind: NarrowPhaseKind, settings: &Settings) -> Box<dyn NarrowPhaseDetector> {
    match kind {
        NarrowPhaseKind::Gjk => Box::new(Gjk::from_settings(settings)),
        NarrowPhaseKind::Sat => Box::new(Sat),
    }
}

/// Both shapes as circles, if they are
#[inline]
pub(crate) fn circle_pair<'a>(a: &'a Shape, b: &'a Shape) -> Option<(&'a Circle, &'a Circle)> {
    Some((a.as_circle()?, b.as_circle()?))
}

/// Closed-form circle/circle penetration
pub fn circle_penetration(
    circle_a: &Circle,
    transform_a: Transform,
    circle_b: &Circle,
    transform_b: Transform,
) -> Option<Penetration> {
    let ca = transform_a.transform_point(circle_a.center);
    let cb = transform_b.transform_point(circle_b.center);
    let radii = circle_a.radius + circle_b.radius;
    let (normal, distance) = (cb - ca).normalize_with_length();
    if distance >= radii {
        return None;
    }
    // concentric circles: any axis separates them equally well
    let normal = if distance > 0.0 { normal } else { Vec2::X };
    Some(Penetration {
        normal,
        depth: radii - distance,
    })
}

/// Closed-form circle/circle distance
pub fn circle_distance(
    circle_a: &Circle,
    transform_a: Transform,
    circle_b: &Circle,
    transform_b: Transform,
) -> Option<Separation> {
    let ca = transform_a.transform_point(circle_a.center);
    let cb = transform_b.transform_point(circle_b.center);
    let radii = circle_a.radius + circle_b.radius;
    let (normal, distance) = (cb - ca).normalize_with_length();
    if distance <= radii {
        return None;
    }
    Some(Separation {
        normal,
        distance: distance - radii,
        point_a: ca + normal * circle_a.radius,
        point_b: cb - normal * circle_b.radius,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_circle_penetration() {
        let a = Circle::new(1.0).expect("circle");
        let b = Circle::new(0.5).expect("circle");
        let ta = Transform::IDENTITY;
        let tb = Transform::from_position(Vec2::new(0.0, 1.25));

        let p = circle_penetration(&a, ta, &b, tb).expect("overlap");
        assert!(p.normal.distance(Vec2::Y) < EPSILON);
        assert!((p.depth - 0.25).abs() < EPSILON);

        // touching is not overlapping
        let touching = Transform::from_position(Vec2::new(1.5, 0.0));
        assert!(circle_penetration(&a, ta, &b, touching).is_none());

        let concentric = circle_penetration(&a, ta, &b, ta).expect("overlap");
        assert_eq!(concentric.normal, Vec2::X);
        assert!((concentric.depth - 1.5).abs() < EPSILON);
    }

    #[test]
    fn test_circle_distance() {
        let a = Circle::new(1.0).expect("circle");
        let b = Circle::with_center(1.0, Vec2::new(1.0, 0.0)).expect("circle");
        let sep = circle_distance(
            &a,
            Transform::IDENTITY,
            &b,
            Transform::from_position(Vec2::new(2.0, 0.0)),
        )
        .expect("separated");
        assert!((sep.distance - 1.0).abs() < EPSILON);
        assert!(sep.point_a.distance(Vec2::new(1.0, 0.0)) < EPSILON);
        assert!(sep.point_b.distance(Vec2::new(2.0, 0.0)) < EPSILON);
    }
}
