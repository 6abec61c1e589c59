use crate::geometry::{closest_point_on_segment, Shape};
use crate::math::{Transform, Vec2};
use crate::settings::Settings;

use super::epa::Epa;
use super::{circle_distance, circle_pair, circle_penetration};
use super::{DistanceDetector, NarrowPhaseDetector, Penetration, Separation};

/// Lower bound on the iteration cap
pub const MIN_ITERATIONS: usize = 5;

/// A point of the Minkowski difference `A - B`, tagged with the support
/// points on each shape that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinkowskiPoint {
    pub point: Vec2,
    pub support_a: Vec2,
    pub support_b: Vec2,
}

impl MinkowskiPoint {
    /// Support point of `A - B` in a world direction
    #[inline]
    pub fn support(
        shape_a: &Shape,
        transform_a: Transform,
        shape_b: &Shape,
        transform_b: Transform,
        direction: Vec2,
    ) -> Self {
        let support_a = shape_a.support_world(transform_a, direction);
        let support_b = shape_b.support_world(transform_b, -direction);
        Self {
            point: support_a - support_b,
            support_a,
            support_b,
        }
    }
}

/// At most three Minkowski points; the newest point is last
#[derive(Debug, Clone, Copy)]
pub struct Simplex {
    points: [MinkowskiPoint; 3],
    len: usize,
}

impl Simplex {
    fn new(first: MinkowskiPoint) -> Self {
        Self {
            points: [first; 3],
            len: 1,
        }
    }

    fn push(&mut self, point: MinkowskiPoint) {
        debug_assert!(self.len < 3);
        self.points[self.len] = point;
        self.len += 1;
    }

    /// Removes point at index and shifts remaining points
    fn remove(&mut self, index: usize) {
        debug_assert!(index < self.len);
        for i in index..self.len - 1 {
            self.points[i] = self.points[i + 1];
        }
        self.len -= 1;
    }

    /// The points in insertion order
    #[inline]
    pub fn points(&self) -> &[MinkowskiPoint] {
        &self.points[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn last(&self) -> Vec2 {
        self.points[self.len - 1].point
    }
}

/// Gilbert–Johnson–Keerthi overlap and distance detector.
///
/// Overlap queries hand their terminal simplex to [`Epa`] for the
/// penetration vector. Circle pairs skip both and use closed forms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gjk {
    max_iterations: usize,
    distance_epsilon: f32,
    epa: Epa,
}

impl Default for Gjk {
    fn default() -> Self {
        Self::new(100, 1e-6, Epa::default())
    }
}

impl Gjk {
    /// Creates a detector; the iteration cap never drops below
    /// [`MIN_ITERATIONS`]
    pub fn new(max_iterations: usize, distance_epsilon: f32, epa: Epa) -> Self {
        Self {
            max_iterations: max_iterations.max(MIN_ITERATIONS),
            distance_epsilon,
            epa,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.gjk_max_iterations(),
            settings.gjk_distance_epsilon(),
            Epa::new(settings.epa_max_iterations(), settings.epa_epsilon()),
        )
    }

    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    #[inline]
    pub fn distance_epsilon(&self) -> f32 {
        self.distance_epsilon
    }

    /// Runs the overlap test. On overlap, returns the triangle that encloses
    /// the origin.
    pub fn intersect(
        &self,
        shape_a: &Shape,
        transform_a: Transform,
        shape_b: &Shape,
        transform_b: Transform,
    ) -> Option<Simplex> {
        let support = |d: Vec2| MinkowskiPoint::support(shape_a, transform_a, shape_b, transform_b, d);

        let mut d = shape_b.world_center(transform_b) - shape_a.world_center(transform_a);
        if d.is_near_zero(f32::EPSILON) {
            d = Vec2::X;
        }

        let mut simplex = Simplex::new(support(d));
        if simplex.last().dot(d) <= 0.0 {
            return None;
        }
        d = -d;

        for _ in 0..self.max_iterations {
            let point = support(d);
            // the new point did not pass the origin, so A - B cannot contain it
            if point.point.dot(d) <= 0.0 {
                return None;
            }
            simplex.push(point);
            if check_simplex(&mut simplex, &mut d) {
                return Some(simplex);
            }
        }

        log::trace!("gjk hit the iteration cap of {}", self.max_iterations);
        None
    }
}

/// Reduces the simplex to the feature closest to the origin and picks the
/// next search direction. Returns true once a triangle encloses the origin.
fn check_simplex(simplex: &mut Simplex, d: &mut Vec2) -> bool {
    let a = simplex.last();
    let ao = -a;

    if simplex.len() == 3 {
        let b = simplex.points[1].point;
        let c = simplex.points[0].point;
        let ab = b - a;
        let ac = c - a;

        let ac_perp = Vec2::triple_product(ab, ac, ac);
        if ac_perp.dot(ao) >= 0.0 {
            // origin is beyond edge AC
            simplex.remove(1);
            *d = ac_perp;
            return false;
        }

        let ab_perp = Vec2::triple_product(ac, ab, ab);
        if ab_perp.dot(ao) < 0.0 {
            return true;
        }
        // origin is beyond edge AB
        simplex.remove(0);
        *d = ab_perp;
    } else {
        let b = simplex.points[0].point;
        let ab = b - a;
        *d = Vec2::triple_product(ab, ao, ab);
        if d.is_near_zero(f32::EPSILON) {
            // origin lies on the segment; either side will do
            *d = ab.perp();
        }
    }
    false
}

/// True if the triangle `abc` contains the origin
fn contains_origin(a: Vec2, b: Vec2, c: Vec2) -> bool {
    let sa = a.cross(b);
    let sb = b.cross(c);
    let sc = c.cross(a);
    sa * sb > 0.0 && sa * sc > 0.0
}

/// Closest points on the two shapes, reconstructed from the support points
/// behind the segment `a`-`b` of the Minkowski difference
fn closest_points(a: &MinkowskiPoint, b: &MinkowskiPoint) -> (Vec2, Vec2) {
    let l = b.point - a.point;
    let ll = l.length_squared();
    if ll <= f32::EPSILON * f32::EPSILON {
        return (a.support_a, a.support_b);
    }
    let t = -l.dot(a.point) / ll;
    if t >= 1.0 {
        (b.support_a, b.support_b)
    } else if t <= 0.0 {
        (a.support_a, a.support_b)
    } else {
        let s = 1.0 - t;
        (
            a.support_a * s + b.support_a * t,
            a.support_b * s + b.support_b * t,
        )
    }
}

impl NarrowPhaseDetector for Gjk {
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
        let simplex = self.intersect(shape_a, transform_a, shape_b, transform_b)?;
        self.epa
            .penetration(&simplex, shape_a, transform_a, shape_b, transform_b)
    }

    fn overlaps(&self, shape_a: &Shape, transform_a: Transform, shape_b: &Shape, transform_b: Transform) -> bool {
        if let Some((circle_a, circle_b)) = circle_pair(shape_a, shape_b) {
            return circle_penetration(circle_a, transform_a, circle_b, transform_b).is_some();
        }
        self.intersect(shape_a, transform_a, shape_b, transform_b).is_some()
    }
}

impl DistanceDetector for Gjk {
    fn distance(
        &self,
        shape_a: &Shape,
        transform_a: Transform,
        shape_b: &Shape,
        transform_b: Transform,
    ) -> Option<Separation> {
        if let Some((circle_a, circle_b)) = circle_pair(shape_a, shape_b) {
            return circle_distance(circle_a, transform_a, circle_b, transform_b);
        }
        let support = |d: Vec2| MinkowskiPoint::support(shape_a, transform_a, shape_b, transform_b, d);

        let mut d = shape_b.world_center(transform_b) - shape_a.world_center(transform_a);
        if d.is_near_zero(f32::EPSILON) {
            // coincident centers always overlap
            return None;
        }

        let mut a = support(d);
        let mut b = support(-d);
        // closest point of the current segment to the origin
        let mut closest = closest_point_on_segment(Vec2::ZERO, b.point, a.point);
        let epsilon_sq = self.distance_epsilon * self.distance_epsilon;

        for _ in 0..self.max_iterations {
            d = -closest;
            if d.length_squared() <= epsilon_sq {
                // the origin is on the segment: touching or overlapping
                return None;
            }

            let c = support(d);
            if contains_origin(a.point, b.point, c.point) {
                return None;
            }

            let direction = d.normalize();
            let progress = (c.point - a.point).dot(direction);
            if progress < self.distance_epsilon || c.point == a.point || c.point == b.point {
                let (point_a, point_b) = closest_points(&a, &b);
                return Some(Separation {
                    normal: direction,
                    distance: -c.point.dot(direction),
                    point_a,
                    point_b,
                });
            }

            let p1 = closest_point_on_segment(Vec2::ZERO, a.point, c.point);
            let p2 = closest_point_on_segment(Vec2::ZERO, c.point, b.point);
            if p1.length_squared() < p2.length_squared() {
                b = c;
                closest = p1;
            } else {
                a = c;
                closest = p2;
            }
        }

        log::trace!("gjk distance hit the iteration cap of {}", self.max_iterations);
        let (normal, distance) = (-closest).normalize_with_length();
        if distance <= self.distance_epsilon {
            return None;
        }
        let (point_a, point_b) = closest_points(&a, &b);
        Some(Separation {
            normal,
            distance,
            point_a,
            point_b,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn square(size: f32) -> Shape {
        Shape::rectangle(size, size).expect("rectangle")
    }

    #[test]
    fn test_boxes_overlapping() {
        let gjk = Gjk::default();
        let shape = square(2.0);
        let ta = Transform::IDENTITY;
        let tb = Transform::from_position(Vec2::new(1.5, 0.0));

        let simplex = gjk.intersect(&shape, ta, &shape, tb).expect("overlap");
        assert_eq!(simplex.len(), 3);

        let p = gjk.detect(&shape, ta, &shape, tb).expect("penetration");
        assert!(p.normal.distance(Vec2::X) < EPSILON);
        assert!((p.depth - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_boxes_separated_and_touching() {
        let gjk = Gjk::default();
        let shape = square(2.0);
        let ta = Transform::IDENTITY;
        assert!(!gjk.overlaps(&shape, ta, &shape, Transform::from_position(Vec2::new(3.0, 0.0))));
        assert!(!gjk.overlaps(&shape, ta, &shape, Transform::from_position(Vec2::new(2.0, 0.0))));
    }

    #[test]
    fn test_coincident_centers_fall_back_to_x_axis() {
        let gjk = Gjk::default();
        let shape = square(2.0);
        let p = gjk
            .detect(&shape, Transform::IDENTITY, &shape, Transform::IDENTITY)
            .expect("penetration");
        assert!((p.depth - 2.0).abs() < EPSILON);
        assert!(gjk
            .distance(&shape, Transform::IDENTITY, &shape, Transform::IDENTITY)
            .is_none());
    }

    #[test]
    fn test_rotated_box_against_circle() {
        let gjk = Gjk::default();
        let rect = Shape::rectangle(4.0, 1.0).expect("rectangle");
        let circle = Shape::circle(0.5).expect("circle");
        let ta = Transform::from_position_angle(Vec2::ZERO, std::f32::consts::FRAC_PI_2);

        // the rotated box spans y in [-2, 2]
        assert!(gjk.overlaps(&rect, ta, &circle, Transform::from_position(Vec2::new(0.0, 2.25))));
        assert!(!gjk.overlaps(&rect, ta, &circle, Transform::from_position(Vec2::new(0.0, 2.75))));
    }

    #[test]
    fn test_distance_between_boxes() {
        let gjk = Gjk::default();
        let shape = square(2.0);
        let sep = gjk
            .distance(
                &shape,
                Transform::IDENTITY,
                &shape,
                Transform::from_position(Vec2::new(5.0, 0.5)),
            )
            .expect("separated");
        assert!((sep.distance - 3.0).abs() < EPSILON);
        assert!(sep.normal.distance(Vec2::X) < EPSILON);
        assert!((sep.point_a.x - 1.0).abs() < EPSILON);
        assert!((sep.point_b.x - 4.0).abs() < EPSILON);
        assert!(((sep.point_b - sep.point_a).length() - sep.distance).abs() < EPSILON);
    }

    #[test]
    fn test_distance_to_segment_corner() {
        let gjk = Gjk::default();
        let shape = square(2.0);
        let segment = Shape::segment(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)).expect("segment");
        let sep = gjk
            .distance(
                &shape,
                Transform::IDENTITY,
                &segment,
                Transform::from_position(Vec2::new(2.0, 2.0)),
            )
            .expect("separated");
        // corner (1, 1) to segment start (2, 2)
        assert!((sep.distance - std::f32::consts::SQRT_2).abs() < EPSILON);
        assert!(sep.point_a.distance(Vec2::new(1.0, 1.0)) < EPSILON);
        assert!(sep.point_b.distance(Vec2::new(2.0, 2.0)) < EPSILON);
    }

    #[test]
    fn test_iteration_cap_has_a_floor() {
        assert_eq!(Gjk::new(0, 1e-6, Epa::default()).max_iterations(), MIN_ITERATIONS);
    }
}
