use crate::error::{PhysicsError, Result};
use crate::math::{Rotation, Transform, Vec2};

use super::aabb::Aabb;
use super::feature::{EdgeFeature, Feature, Interval, PointFeature};
use super::mass::MassProperties;
use super::polygon::{Polygon, Triangle};
use super::ray::{Ray, RayHit};

/// The type of collision shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Circle,
    Polygon,
    Segment,
    Triangle,
}

/// A convex collision shape attached to a fixture.
///
/// Coordinates are in the owning body's local frame. Shapes are only
/// changed through [`Shape::translate`] and [`Shape::rotate_about`].
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A circle defined by its radius and local center
    Circle(Circle),
    /// A convex polygon
    Polygon(Polygon),
    /// A line segment
    Segment(Segment),
    /// A triangle
    Triangle(Triangle),
}

impl Shape {
    /// Creates a circle centered at the local origin
    #[inline]
    pub fn circle(radius: f32) -> Result<Self> {
        Ok(Self::Circle(Circle::new(radius)?))
    }

    /// Creates an axis-aligned rectangle centered at the local origin
    #[inline]
    pub fn rectangle(width: f32, height: f32) -> Result<Self> {
        Ok(Self::Polygon(Polygon::rectangle(width, height)?))
    }

    /// Creates a convex polygon from counter-clockwise vertices
    #[inline]
    pub fn polygon(vertices: Vec<Vec2>) -> Result<Self> {
        Ok(Self::Polygon(Polygon::new(vertices)?))
    }

    /// Creates a segment between two local points
    #[inline]
    pub fn segment(a: Vec2, b: Vec2) -> Result<Self> {
        Ok(Self::Segment(Segment::new(a, b)?))
    }

    /// Creates a triangle from counter-clockwise vertices
    #[inline]
    pub fn triangle(a: Vec2, b: Vec2, c: Vec2) -> Result<Self> {
        Ok(Self::Triangle(Triangle::new(a, b, c)?))
    }

    /// Returns the shape type
    #[inline]
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Circle(_) => ShapeType::Circle,
            Shape::Polygon(_) => ShapeType::Polygon,
            Shape::Segment(_) => ShapeType::Segment,
            Shape::Triangle(_) => ShapeType::Triangle,
        }
    }

    /// Returns the shape as a polygon when it is a polygon or triangle
    #[inline]
    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Shape::Polygon(p) => Some(p),
            Shape::Triangle(t) => Some(t.as_polygon()),
            _ => None,
        }
    }

    /// Returns the shape as a circle
    #[inline]
    pub fn as_circle(&self) -> Option<&Circle> {
        match self {
            Shape::Circle(c) => Some(c),
            _ => None,
        }
    }

    /// Local-space centroid
    #[inline]
    pub fn center(&self) -> Vec2 {
        match self {
            Shape::Circle(c) => c.center,
            Shape::Segment(s) => s.center,
            Shape::Polygon(p) => p.center(),
            Shape::Triangle(t) => t.as_polygon().center(),
        }
    }

    /// World-space centroid under a transform
    #[inline]
    pub fn world_center(&self, transform: Transform) -> Vec2 {
        transform.transform_point(self.center())
    }

    /// Maximum distance from `point` (local space) to any point of the shape.
    ///
    /// Bounds how far the shape can sweep while rotating about `point`.
    pub fn rotation_radius(&self, point: Vec2) -> f32 {
        match self {
            Shape::Circle(c) => c.center.distance(point) + c.radius,
            Shape::Segment(s) => s.a.distance(point).max(s.b.distance(point)),
            Shape::Polygon(p) => p.rotation_radius(point),
            Shape::Triangle(t) => t.as_polygon().rotation_radius(point),
        }
    }

    /// Returns the support point in the given direction (local space)
    /// The support point is the point on the shape furthest in the given direction
    #[inline]
    pub fn support(&self, direction: Vec2) -> Vec2 {
        match self {
            Shape::Circle(c) => c.support(direction),
            Shape::Segment(s) => s.support(direction),
            Shape::Polygon(p) => p.support(direction),
            Shape::Triangle(t) => t.as_polygon().support(direction),
        }
    }

    /// Returns the support point in world space given a transform
    #[inline]
    pub fn support_world(&self, transform: Transform, direction: Vec2) -> Vec2 {
        let local_dir = transform.inverse_transform_vector(direction);
        transform.transform_point(self.support(local_dir))
    }

    /// Computes the AABB of this shape given a world transform
    #[inline]
    pub fn aabb(&self, transform: Transform) -> Aabb {
        match self {
            Shape::Circle(c) => c.aabb(transform),
            Shape::Segment(s) => s.aabb(transform),
            Shape::Polygon(p) => p.aabb(transform),
            Shape::Triangle(t) => t.as_polygon().aabb(transform),
        }
    }

    /// Computes mass properties given density
    #[inline]
    pub fn mass_properties(&self, density: f32) -> MassProperties {
        match self {
            Shape::Circle(c) => c.mass_properties(density),
            Shape::Segment(s) => s.mass_properties(density),
            Shape::Polygon(p) => p.mass_properties(density),
            Shape::Triangle(t) => t.as_polygon().mass_properties(density),
        }
    }

    /// The feature farthest along a world direction, used by manifold clipping
    #[inline]
    pub fn farthest_feature(&self, direction: Vec2, transform: Transform) -> Feature {
        match self {
            Shape::Circle(c) => c.farthest_feature(direction, transform),
            Shape::Segment(s) => s.farthest_feature(direction, transform),
            Shape::Polygon(p) => p.farthest_feature(direction, transform),
            Shape::Triangle(t) => t.as_polygon().farthest_feature(direction, transform),
        }
    }

    /// World-space foci used to build separating axes for round shapes
    #[inline]
    pub fn foci(&self, transform: Transform) -> Option<Vec2> {
        match self {
            Shape::Circle(c) => Some(transform.transform_point(c.center)),
            _ => None,
        }
    }

    /// Candidate separating axes (unit length, world space)
    #[inline]
    pub fn sat_axes(&self, foci: &[Vec2], transform: Transform) -> Vec<Vec2> {
        match self {
            Shape::Circle(c) => c.sat_axes(foci, transform),
            Shape::Segment(s) => s.sat_axes(foci, transform),
            Shape::Polygon(p) => p.sat_axes(foci, transform),
            Shape::Triangle(t) => t.as_polygon().sat_axes(foci, transform),
        }
    }

    /// Projection onto a world axis
    #[inline]
    pub fn project(&self, axis: Vec2, transform: Transform) -> Interval {
        match self {
            Shape::Circle(c) => c.project(axis, transform),
            Shape::Segment(s) => s.project(axis, transform),
            Shape::Polygon(p) => p.project(axis, transform),
            Shape::Triangle(t) => t.as_polygon().project(axis, transform),
        }
    }

    /// First intersection of a world-space ray with the shape
    #[inline]
    pub fn ray_cast(&self, ray: Ray, max_distance: f32, transform: Transform) -> Option<RayHit> {
        match self {
            Shape::Circle(c) => c.ray_cast(ray, max_distance, transform),
            Shape::Segment(s) => s.ray_cast(ray, max_distance, transform),
            Shape::Polygon(p) => p.ray_cast(ray, max_distance, transform),
            Shape::Triangle(t) => t.as_polygon().ray_cast(ray, max_distance, transform),
        }
    }

    /// Translates the shape in local space
    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Shape::Circle(c) => c.center += delta,
            Shape::Segment(s) => s.translate(delta),
            Shape::Polygon(p) => p.translate(delta),
            Shape::Triangle(t) => t.as_polygon_mut().translate(delta),
        }
    }

    /// Rotates the shape about a local point
    pub fn rotate_about(&mut self, angle: f32, point: Vec2) {
        match self {
            Shape::Circle(c) => {
                c.center = Rotation::from_angle(angle).rotate(c.center - point) + point;
            }
            Shape::Segment(s) => s.rotate_about(angle, point),
            Shape::Polygon(p) => p.rotate_about(angle, point),
            Shape::Triangle(t) => t.as_polygon_mut().rotate_about(angle, point),
        }
    }
}

/// A circle collision shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub radius: f32,
    /// Local center
    pub center: Vec2,
}

impl Circle {
    /// Creates a new circle centered at the local origin
    #[inline]
    pub fn new(radius: f32) -> Result<Self> {
        Self::with_center(radius, Vec2::ZERO)
    }

    /// Creates a new circle with a local center offset
    pub fn with_center(radius: f32, center: Vec2) -> Result<Self> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(PhysicsError::DegenerateShape {
                reason: "circle radius must be positive",
            });
        }
        if !center.is_finite() {
            return Err(PhysicsError::DegenerateShape {
                reason: "circle center must be finite",
            });
        }
        Ok(Self { radius, center })
    }

    /// Returns the support point in the given direction
    #[inline]
    pub fn support(&self, direction: Vec2) -> Vec2 {
        self.center + direction.normalize() * self.radius
    }

    #[inline]
    pub fn aabb(&self, transform: Transform) -> Aabb {
        Aabb::from_center_half_extents(transform.transform_point(self.center), Vec2::splat(self.radius))
    }

    /// Computes mass properties given density
    #[inline]
    pub fn mass_properties(&self, density: f32) -> MassProperties {
        let r2 = self.radius * self.radius;
        let mass = density * std::f32::consts::PI * r2;
        MassProperties::new(self.center, mass, 0.5 * mass * r2)
    }

    #[inline]
    pub fn farthest_feature(&self, direction: Vec2, transform: Transform) -> Feature {
        let point = transform.transform_point(self.center) + direction.normalize() * self.radius;
        Feature::Vertex(PointFeature::new(point, 0))
    }

    fn sat_axes(&self, foci: &[Vec2], transform: Transform) -> Vec<Vec2> {
        let center = transform.transform_point(self.center);
        foci.iter()
            .filter_map(|&f| (f - center).try_normalize())
            .collect()
    }

    #[inline]
    fn project(&self, axis: Vec2, transform: Transform) -> Interval {
        let c = transform.transform_point(self.center).dot(axis);
        Interval::new(c - self.radius, c + self.radius)
    }

    fn ray_cast(&self, ray: Ray, max_distance: f32, transform: Transform) -> Option<RayHit> {
        let center = transform.transform_point(self.center);
        let m = ray.origin - center;
        let b = m.dot(ray.direction);
        let c = m.length_squared() - self.radius * self.radius;
        if c > 0.0 && b > 0.0 {
            return None;
        }
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let t = -b - discriminant.sqrt();
        if t < 0.0 || t > max_distance {
            return None;
        }
        let point = ray.at(t);
        Some(RayHit {
            point,
            normal: (point - center).normalize(),
            distance: t,
        })
    }
}

/// A line segment collision shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: Vec2,
    pub b: Vec2,
    center: Vec2,
    length: f32,
}

impl Segment {
    /// Creates a segment; fails when the endpoints coincide
    pub fn new(a: Vec2, b: Vec2) -> Result<Self> {
        if !a.is_finite() || !b.is_finite() {
            return Err(PhysicsError::DegenerateShape {
                reason: "segment endpoints must be finite",
            });
        }
        let length = a.distance(b);
        if length <= 1e-6 {
            return Err(PhysicsError::DegenerateShape {
                reason: "segment has zero length",
            });
        }
        Ok(Self {
            a,
            b,
            center: (a + b) * 0.5,
            length,
        })
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Returns the support point in the given direction
    #[inline]
    pub fn support(&self, direction: Vec2) -> Vec2 {
        if self.a.dot(direction) >= self.b.dot(direction) {
            self.a
        } else {
            self.b
        }
    }

    #[inline]
    pub fn aabb(&self, transform: Transform) -> Aabb {
        Aabb::from_points(&[transform.transform_point(self.a), transform.transform_point(self.b)])
    }

    /// Thin rod mass: `m = ρL`, `I = mL²/12`
    #[inline]
    pub fn mass_properties(&self, density: f32) -> MassProperties {
        let mass = density * self.length;
        MassProperties::new(self.center, mass, mass * self.length * self.length / 12.0)
    }

    /// The segment as an edge, wound so that its outward normal faces `direction`
    pub fn farthest_feature(&self, direction: Vec2, transform: Transform) -> Feature {
        let p1 = PointFeature::new(transform.transform_point(self.a), 0);
        let p2 = PointFeature::new(transform.transform_point(self.b), 1);
        let max = if p1.point.dot(direction) >= p2.point.dot(direction) {
            p1
        } else {
            p2
        };
        if (p2.point - p1.point).right().dot(direction) >= 0.0 {
            Feature::Edge(EdgeFeature::new(p1, p2, max, 0))
        } else {
            Feature::Edge(EdgeFeature::new(p2, p1, max, 1))
        }
    }

    fn sat_axes(&self, foci: &[Vec2], transform: Transform) -> Vec<Vec2> {
        let a = transform.transform_point(self.a);
        let b = transform.transform_point(self.b);
        let edge = (b - a).normalize();
        let mut axes = vec![edge.right(), edge];
        for &focus in foci {
            let closest = closest_point_on_segment(focus, a, b);
            if let Some(axis) = (focus - closest).try_normalize() {
                axes.push(axis);
            }
        }
        axes
    }

    fn project(&self, axis: Vec2, transform: Transform) -> Interval {
        let da = transform.transform_point(self.a).dot(axis);
        let db = transform.transform_point(self.b).dot(axis);
        Interval::new(da.min(db), da.max(db))
    }

    fn ray_cast(&self, ray: Ray, max_distance: f32, transform: Transform) -> Option<RayHit> {
        let a = transform.transform_point(self.a);
        let b = transform.transform_point(self.b);
        let edge = b - a;
        let denominator = ray.direction.cross(edge);
        if denominator.abs() <= f32::EPSILON {
            return None;
        }
        let to_a = a - ray.origin;
        let t = to_a.cross(edge) / denominator;
        let u = to_a.cross(ray.direction) / denominator;
        if t < 0.0 || t > max_distance || !(0.0..=1.0).contains(&u) {
            return None;
        }
        let mut normal = edge.right().normalize();
        if normal.dot(ray.direction) > 0.0 {
            normal = -normal;
        }
        Some(RayHit {
            point: ray.at(t),
            normal,
            distance: t,
        })
    }

    fn translate(&mut self, delta: Vec2) {
        self.a += delta;
        self.b += delta;
        self.center += delta;
    }

    fn rotate_about(&mut self, angle: f32, point: Vec2) {
        let rotation = Rotation::from_angle(angle);
        self.a = rotation.rotate(self.a - point) + point;
        self.b = rotation.rotate(self.b - point) + point;
        self.center = (self.a + self.b) * 0.5;
    }
}

/// Closest point to `p` on the segment `a`-`b`
#[inline]
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_circle_validation_and_mass() {
        assert!(Shape::circle(0.0).is_err());
        assert!(Shape::circle(-1.0).is_err());
        assert!(Shape::circle(f32::NAN).is_err());

        let circle = Shape::circle(2.0).expect("circle");
        let mass = circle.mass_properties(1.0);
        assert!(approx_eq(mass.mass, std::f32::consts::PI * 4.0));
        assert!(approx_eq(mass.inertia, 0.5 * mass.mass * 4.0));
    }

    #[test]
    fn test_support_world() {
        let circle = Shape::circle(1.0).expect("circle");
        let transform = Transform::from_position(Vec2::new(3.0, 0.0));
        let s = circle.support_world(transform, Vec2::new(0.0, 5.0));
        assert!(s.distance(Vec2::new(3.0, 1.0)) < EPSILON);

        let rect = Shape::rectangle(2.0, 2.0).expect("rectangle");
        let rotated = Transform::from_position_angle(Vec2::ZERO, std::f32::consts::FRAC_PI_4);
        let s = rect.support_world(rotated, Vec2::X);
        assert!(approx_eq(s.x, std::f32::consts::SQRT_2));
    }

    #[test]
    fn test_aabb_of_rotated_rectangle() {
        let rect = Shape::rectangle(2.0, 2.0).expect("rectangle");
        let t = Transform::from_position_angle(Vec2::new(1.0, 1.0), std::f32::consts::FRAC_PI_4);
        let aabb = rect.aabb(t);
        let r = std::f32::consts::SQRT_2;
        assert!(approx_eq(aabb.min.x, 1.0 - r));
        assert!(approx_eq(aabb.max.y, 1.0 + r));
    }

    #[test]
    fn test_segment() {
        assert!(Shape::segment(Vec2::ZERO, Vec2::ZERO).is_err());

        let segment = Segment::new(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0)).expect("segment");
        assert!(approx_eq(segment.length(), 2.0));
        assert_eq!(segment.support(Vec2::new(1.0, 0.2)), Vec2::new(1.0, 0.0));

        let mass = segment.mass_properties(2.0);
        assert!(approx_eq(mass.mass, 4.0));
        assert!(approx_eq(mass.inertia, 4.0 * 4.0 / 12.0));

        // the edge is wound so its outward normal faces the query direction
        for direction in [Vec2::Y, -Vec2::Y] {
            match segment.farthest_feature(direction, Transform::IDENTITY) {
                Feature::Edge(edge) => assert!(edge.edge.right().dot(direction) > 0.0),
                Feature::Vertex(_) => panic!("segment must report an edge"),
            }
        }
    }

    #[test]
    fn test_ray_casts() {
        let ray = Ray::new(Vec2::new(-5.0, 0.0), Vec2::X);

        let circle = Shape::circle(1.0).expect("circle");
        let hit = circle.ray_cast(ray, 10.0, Transform::IDENTITY).expect("hit circle");
        assert!(approx_eq(hit.distance, 4.0));
        assert!(hit.normal.distance(-Vec2::X) < EPSILON);

        let segment = Shape::segment(Vec2::new(0.0, -1.0), Vec2::new(0.0, 1.0)).expect("segment");
        let hit = segment.ray_cast(ray, 10.0, Transform::IDENTITY).expect("hit segment");
        assert!(approx_eq(hit.distance, 5.0));
        assert!(hit.normal.dot(ray.direction) < 0.0);

        let miss = Ray::new(Vec2::new(-5.0, 3.0), Vec2::X);
        assert!(circle.ray_cast(miss, 10.0, Transform::IDENTITY).is_none());
        assert!(segment.ray_cast(miss, 10.0, Transform::IDENTITY).is_none());
    }

    #[test]
    fn test_translate_and_rotate() {
        let mut shape = Shape::circle(1.0).expect("circle");
        shape.translate(Vec2::new(2.0, 0.0));
        assert_eq!(shape.center(), Vec2::new(2.0, 0.0));
        shape.rotate_about(std::f32::consts::FRAC_PI_2, Vec2::ZERO);
        assert!(shape.center().distance(Vec2::new(0.0, 2.0)) < EPSILON);
        assert!(approx_eq(shape.rotation_radius(Vec2::ZERO), 3.0));
    }

    #[test]
    fn test_triangle_delegates_to_polygon() {
        let triangle = Shape::triangle(Vec2::ZERO, Vec2::X, Vec2::Y).expect("triangle");
        assert_eq!(triangle.shape_type(), ShapeType::Triangle);
        assert!(triangle.as_polygon().is_some());
        assert!(triangle.center().distance(Vec2::new(1.0 / 3.0, 1.0 / 3.0)) < EPSILON);
    }
}
