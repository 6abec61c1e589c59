use crate::error::{PhysicsError, Result};
use crate::math::{Rotation, Transform, Vec2};

use super::aabb::Aabb;
use super::feature::{EdgeFeature, Feature, Interval, PointFeature};
use super::hull::convex_hull;
use super::mass::MassProperties;
use super::ray::{Ray, RayHit};

/// Squared length below which two vertices count as coincident
const COINCIDENT_EPSILON_SQ: f32 = 1e-10;

/// A convex polygon with counter-clockwise winding.
///
/// `normals[i]` is the outward unit normal of the edge from `vertices[i]` to
/// `vertices[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vec2>,
    normals: Vec<Vec2>,
    center: Vec2,
    radius: f32,
}

impl Polygon {
    /// Creates a polygon from counter-clockwise vertices.
    ///
    /// Fails for fewer than three vertices, coincident neighbours, zero area,
    /// clockwise winding or a non-convex outline.
    pub fn new(vertices: Vec<Vec2>) -> Result<Self> {
        let count = vertices.len();
        if count < 3 {
            return Err(PhysicsError::DegenerateShape {
                reason: "a polygon needs at least 3 vertices",
            });
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(PhysicsError::DegenerateShape {
                reason: "polygon vertices must be finite",
            });
        }

        let mut positive = 0usize;
        let mut negative = 0usize;
        for i in 0..count {
            let a = vertices[i];
            let b = vertices[(i + 1) % count];
            let c = vertices[(i + 2) % count];
            let e1 = b - a;
            if e1.length_squared() < COINCIDENT_EPSILON_SQ {
                return Err(PhysicsError::DegenerateShape {
                    reason: "polygon has coincident vertices",
                });
            }
            let turn = e1.cross(c - b);
            if turn > 0.0 {
                positive += 1;
            } else if turn < 0.0 {
                negative += 1;
            }
        }
        if positive > 0 && negative > 0 {
            return Err(PhysicsError::NonConvexPolygon);
        }
        if positive == 0 && negative == 0 {
            return Err(PhysicsError::DegenerateShape {
                reason: "polygon has zero area",
            });
        }
        if negative > 0 {
            return Err(PhysicsError::InvalidWinding);
        }

        let (area, center) = area_centroid(&vertices);
        if area <= f32::EPSILON {
            return Err(PhysicsError::DegenerateShape {
                reason: "polygon has zero area",
            });
        }

        let normals = (0..count)
            .map(|i| (vertices[(i + 1) % count] - vertices[i]).right().normalize())
            .collect();
        let radius = vertices
            .iter()
            .map(|v| v.distance(center))
            .fold(0.0f32, f32::max);

        Ok(Self {
            vertices,
            normals,
            center,
            radius,
        })
    }

    /// Creates an axis-aligned rectangle centered at the origin
    pub fn rectangle(width: f32, height: f32) -> Result<Self> {
        if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
            return Err(PhysicsError::DegenerateShape {
                reason: "rectangle width and height must be positive",
            });
        }
        let hw = width * 0.5;
        let hh = height * 0.5;
        Self::new(vec![
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ])
    }

    /// Creates a regular polygon with `count` vertices on a circle of `radius`
    pub fn regular(count: usize, radius: f32) -> Result<Self> {
        if count < 3 {
            return Err(PhysicsError::DegenerateShape {
                reason: "a regular polygon needs at least 3 vertices",
            });
        }
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(PhysicsError::DegenerateShape {
                reason: "regular polygon radius must be positive",
            });
        }
        let step = std::f32::consts::TAU / count as f32;
        let vertices = (0..count)
            .map(|i| {
                let (s, c) = (step * i as f32).sin_cos();
                Vec2::new(c * radius, s * radius)
            })
            .collect();
        Self::new(vertices)
    }

    /// Creates the convex hull polygon of an arbitrary point cloud
    pub fn from_points(points: &[Vec2]) -> Result<Self> {
        Self::new(convex_hull(points)?)
    }

    /// Local-space vertices in counter-clockwise order
    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Local-space outward edge normals
    #[inline]
    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    /// Local-space centroid
    #[inline]
    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Maximum distance from the centroid to a vertex
    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Maximum distance from `point` to a vertex
    pub fn rotation_radius(&self, point: Vec2) -> f32 {
        self.vertices
            .iter()
            .map(|v| v.distance(point))
            .fold(0.0f32, f32::max)
    }

    /// Index of the vertex farthest along a local direction.
    /// Ties go to the lowest index.
    fn farthest_index(&self, direction: Vec2) -> usize {
        let mut best = 0;
        let mut best_dot = self.vertices[0].dot(direction);
        for (i, v) in self.vertices.iter().enumerate().skip(1) {
            let d = v.dot(direction);
            if d > best_dot {
                best = i;
                best_dot = d;
            }
        }
        best
    }

    /// Support point in local space
    #[inline]
    pub fn support(&self, direction: Vec2) -> Vec2 {
        self.vertices[self.farthest_index(direction)]
    }

    /// World-space bounding box
    pub fn aabb(&self, transform: Transform) -> Aabb {
        self.vertices
            .iter()
            .fold(Aabb::EMPTY, |aabb, &v| aabb.expand_to_include(transform.transform_point(v)))
    }

    /// Mass properties for a uniform density, computed over a triangle fan
    pub fn mass_properties(&self, density: f32) -> MassProperties {
        const INV3: f32 = 1.0 / 3.0;
        let count = self.vertices.len();
        // fan origin; keeps the products small for shapes far from the origin
        let s = self.vertices[0];

        let mut area = 0.0;
        let mut center = Vec2::ZERO;
        let mut inertia = 0.0;
        for i in 0..count {
            let e1 = self.vertices[i] - s;
            let e2 = self.vertices[(i + 1) % count] - s;
            let d = e1.cross(e2);
            let tri_area = 0.5 * d;
            area += tri_area;
            center += (e1 + e2) * (tri_area * INV3);

            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 * INV3 * d) * (intx2 + inty2);
        }

        let mass = density * area;
        center /= area;
        // inertia about the fan origin shifted to the centroid
        let inertia = density * inertia - mass * center.length_squared();
        MassProperties::new(center + s, mass, inertia)
    }

    /// The edge most perpendicular to a world direction, or the farthest vertex
    /// when the polygon is queried through [`Feature`].
    pub fn farthest_feature(&self, direction: Vec2, transform: Transform) -> Feature {
        let local = transform.inverse_transform_vector(direction);
        let count = self.vertices.len();
        let index = self.farthest_index(local);

        let max = PointFeature::new(transform.transform_point(self.vertices[index]), index);
        let prev = if index == 0 { count - 1 } else { index - 1 };
        let next = (index + 1) % count;

        let left_normal = self.normals[prev];
        let right_normal = self.normals[index];

        if left_normal.dot(local) < right_normal.dot(local) {
            // edge (index, next) faces the direction better
            let v2 = PointFeature::new(transform.transform_point(self.vertices[next]), next);
            Feature::Edge(EdgeFeature::new(max, v2, max, index))
        } else {
            let v1 = PointFeature::new(transform.transform_point(self.vertices[prev]), prev);
            Feature::Edge(EdgeFeature::new(v1, max, max, prev))
        }
    }

    /// Candidate separating axes: world face normals, plus one axis per focus
    /// pointing from the closest vertex to the focus.
    pub fn sat_axes(&self, foci: &[Vec2], transform: Transform) -> Vec<Vec2> {
        let mut axes: Vec<Vec2> = self
            .normals
            .iter()
            .map(|&n| transform.transform_vector(n))
            .collect();
        for &focus in foci {
            let closest = self
                .vertices
                .iter()
                .map(|&v| transform.transform_point(v))
                .min_by(|a, b| a.distance_squared(focus).total_cmp(&b.distance_squared(focus)));
            if let Some(axis) = closest.and_then(|c| (focus - c).try_normalize()) {
                axes.push(axis);
            }
        }
        axes
    }

    /// Projection onto a world axis
    pub fn project(&self, axis: Vec2, transform: Transform) -> Interval {
        let local = transform.inverse_transform_vector(axis);
        let offset = transform.position.dot(axis);
        let (min, max) = self
            .vertices
            .iter()
            .map(|v| v.dot(local))
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Interval::new(min + offset, max + offset)
    }

    /// First intersection of a ray with the boundary, up to `max_distance`.
    /// Rays starting inside the polygon report no hit.
    pub fn ray_cast(&self, ray: Ray, max_distance: f32, transform: Transform) -> Option<RayHit> {
        let origin = transform.inverse_transform_point(ray.origin);
        let direction = transform.inverse_transform_vector(ray.direction);

        let mut lower = 0.0f32;
        let mut upper = max_distance;
        let mut index = None;

        for (i, (&v, &n)) in self.vertices.iter().zip(&self.normals).enumerate() {
            let numerator = n.dot(v - origin);
            let denominator = n.dot(direction);

            if denominator == 0.0 {
                if numerator < 0.0 {
                    return None;
                }
            } else if denominator < 0.0 && numerator < lower * denominator {
                lower = numerator / denominator;
                index = Some(i);
            } else if denominator > 0.0 && numerator < upper * denominator {
                upper = numerator / denominator;
            }

            if upper < lower {
                return None;
            }
        }

        index.map(|i| RayHit {
            point: ray.at(lower),
            normal: transform.transform_vector(self.normals[i]),
            distance: lower,
        })
    }

    /// Translates every vertex in local space
    pub fn translate(&mut self, delta: Vec2) {
        for v in &mut self.vertices {
            *v += delta;
        }
        self.center += delta;
    }

    /// Rotates the polygon about a local point
    pub fn rotate_about(&mut self, angle: f32, point: Vec2) {
        let rotation = Rotation::from_angle(angle);
        for v in &mut self.vertices {
            *v = rotation.rotate(*v - point) + point;
        }
        for n in &mut self.normals {
            *n = rotation.rotate(*n);
        }
        self.center = rotation.rotate(self.center - point) + point;
    }
}

/// Signed area and centroid of a counter-clockwise outline
fn area_centroid(vertices: &[Vec2]) -> (f32, Vec2) {
    let count = vertices.len();
    let s = vertices[0];
    let mut area = 0.0;
    let mut center = Vec2::ZERO;
    for i in 0..count {
        let e1 = vertices[i] - s;
        let e2 = vertices[(i + 1) % count] - s;
        let tri_area = 0.5 * e1.cross(e2);
        area += tri_area;
        center += (e1 + e2) * (tri_area / 3.0);
    }
    if area > 0.0 {
        (area, center / area + s)
    } else {
        (area, s)
    }
}

/// A triangle; a three-vertex convex polygon with its own shape tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    polygon: Polygon,
}

impl Triangle {
    /// Creates a triangle from counter-clockwise vertices
    pub fn new(a: Vec2, b: Vec2, c: Vec2) -> Result<Self> {
        Ok(Self {
            polygon: Polygon::new(vec![a, b, c])?,
        })
    }

    /// The triangle as a general polygon
    #[inline]
    pub fn as_polygon(&self) -> &Polygon {
        &self.polygon
    }

    #[inline]
    pub(crate) fn as_polygon_mut(&mut self) -> &mut Polygon {
        &mut self.polygon
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        self.polygon.vertices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            Polygon::new(vec![Vec2::ZERO, Vec2::X]),
            Err(PhysicsError::DegenerateShape { .. })
        ));
        // clockwise square
        assert_eq!(
            Polygon::new(vec![Vec2::ZERO, Vec2::Y, Vec2::ONE, Vec2::X]),
            Err(PhysicsError::InvalidWinding)
        );
        // dart shape
        assert_eq!(
            Polygon::new(vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(2.0, 0.0),
                Vec2::new(1.0, 0.5),
                Vec2::new(1.0, 2.0),
            ]),
            Err(PhysicsError::NonConvexPolygon)
        );
        // collinear
        assert!(Polygon::new(vec![Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)]).is_err());
        // coincident
        assert!(Polygon::new(vec![Vec2::ZERO, Vec2::ZERO, Vec2::X, Vec2::Y]).is_err());
        assert!(Polygon::rectangle(0.0, 1.0).is_err());
        assert!(Triangle::new(Vec2::ZERO, Vec2::Y, Vec2::X).is_err());
    }

    #[test]
    fn test_rectangle_mass() {
        let rect = Polygon::rectangle(2.0, 1.0).expect("rectangle");
        let mass = rect.mass_properties(3.0);
        assert!(approx_eq(mass.mass, 6.0));
        assert!(mass.center.length() < EPSILON);
        // m (w² + h²) / 12
        assert!(approx_eq(mass.inertia, 6.0 * (4.0 + 1.0) / 12.0));
    }

    #[test]
    fn test_offset_polygon_centroid() {
        let mut square = Polygon::rectangle(1.0, 1.0).expect("square");
        square.translate(Vec2::new(5.0, -2.0));
        let mass = square.mass_properties(1.0);
        assert!(mass.center.distance(Vec2::new(5.0, -2.0)) < EPSILON);
        assert!(approx_eq(mass.inertia, 1.0 / 6.0));
        assert!(square.center().distance(Vec2::new(5.0, -2.0)) < EPSILON);
    }

    #[test]
    fn test_farthest_feature_is_top_edge() {
        let square = Polygon::rectangle(2.0, 2.0).expect("square");
        let transform = Transform::from_position(Vec2::new(0.0, 3.0));
        match square.farthest_feature(Vec2::Y, transform) {
            Feature::Edge(edge) => {
                assert_eq!(edge.index, 2);
                assert!(approx_eq(edge.v1.point.y, 4.0));
                assert!(approx_eq(edge.v2.point.y, 4.0));
                assert!(edge.edge.right().dot(Vec2::Y) > 0.99);
            }
            Feature::Vertex(_) => panic!("polygon must report an edge"),
        }
    }

    #[test]
    fn test_projection() {
        let square = Polygon::rectangle(2.0, 2.0).expect("square");
        let transform = Transform::from_position(Vec2::new(3.0, 0.0));
        let interval = square.project(Vec2::X, transform);
        assert!(approx_eq(interval.min, 2.0));
        assert!(approx_eq(interval.max, 4.0));
    }

    #[test]
    fn test_ray_cast() {
        let square = Polygon::rectangle(2.0, 2.0).expect("square");
        let ray = Ray::new(Vec2::new(-5.0, 0.0), Vec2::X);
        let hit = square
            .ray_cast(ray, 100.0, Transform::IDENTITY)
            .expect("ray should hit");
        assert!(approx_eq(hit.distance, 4.0));
        assert!(hit.normal.distance(Vec2::new(-1.0, 0.0)) < EPSILON);

        assert!(square.ray_cast(ray, 3.0, Transform::IDENTITY).is_none());
        let inside = Ray::new(Vec2::ZERO, Vec2::X);
        assert!(square.ray_cast(inside, 10.0, Transform::IDENTITY).is_none());
    }

    #[test]
    fn test_regular_and_hull() {
        let hexagon = Polygon::regular(6, 1.0).expect("hexagon");
        assert_eq!(hexagon.vertices().len(), 6);
        assert!(approx_eq(hexagon.radius(), 1.0));

        let hull = Polygon::from_points(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 0.3),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ])
        .expect("hull polygon");
        assert_eq!(hull.vertices().len(), 4);
    }

    #[test]
    fn test_rotate_about_keeps_normals_unit() {
        let mut square = Polygon::rectangle(1.0, 1.0).expect("square");
        square.rotate_about(0.5, Vec2::new(1.0, 0.0));
        for n in square.normals() {
            assert!(approx_eq(n.length(), 1.0));
        }
        assert!(approx_eq(square.center().distance(Vec2::new(1.0, 0.0)), 1.0));
    }
}
