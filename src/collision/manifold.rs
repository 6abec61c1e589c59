//! Contact manifold generation.
//!
//! Converts a penetration (normal + depth) into at most two contact points by
//! clipping the incident edge of one shape against the side planes of the
//! reference edge of the other.

use crate::geometry::{EdgeFeature, Feature, PointFeature, Shape};
use crate::math::{Transform, Vec2};
use crate::settings::{ManifoldSolverKind, Settings};

use super::contact::MAX_CONTACT_POINTS;
use super::narrow_phase::Penetration;

/// Edges must differ by more than this in |direction . normal| before the
/// reference face moves from shape A to shape B.
const FLIP_TOLERANCE: f32 = 0.005;

/// Identifies a contact point across steps so its impulses can be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifoldPointId {
    /// A vertex contact from a round shape; matched by distance
    Distance,
    /// A clipped edge contact
    Indexed {
        /// Edge index on the reference shape
        reference_edge: usize,
        /// Edge index on the incident shape
        incident_edge: usize,
        /// Vertex index on the incident shape that produced the point
        incident_vertex: usize,
        /// True if the reference edge belongs to shape B
        flipped: bool,
    },
}

/// A single point of a manifold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifoldPoint {
    pub id: ManifoldPointId,
    /// World space point
    pub point: Vec2,
    /// Penetration depth at this point
    pub depth: f32,
}

/// Contact points between two overlapping shapes
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    /// Unit normal pointing from shape A towards shape B
    pub normal: Vec2,
    /// Between one and [`MAX_CONTACT_POINTS`] points
    pub points: Vec<ManifoldPoint>,
}

impl Manifold {
    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Deepest point, if any
    pub fn deepest(&self) -> Option<&ManifoldPoint> {
        self.points
            .iter()
            .fold(None, |best: Option<&ManifoldPoint>, p| match best {
                Some(b) if b.depth >= p.depth => Some(b),
                _ => Some(p),
            })
    }
}

/// Builds contact manifolds from narrow-phase penetrations
pub trait ManifoldSolver {
    /// Returns `None` when clipping leaves no point
    fn manifold(
        &self,
        penetration: &Penetration,
        shape_a: &Shape,
        transform_a: Transform,
        shape_b: &Shape,
        transform_b: Transform,
    ) -> Option<Manifold>;
}

/// Creates the manifold solver selected by the settings
pub fn create(kind: ManifoldSolverKind, settings: &Settings) -> Box<dyn ManifoldSolver> {
    match kind {
        ManifoldSolverKind::Clipping => Box::new(ClippingManifoldSolver::from_settings(settings)),
    }
}

/// Reference/incident edge clipping (Sutherland-Hodgman against two planes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippingManifoldSolver {
    /// Clipped points separated by more than this are dropped
    pub separation_tolerance: f32,
}

impl Default for ClippingManifoldSolver {
    fn default() -> Self {
        Self {
            separation_tolerance: 1e-4,
        }
    }
}

impl ClippingManifoldSolver {
    pub fn new(separation_tolerance: f32) -> Self {
        Self {
            separation_tolerance: separation_tolerance.max(0.0),
        }
    }

    /// Uses a tenth of the linear tolerance as the separation tolerance
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.linear_tolerance() * 0.1)
    }

    fn clip_edges(&self, normal: Vec2, edge_a: EdgeFeature, edge_b: EdgeFeature) -> Option<Manifold> {
        let along_a = edge_a.edge.normalize().dot(normal).abs();
        let along_b = edge_b.edge.normalize().dot(normal).abs();

        // the reference edge is the one most perpendicular to the normal;
        // shape A keeps it unless B is clearly better
        let (reference, incident, flipped) = if along_a > along_b + FLIP_TOLERANCE {
            (edge_b, edge_a, true)
        } else {
            (edge_a, edge_b, false)
        };

        let direction = reference.edge.normalize();
        let offset_1 = direction.dot(reference.v1.point);
        let clipped = clip(incident.v1, incident.v2, direction, offset_1);
        if clipped.len() < 2 {
            return None;
        }

        let offset_2 = -direction.dot(reference.v2.point);
        let clipped = clip(clipped[0], clipped[1], -direction, offset_2);
        if clipped.len() < 2 {
            return None;
        }

        let face_normal = reference.edge.right().normalize();
        let face = face_normal.dot(reference.max.point);
        let points: Vec<ManifoldPoint> = clipped
            .iter()
            .filter_map(|p| {
                let depth = face - face_normal.dot(p.point);
                (depth >= -self.separation_tolerance).then_some(ManifoldPoint {
                    id: ManifoldPointId::Indexed {
                        reference_edge: reference.index,
                        incident_edge: incident.index,
                        incident_vertex: p.index,
                        flipped,
                    },
                    point: p.point,
                    depth,
                })
            })
            .take(MAX_CONTACT_POINTS)
            .collect();

        if points.is_empty() {
            return None;
        }
        Some(Manifold { normal, points })
    }
}

impl ManifoldSolver for ClippingManifoldSolver {
    fn manifold(
        &self,
        penetration: &Penetration,
        shape_a: &Shape,
        transform_a: Transform,
        shape_b: &Shape,
        transform_b: Transform,
    ) -> Option<Manifold> {
        let normal = penetration.normal;
        let feature_a = shape_a.farthest_feature(normal, transform_a);
        let feature_b = shape_b.farthest_feature(-normal, transform_b);

        match (feature_a, feature_b) {
            (Feature::Vertex(vertex), _) | (_, Feature::Vertex(vertex)) => Some(Manifold {
                normal,
                points: vec![ManifoldPoint {
                    id: ManifoldPointId::Distance,
                    point: vertex.point,
                    depth: penetration.depth,
                }],
            }),
            (Feature::Edge(edge_a), Feature::Edge(edge_b)) => self.clip_edges(normal, edge_a, edge_b),
        }
    }
}

/// Keeps the part of segment `v1`-`v2` on the positive side of the plane
/// `n . p = offset`. A point created at the crossing takes the index of the
/// vertex it replaces.
fn clip(v1: PointFeature, v2: PointFeature, n: Vec2, offset: f32) -> Vec<PointFeature> {
    let mut points = Vec::with_capacity(2);
    let d1 = n.dot(v1.point) - offset;
    let d2 = n.dot(v2.point) - offset;

    if d1 >= 0.0 {
        points.push(v1);
    }
    if d2 >= 0.0 {
        points.push(v2);
    }

    if d1 * d2 < 0.0 {
        let u = d1 / (d1 - d2);
        let point = v1.point + (v2.point - v1.point) * u;
        let index = if d1 > 0.0 { v2.index } else { v1.index };
        points.push(PointFeature::new(point, index));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::narrow_phase::{Gjk, NarrowPhaseDetector};

    const EPSILON: f32 = 1e-4;

    fn manifold_for(shape_a: &Shape, ta: Transform, shape_b: &Shape, tb: Transform) -> Option<Manifold> {
        let penetration = Gjk::default().detect(shape_a, ta, shape_b, tb)?;
        ClippingManifoldSolver::default().manifold(&penetration, shape_a, ta, shape_b, tb)
    }

    #[test]
    fn test_clip_keeps_positive_side() {
        let v1 = PointFeature::new(Vec2::new(-1.0, 0.0), 4);
        let v2 = PointFeature::new(Vec2::new(1.0, 0.0), 5);

        let both = clip(v1, v2, Vec2::X, -2.0);
        assert_eq!(both.len(), 2);

        let half = clip(v1, v2, Vec2::X, 0.0);
        assert_eq!(half.len(), 2);
        assert_eq!(half[0], v2);
        // the crossing replaces v1 and inherits its index
        assert!(half[1].point.distance(Vec2::ZERO) < EPSILON);
        assert_eq!(half[1].index, 4);

        assert!(clip(v1, v2, Vec2::X, 2.0).is_empty());
    }

    #[test]
    fn test_box_resting_on_box() {
        let shape = Shape::rectangle(2.0, 2.0).expect("rectangle");
        let ta = Transform::IDENTITY;
        let tb = Transform::from_position(Vec2::new(0.5, 1.9));

        let manifold = manifold_for(&shape, ta, &shape, tb).expect("manifold");
        assert!(manifold.normal.distance(Vec2::Y) < EPSILON);
        assert_eq!(manifold.point_count(), 2);

        let mut xs: Vec<f32> = manifold.points.iter().map(|p| p.point.x).collect();
        xs.sort_by(f32::total_cmp);
        assert!((xs[0] + 0.5).abs() < EPSILON);
        assert!((xs[1] - 1.0).abs() < EPSILON);
        for p in &manifold.points {
            assert!((p.point.y - 0.9).abs() < EPSILON);
            assert!((p.depth - 0.1).abs() < EPSILON);
            assert!(matches!(p.id, ManifoldPointId::Indexed { flipped: false, .. }));
        }
        assert_ne!(manifold.points[0].id, manifold.points[1].id);
    }

    #[test]
    fn test_circle_gives_single_distance_point() {
        let rect = Shape::rectangle(2.0, 2.0).expect("rectangle");
        let circle = Shape::circle(0.5).expect("circle");
        let tb = Transform::from_position(Vec2::new(0.0, 1.25));

        let manifold = manifold_for(&rect, Transform::IDENTITY, &circle, tb).expect("manifold");
        assert_eq!(manifold.point_count(), 1);
        let point = manifold.points[0];
        assert_eq!(point.id, ManifoldPointId::Distance);
        assert!(point.point.distance(Vec2::new(0.0, 0.75)) < 1e-3);
        assert!((point.depth - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_ids_survive_tiny_perturbation() {
        let floor = Shape::rectangle(10.0, 1.0).expect("rectangle");
        let body = Shape::rectangle(1.0, 1.0).expect("rectangle");
        let ta = Transform::IDENTITY;
        let tb = Transform::from_position(Vec2::new(0.3, 0.99));

        let before = manifold_for(&floor, ta, &body, tb).expect("manifold");
        let nudged = Transform::from_position_angle(Vec2::new(0.3 + 1e-6, 0.99 - 1e-6), 1e-6);
        let after = manifold_for(&floor, ta, &body, nudged).expect("manifold");

        let ids = |m: &Manifold| m.points.iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(before.point_count(), 2);
        assert_eq!(ids(&before), ids(&after));
    }

    #[test]
    fn test_flipped_when_b_face_is_better() {
        // a tilted box resting its corner region on a flat box: the flat box
        // face is the reference when it is A, and again when it is B
        let flat = Shape::rectangle(4.0, 1.0).expect("rectangle");
        let tilted = Shape::rectangle(1.0, 1.0).expect("rectangle");
        let t_flat = Transform::IDENTITY;
        let t_tilted = Transform::from_position_angle(Vec2::new(0.0, 1.1), 0.3);

        let a_first = manifold_for(&flat, t_flat, &tilted, t_tilted).expect("manifold");
        assert!(a_first
            .points
            .iter()
            .all(|p| matches!(p.id, ManifoldPointId::Indexed { flipped: false, .. })));

        let b_first = manifold_for(&tilted, t_tilted, &flat, t_flat).expect("manifold");
        assert!(b_first
            .points
            .iter()
            .all(|p| matches!(p.id, ManifoldPointId::Indexed { flipped: true, .. })));
        assert!(b_first.normal.dot(-Vec2::Y) > 0.9);
    }

    #[test]
    fn test_deepest() {
        let manifold = Manifold {
            normal: Vec2::Y,
            points: vec![
                ManifoldPoint {
                    id: ManifoldPointId::Distance,
                    point: Vec2::ZERO,
                    depth: 0.1,
                },
                ManifoldPoint {
                    id: ManifoldPointId::Distance,
                    point: Vec2::X,
                    depth: 0.3,
                },
            ],
        };
        assert_eq!(manifold.deepest().map(|p| p.point), Some(Vec2::X));
    }
}
