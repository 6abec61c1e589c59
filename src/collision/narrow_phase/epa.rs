use crate::geometry::Shape;
use crate::math::{Transform, Vec2};

use super::gjk::{MinkowskiPoint, Simplex};
use super::Penetration;

/// An edge of the expanding polytope
#[derive(Debug, Clone, Copy)]
struct Edge {
    a: Vec2,
    b: Vec2,
    /// Outward unit normal
    normal: Vec2,
    /// Distance from the origin to the edge's line
    distance: f32,
}

impl Edge {
    fn new(a: Vec2, b: Vec2, counter_clockwise: bool) -> Option<Self> {
        let edge = b - a;
        let outward = if counter_clockwise { edge.right() } else { edge.perp() };
        let normal = outward.try_normalize()?;
        Some(Self {
            a,
            b,
            normal,
            distance: a.dot(normal).abs(),
        })
    }
}

/// Expanding Polytope Algorithm.
///
/// Grows the GJK terminal triangle towards the boundary of the Minkowski
/// difference until the closest edge stops moving by more than `epsilon`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Epa {
    max_iterations: usize,
    epsilon: f32,
}

impl Default for Epa {
    fn default() -> Self {
        Self::new(100, 1e-4)
    }
}

impl Epa {
    pub fn new(max_iterations: usize, epsilon: f32) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            epsilon,
        }
    }

    /// Penetration normal (A towards B) and depth for a simplex that encloses
    /// the origin. Returns `None` if the depth collapses to zero.
    pub fn penetration(
        &self,
        simplex: &Simplex,
        shape_a: &Shape,
        transform_a: Transform,
        shape_b: &Shape,
        transform_b: Transform,
    ) -> Option<Penetration> {
        let points: Vec<Vec2> = simplex.points().iter().map(|p| p.point).collect();
        let counter_clockwise = winding(&points)?;

        let mut edges: Vec<Edge> = (0..points.len())
            .filter_map(|i| Edge::new(points[i], points[(i + 1) % points.len()], counter_clockwise))
            .collect();

        for _ in 0..self.max_iterations {
            let (index, edge) = closest_edge(&edges)?;
            let support =
                MinkowskiPoint::support(shape_a, transform_a, shape_b, transform_b, edge.normal).point;
            let projection = support.dot(edge.normal);

            if projection - edge.distance < self.epsilon {
                return penetration(edge.normal, projection);
            }

            // split the closest edge at the new boundary point
            edges.remove(index);
            let mut insert_at = index;
            for (a, b) in [(edge.a, support), (support, edge.b)] {
                if let Some(new_edge) = Edge::new(a, b, counter_clockwise) {
                    edges.insert(insert_at, new_edge);
                    insert_at += 1;
                }
            }
        }

        log::trace!("epa hit the iteration cap of {}", self.max_iterations);
        let (_, edge) = closest_edge(&edges)?;
        penetration(edge.normal, edge.distance)
    }
}

fn penetration(normal: Vec2, depth: f32) -> Option<Penetration> {
    (depth > 0.0).then_some(Penetration { normal, depth })
}

/// Orientation of the simplex around the origin; `None` if every point is
/// collinear with the origin
fn winding(points: &[Vec2]) -> Option<bool> {
    (0..points.len())
        .map(|i| points[i].cross(points[(i + 1) % points.len()]))
        .find(|cross| *cross != 0.0)
        .map(|cross| cross > 0.0)
}

/// Closest edge to the origin; the first one wins ties
fn closest_edge(edges: &[Edge]) -> Option<(usize, Edge)> {
    let mut best: Option<(usize, Edge)> = None;
    for (i, edge) in edges.iter().enumerate() {
        match best {
            Some((_, current)) if current.distance <= edge.distance => {}
            _ => best = Some((i, *edge)),
        }
    }
    best
}
