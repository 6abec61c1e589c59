use crate::error::{PhysicsError, Result};
use crate::math::Vec2;

/// Computes the convex hull of a point cloud with the monotone chain algorithm.
///
/// The result is wound counter-clockwise, starts at the lowest-x (then lowest-y)
/// point and contains no collinear vertices. Fails when fewer than three
/// non-collinear points are given.
pub fn convex_hull(points: &[Vec2]) -> Result<Vec<Vec2>> {
    if points.iter().any(|p| !p.is_finite()) {
        return Err(PhysicsError::DegenerateShape {
            reason: "hull input contains non-finite points",
        });
    }

    let mut sorted: Vec<Vec2> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();

    if sorted.len() < 3 {
        return Err(PhysicsError::DegenerateShape {
            reason: "hull needs at least 3 distinct points",
        });
    }

    // cross of (a - o) and (b - o); positive for a left turn
    let turn = |o: Vec2, a: Vec2, b: Vec2| (a - o).cross(b - o);

    let mut hull: Vec<Vec2> = Vec::with_capacity(sorted.len() * 2);

    // lower chain
    for &p in &sorted {
        while hull.len() >= 2 && turn(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    // upper chain
    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len && turn(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    // the last point repeats the first
    hull.pop();

    if hull.len() < 3 {
        return Err(PhysicsError::DegenerateShape {
            reason: "hull points are collinear",
        });
    }
    Ok(hull)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_with_interior_points() {
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.5, 0.5),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.25, 0.75),
            Vec2::new(0.5, 0.0), // collinear on the bottom edge
        ];
        let hull = convex_hull(&points).expect("hull");
        assert_eq!(
            hull,
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ]
        );
    }

    #[test]
    fn test_counter_clockwise() {
        let points = [
            Vec2::new(3.0, 1.0),
            Vec2::new(-2.0, 0.5),
            Vec2::new(0.0, 4.0),
            Vec2::new(1.0, -3.0),
            Vec2::new(0.1, 0.2),
        ];
        let hull = convex_hull(&points).expect("hull");
        let n = hull.len();
        for i in 0..n {
            let a = hull[i];
            let b = hull[(i + 1) % n];
            let c = hull[(i + 2) % n];
            assert!((b - a).cross(c - b) > 0.0);
        }
    }

    #[test]
    fn test_degenerate_input() {
        assert!(convex_hull(&[Vec2::ZERO, Vec2::X]).is_err());
        assert!(convex_hull(&[Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)]).is_err());
        assert!(convex_hull(&[Vec2::ZERO, Vec2::ZERO, Vec2::ZERO, Vec2::X]).is_err());
    }
}
