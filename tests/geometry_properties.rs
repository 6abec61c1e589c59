use proptest::prelude::*;
use rustphy2d::collision::{
    ClippingManifoldSolver, DistanceDetector, Gjk, ManifoldSolver, NarrowPhaseDetector, Sat,
};
use rustphy2d::geometry::{Polygon, Shape};
use rustphy2d::math::{Transform, Vec2};

const EPSILON: f32 = 1e-3;

fn regular(count: usize, radius: f32) -> Shape {
    Shape::Polygon(Polygon::regular(count, radius).expect("regular polygon"))
}

fn point(range: f32) -> impl Strategy<Value = Vec2> {
    (-range..range, -range..range).prop_map(|(x, y)| Vec2::new(x, y))
}

/// Hull of a random point cloud, shifted off the local origin
fn hull() -> impl Strategy<Value = Shape> {
    (prop::collection::vec(point(1.5), 3..10), point(1.0)).prop_filter_map(
        "degenerate hull",
        |(points, offset)| {
            let points: Vec<Vec2> = points.into_iter().map(|p| p + offset).collect();
            let polygon = Polygon::from_points(&points).ok()?;
            (polygon.mass_properties(1.0).mass > 0.2).then_some(Shape::Polygon(polygon))
        },
    )
}

fn triangle() -> impl Strategy<Value = Shape> {
    (point(1.5), point(1.5), point(1.5)).prop_filter_map("degenerate triangle", |(a, b, c)| {
        let hull = Polygon::from_points(&[a, b, c]).ok()?;
        if hull.mass_properties(1.0).mass <= 0.2 {
            return None;
        }
        let v = hull.vertices();
        Shape::triangle(v[0], v[1], v[2]).ok()
    })
}

fn segment() -> impl Strategy<Value = Shape> {
    (point(1.5), point(1.5)).prop_filter_map("short segment", |(a, b)| {
        (a.distance(b) > 0.3).then(|| Shape::segment(a, b).ok()).flatten()
    })
}

/// Convex shapes with area, paired with their bounding radius about the
/// local origin
fn solid() -> impl Strategy<Value = (Shape, f32)> {
    prop_oneof![
        (3usize..9, 0.5f32..2.0).prop_map(|(count, radius)| regular(count, radius)),
        hull(),
        triangle(),
    ]
    .prop_map(|shape| {
        let radius = shape.rotation_radius(Vec2::ZERO);
        (shape, radius)
    })
}

/// Any non-round shape, segments included
fn polygon() -> impl Strategy<Value = (Shape, f32)> {
    prop_oneof![
        3 => solid(),
        1 => segment().prop_map(|shape| {
            let radius = shape.rotation_radius(Vec2::ZERO);
            (shape, radius)
        }),
    ]
}

proptest! {
    #[test]
    fn test_gjk_and_sat_agree(
        (a, _) in solid(),
        (b, _) in polygon(),
        angle_a in -3.1f32..3.1,
        angle_b in -3.1f32..3.1,
        x in -4.0f32..4.0,
        y in -4.0f32..4.0,
    ) {
        let ta = Transform::from_position_angle(Vec2::ZERO, angle_a);
        let tb = Transform::from_position_angle(Vec2::new(x, y), angle_b);

        let gjk = Gjk::default().detect(&a, ta, &b, tb);
        let sat = Sat.detect(&a, ta, &b, tb);

        match (gjk, sat) {
            (Some(g), Some(s)) => prop_assert!((g.depth - s.depth).abs() < 1e-2, "gjk {} sat {}", g.depth, s.depth),
            (Some(p), None) | (None, Some(p)) => prop_assert!(p.depth < EPSILON, "disagreement at depth {}", p.depth),
            (None, None) => {}
        }
    }

    #[test]
    fn test_epa_normal_separates(
        (a, _) in solid(),
        (b, _) in polygon(),
        angle in -3.1f32..3.1,
        x in -1.5f32..1.5,
        y in -1.5f32..1.5,
    ) {
        let ta = Transform::IDENTITY;
        let tb = Transform::from_position_angle(Vec2::new(x, y), angle);
        let gjk = Gjk::default();

        if let Some(penetration) = gjk.detect(&a, ta, &b, tb) {
            prop_assert!((penetration.normal.length() - 1.0).abs() < EPSILON);
            let moved = Transform::from_position_angle(
                Vec2::new(x, y) + penetration.normal * penetration.depth,
                angle,
            );
            let left = gjk.detect(&a, ta, &b, moved).map_or(0.0, |p| p.depth);
            prop_assert!(left < 1e-2, "still overlapping by {}", left);
        }
    }

    #[test]
    fn test_distance_matches_closest_points(
        (a, ra) in solid(),
        (b, rb) in polygon(),
        angle in -3.1f32..3.1,
        heading in -3.1f32..3.1,
        gap in 0.05f32..3.0,
    ) {
        let offset = Vec2::new(heading.cos(), heading.sin()) * (ra + rb + gap);
        let ta = Transform::IDENTITY;
        let tb = Transform::from_position_angle(offset, angle);

        let separation = Gjk::default().distance(&a, ta, &b, tb).expect("shapes are separated");
        prop_assert!(separation.distance > 0.0);
        prop_assert!(
            (separation.point_a.distance(separation.point_b) - separation.distance).abs() < EPSILON
        );

        // both points are extreme along the normal, so they lie on the boundaries
        let support_a = a.support_world(ta, separation.normal).dot(separation.normal);
        let support_b = b.support_world(tb, -separation.normal).dot(separation.normal);
        prop_assert!((support_a - separation.point_a.dot(separation.normal)).abs() < EPSILON);
        prop_assert!((support_b - separation.point_b.dot(separation.normal)).abs() < EPSILON);
    }

    #[test]
    fn test_overlapping_solids_clip_to_one_or_two_points(
        (a, _) in solid(),
        (b, _) in solid(),
        angle in -3.1f32..3.1,
        x in -1.5f32..1.5,
        y in -1.5f32..1.5,
    ) {
        let ta = Transform::IDENTITY;
        let tb = Transform::from_position_angle(Vec2::new(x, y), angle);
        let solver = ClippingManifoldSolver::default();

        let penetration = Gjk::default().detect(&a, ta, &b, tb);
        prop_assume!(penetration.map_or(false, |p| p.depth > 1e-2));
        let penetration = penetration.expect("overlap");

        let manifold = solver.manifold(&penetration, &a, ta, &b, tb).expect("manifold");
        prop_assert!((1..=2).contains(&manifold.point_count()));
        for point in &manifold.points {
            prop_assert!(point.depth >= -solver.separation_tolerance, "point depth {}", point.depth);
        }
    }
}

#[test]
fn test_manifold_ids_survive_tiny_perturbation() {
    let floor = Shape::rectangle(10.0, 1.0).expect("rectangle");
    let block = Shape::rectangle(1.0, 1.0).expect("rectangle");
    let gjk = Gjk::default();
    let solver = ClippingManifoldSolver::default();

    let manifold_at = |x: f32| {
        let ta = Transform::IDENTITY;
        let tb = Transform::from_position(Vec2::new(x, 0.98));
        let penetration = gjk.detect(&floor, ta, &block, tb).expect("overlap");
        solver.manifold(&penetration, &floor, ta, &block, tb).expect("manifold")
    };

    let before = manifold_at(0.3);
    let after = manifold_at(0.3 + 1e-6);

    assert_eq!(before.point_count(), 2);
    assert!(before.point_count() <= 2);
    let ids = |m: &rustphy2d::collision::Manifold| m.points.iter().map(|p| p.id).collect::<Vec<_>>();
    assert_eq!(ids(&before), ids(&after));
    for point in &before.points {
        assert!((point.depth - 0.02).abs() < EPSILON);
    }
}
