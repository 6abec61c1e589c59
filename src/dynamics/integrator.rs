use crate::math::Vec2;
use crate::solver::{Position, Velocity};

use super::rigid_body::Body;

/// Integrates forces into a velocity (semi-implicit Euler).
///
/// Only dynamic bodies respond to gravity and forces. Damping is applied as
/// `v *= 1 / (1 + dt * c)`, which stays stable for any step size.
pub fn integrate_velocity(body: &Body, velocity: &mut Velocity, gravity: Vec2, dt: f32) {
    if !body.is_dynamic() {
        return;
    }

    let inv_mass = body.inv_mass();
    velocity.v += (gravity * (body.gravity_scale * body.mass()) + body.force()) * (dt * inv_mass);
    velocity.w += dt * body.inv_inertia() * body.torque();

    velocity.v = velocity.v * (1.0 / (1.0 + dt * body.linear_damping));
    velocity.w *= 1.0 / (1.0 + dt * body.angular_damping);
}

/// Integrates a velocity into a position.
///
/// The velocity is scaled down first if the step would move the body further
/// than `max_translation` or turn it more than `max_rotation`.
pub fn integrate_position(
    position: &mut Position,
    velocity: &mut Velocity,
    dt: f32,
    max_translation: f32,
    max_rotation: f32,
) {
    let translation = velocity.v * dt;
    if translation.length_squared() > max_translation * max_translation {
        velocity.v = velocity.v * (max_translation / translation.length());
    }

    let rotation = velocity.w * dt;
    if rotation.abs() > max_rotation {
        velocity.w *= max_rotation / rotation.abs();
    }

    position.c += velocity.v * dt;
    position.a += velocity.w * dt;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{BodyDesc, Fixture};
    use crate::geometry::Shape;

    const EPSILON: f32 = 1e-5;
    const DT: f32 = 1.0 / 60.0;

    fn unit_box(desc: BodyDesc) -> Body {
        desc.build()
            .with_fixture(Fixture::new(Shape::rectangle(1.0, 1.0).expect("rectangle")))
    }

    #[test]
    fn test_gravity_integration() {
        let body = unit_box(BodyDesc::dynamic());
        let mut velocity = Velocity::default();
        let mut position = Position::default();

        integrate_velocity(&body, &mut velocity, Vec2::new(0.0, -9.8), DT);
        integrate_position(&mut position, &mut velocity, DT, 2.0, 1.0);

        assert!((velocity.v.y + 9.8 * DT).abs() < EPSILON);
        assert!(position.c.y < 0.0);
    }

    #[test]
    fn test_gravity_scale() {
        let body = unit_box(BodyDesc::dynamic().with_gravity_scale(0.0));
        let mut velocity = Velocity::default();
        integrate_velocity(&body, &mut velocity, Vec2::new(0.0, -9.8), DT);
        assert_eq!(velocity.v, Vec2::ZERO);
    }

    #[test]
    fn test_static_body_no_integration() {
        let body = unit_box(BodyDesc::fixed());
        let mut velocity = Velocity::default();
        integrate_velocity(&body, &mut velocity, Vec2::new(0.0, -9.8), DT);
        assert_eq!(velocity, Velocity::default());
    }

    #[test]
    fn test_kinematic_ignores_forces() {
        let mut body = unit_box(BodyDesc::kinematic());
        body.apply_force(Vec2::new(100.0, 0.0));
        let mut velocity = Velocity { v: Vec2::new(1.0, 0.0), w: 0.0 };
        integrate_velocity(&body, &mut velocity, Vec2::new(0.0, -9.8), DT);
        assert_eq!(velocity.v, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_force_and_torque() {
        let mut body = unit_box(BodyDesc::dynamic().with_damping(0.0, 0.0));
        body.apply_force(Vec2::new(2.0, 0.0));
        body.apply_torque(1.0);
        let mut velocity = Velocity::default();
        integrate_velocity(&body, &mut velocity, Vec2::ZERO, 1.0);

        assert!((velocity.v.x - 2.0).abs() < EPSILON);
        // unit box: I = 1/6
        assert!((velocity.w - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_damping() {
        let body = unit_box(BodyDesc::dynamic().with_damping(0.1, 0.0));
        let mut velocity = Velocity { v: Vec2::new(10.0, 0.0), w: 0.0 };
        integrate_velocity(&body, &mut velocity, Vec2::ZERO, 1.0);

        assert!(velocity.v.x < 10.0);
        assert!((velocity.v.x - 10.0 / 1.1).abs() < 1e-4);
    }

    #[test]
    fn test_translation_is_clamped() {
        let mut position = Position::default();
        let mut velocity = Velocity { v: Vec2::new(600.0, 0.0), w: 0.0 };
        integrate_position(&mut position, &mut velocity, DT, 2.0, 1.0);

        assert!((position.c.x - 2.0).abs() < 1e-4);
        assert!((velocity.v.x - 120.0).abs() < 1e-2);
    }

    #[test]
    fn test_rotation_is_clamped() {
        let mut position = Position::default();
        let mut velocity = Velocity { v: Vec2::ZERO, w: -120.0 };
        integrate_position(&mut position, &mut velocity, DT, 2.0, 0.5);

        assert!((position.a + 0.5).abs() < 1e-5);
    }
}
