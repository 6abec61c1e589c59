use crate::dynamics::Body;
use crate::error::Result;
use crate::math::{Mat2, Vec2};
use crate::solver::{SolverBody, SolverData};

use super::revolute::point_mass;
use super::{anchor_arm, check_finite_vec, check_non_negative, inverse_or_zero, JointConstraint};

/// Resists relative motion of two bodies up to a maximum force and torque.
/// Useful for top-down friction against a ground body.
#[derive(Debug, Clone)]
pub struct FrictionJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    max_force: f32,
    max_torque: f32,

    linear_impulse: Vec2,
    angular_impulse: f32,

    r_a: Vec2,
    r_b: Vec2,
    linear_mass: Mat2,
    angular_mass: f32,
}

impl FrictionJoint {
    /// Anchors both bodies at `anchor` (world coordinates)
    pub fn new(body_a: &Body, body_b: &Body, anchor: Vec2, max_force: f32, max_torque: f32) -> Result<Self> {
        let anchor = check_finite_vec(anchor, "friction joint anchor must be finite")?;
        Ok(Self {
            local_anchor_a: body_a.transform().inverse_transform_point(anchor),
            local_anchor_b: body_b.transform().inverse_transform_point(anchor),
            max_force: check_non_negative(max_force, "maximum friction force must be non-negative")?,
            max_torque: check_non_negative(max_torque, "maximum friction torque must be non-negative")?,
            linear_impulse: Vec2::ZERO,
            angular_impulse: 0.0,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            linear_mass: Mat2::ZERO,
            angular_mass: 0.0,
        })
    }

    #[inline]
    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    #[inline]
    pub fn max_torque(&self) -> f32 {
        self.max_torque
    }
}

impl JointConstraint for FrictionJoint {
    fn init_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let pa = data.positions[a.index];
        let pb = data.positions[b.index];
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        self.r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        self.r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);
        self.linear_mass = point_mass(ma, mb, ii_a, ii_b, self.r_a, self.r_b).inverse();
        self.angular_mass = inverse_or_zero(ii_a + ii_b);

        if data.step.warm_starting {
            self.linear_impulse = self.linear_impulse * data.step.dt_ratio;
            self.angular_impulse *= data.step.dt_ratio;

            let p = self.linear_impulse;
            va.v -= p * ma;
            va.w -= ii_a * (self.r_a.cross(p) + self.angular_impulse);
            vb.v += p * mb;
            vb.w += ii_b * (self.r_b.cross(p) + self.angular_impulse);
        } else {
            self.linear_impulse = Vec2::ZERO;
            self.angular_impulse = 0.0;
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];
        let h = data.step.dt;

        {
            let cdot = vb.w - va.w;
            let impulse = -self.angular_mass * cdot;
            let old = self.angular_impulse;
            let max_impulse = h * self.max_torque;
            self.angular_impulse = (old + impulse).clamp(-max_impulse, max_impulse);
            let impulse = self.angular_impulse - old;
            va.w -= ii_a * impulse;
            vb.w += ii_b * impulse;
        }

        {
            let cdot = vb.v + Vec2::scalar_cross(vb.w, self.r_b) - va.v - Vec2::scalar_cross(va.w, self.r_a);
            let impulse = -self.linear_mass.mul_vec(cdot);
            let old = self.linear_impulse;
            self.linear_impulse += impulse;

            let max_impulse = h * self.max_force;
            if self.linear_impulse.length_squared() > max_impulse * max_impulse {
                self.linear_impulse = self.linear_impulse.normalize() * max_impulse;
            }
            let impulse = self.linear_impulse - old;

            va.v -= impulse * ma;
            va.w -= ii_a * self.r_a.cross(impulse);
            vb.v += impulse * mb;
            vb.w += ii_b * self.r_b.cross(impulse);
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_position_constraints(&mut self, _a: &SolverBody, _b: &SolverBody, _data: &mut SolverData) -> bool {
        true
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.linear_impulse * inv_dt
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.angular_impulse * inv_dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::joint::test_util::{dynamic, ground, simulate};
    use crate::dynamics::BodyDesc;
    use crate::solver::{Position, Velocity};

    #[test]
    fn test_friction_slows_body_down() {
        let a = BodyDesc::fixed().build();
        let b = BodyDesc::dynamic().build();
        let mut joint = FrictionJoint::new(&a, &b, Vec2::ZERO, 1.0, 0.5).expect("friction");

        let mut positions = [Position::default(); 2];
        let mut velocities = [Velocity::default(), Velocity { v: Vec2::new(3.0, 0.0), w: 0.0 }];
        simulate(&mut joint, [ground(), dynamic(1)], &mut positions, &mut velocities, 60);

        // one second at 1 N on a 1 kg body takes off 1 m/s
        assert!((velocities[1].v.x - 2.0).abs() < 0.01, "vx = {}", velocities[1].v.x);
        assert!((joint.reaction_force(60.0).length() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_friction_stops_slow_body() {
        let a = BodyDesc::fixed().build();
        let b = BodyDesc::dynamic().build();
        let mut joint = FrictionJoint::new(&a, &b, Vec2::ZERO, 10.0, 10.0).expect("friction");

        let mut positions = [Position::default(); 2];
        let mut velocities = [Velocity::default(), Velocity { v: Vec2::new(0.1, 0.0), w: 0.2 }];
        simulate(&mut joint, [ground(), dynamic(1)], &mut positions, &mut velocities, 5);

        assert!(velocities[1].v.length() < 1e-4);
        assert!(velocities[1].w.abs() < 1e-4);
    }

    #[test]
    fn test_negative_limits_rejected() {
        let a = BodyDesc::fixed().build();
        let b = BodyDesc::dynamic().build();
        assert!(FrictionJoint::new(&a, &b, Vec2::ZERO, -1.0, 0.0).is_err());
    }
}
