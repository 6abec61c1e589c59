use crate::dynamics::Body;
use crate::error::{PhysicsError, Result};
use crate::math::{Mat2, Vec2};
use crate::solver::{SolverBody, SolverData};

use super::{anchor_arm, check_finite_vec, check_non_negative, spring_coefficients, JointConstraint};

/// Angular velocity kept per step while dragging, so the body doesn't spin
/// up around the grab point
const ANGULAR_DAMPING: f32 = 0.98;

/// Drags a point on a single body towards a target with a soft spring,
/// limited to a maximum force.
///
/// The dragged body is body A; there is no body B.
#[derive(Debug, Clone)]
pub struct MouseJoint {
    local_anchor: Vec2,
    target: Vec2,
    frequency: f32,
    damping_ratio: f32,
    max_force: f32,

    impulse: Vec2,
    gamma: f32,
    beta: f32,

    r: Vec2,
    c: Vec2,
    mass: Mat2,
}

impl MouseJoint {
    /// Grabs `body` at `target` (world coordinates)
    pub fn new(body: &Body, target: Vec2, frequency: f32, damping_ratio: f32, max_force: f32) -> Result<Self> {
        let target = check_finite_vec(target, "mouse joint target must be finite")?;
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(PhysicsError::InvalidJoint {
                reason: "mouse joint frequency must be positive",
            });
        }
        Ok(Self {
            local_anchor: body.transform().inverse_transform_point(target),
            target,
            frequency,
            damping_ratio: check_non_negative(damping_ratio, "damping ratio must be a non-negative finite number")?,
            max_force: check_non_negative(max_force, "maximum force must be non-negative")?,
            impulse: Vec2::ZERO,
            gamma: 0.0,
            beta: 0.0,
            r: Vec2::ZERO,
            c: Vec2::ZERO,
            mass: Mat2::ZERO,
        })
    }

    #[inline]
    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Moves the target. The world does not wake the body for you.
    pub fn set_target(&mut self, target: Vec2) -> Result<()> {
        self.target = check_finite_vec(target, "mouse joint target must be finite")?;
        Ok(())
    }

    #[inline]
    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    /// Grab point in body coordinates
    #[inline]
    pub fn local_anchor(&self) -> Vec2 {
        self.local_anchor
    }
}

impl JointConstraint for MouseJoint {
    fn init_velocity_constraints(&mut self, a: &SolverBody, _b: &SolverBody, data: &mut SolverData) {
        let (m_inv, ii) = (a.inv_mass, a.inv_inertia);
        let p = data.positions[a.index];
        let mut v = data.velocities[a.index];

        let mass = if m_inv > 0.0 { 1.0 / m_inv } else { 0.0 };
        let (gamma, beta) = spring_coefficients(mass, self.frequency, self.damping_ratio, data.step.dt);
        self.gamma = gamma;
        self.beta = beta;

        self.r = anchor_arm(p.a, self.local_anchor, a.local_center);
        let k11 = m_inv + ii * self.r.y * self.r.y + gamma;
        let k12 = -ii * self.r.x * self.r.y;
        let k22 = m_inv + ii * self.r.x * self.r.x + gamma;
        self.mass = Mat2::new(k11, k12, k12, k22).inverse();

        self.c = (p.c + self.r - self.target) * beta;

        v.w *= ANGULAR_DAMPING;

        if data.step.warm_starting {
            self.impulse = self.impulse * data.step.dt_ratio;
            v.v += self.impulse * m_inv;
            v.w += ii * self.r.cross(self.impulse);
        } else {
            self.impulse = Vec2::ZERO;
        }

        data.velocities[a.index] = v;
    }

    fn solve_velocity_constraints(&mut self, a: &SolverBody, _b: &SolverBody, data: &mut SolverData) {
        let mut v = data.velocities[a.index];

        let cdot = v.v + Vec2::scalar_cross(v.w, self.r);
        let impulse = self.mass.mul_vec(-(cdot + self.c + self.impulse * self.gamma));

        let old = self.impulse;
        self.impulse += impulse;
        let max_impulse = data.step.dt * self.max_force;
        if self.impulse.length_squared() > max_impulse * max_impulse {
            self.impulse = self.impulse * (max_impulse / self.impulse.length());
        }
        let impulse = self.impulse - old;

        v.v += impulse * a.inv_mass;
        v.w += a.inv_inertia * self.r.cross(impulse);
        data.velocities[a.index] = v;
    }

    fn solve_position_constraints(&mut self, _a: &SolverBody, _b: &SolverBody, _data: &mut SolverData) -> bool {
        true
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.impulse * inv_dt
    }

    fn reaction_torque(&self, _inv_dt: f32) -> f32 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::joint::test_util::{dynamic, simulate};
    use crate::dynamics::BodyDesc;
    use crate::solver::{Position, Velocity};

    #[test]
    fn test_drags_body_to_target() {
        let body = BodyDesc::dynamic().build();
        let mut joint = MouseJoint::new(&body, Vec2::ZERO, 5.0, 0.7, 1000.0).expect("mouse");
        joint.set_target(Vec2::new(2.0, 1.0)).expect("target");

        // the ground slot is never touched
        let mut positions = [Position::default(), Position::default()];
        let mut velocities = [Velocity::default(); 2];
        simulate(
            &mut joint,
            [dynamic(1), crate::solver::SolverBody::GROUND],
            &mut positions,
            &mut velocities,
            180,
        );

        assert!(positions[1].c.distance(Vec2::new(2.0, 1.0)) < 0.05, "{:?}", positions[1].c);
        assert_eq!(positions[0], Position::default());
    }

    #[test]
    fn test_force_is_capped() {
        let body = BodyDesc::dynamic().build();
        let mut joint = MouseJoint::new(&body, Vec2::ZERO, 5.0, 0.7, 6.0).expect("mouse");
        joint.set_target(Vec2::new(100.0, 0.0)).expect("target");

        let mut positions = [Position::default(); 2];
        let mut velocities = [Velocity::default(); 2];
        simulate(
            &mut joint,
            [dynamic(1), crate::solver::SolverBody::GROUND],
            &mut positions,
            &mut velocities,
            60,
        );

        // at most 6 N for one second on 1 kg
        assert!(velocities[1].v.x <= 6.0 + 1e-3);
        assert!(joint.reaction_force(60.0).length() <= 6.0 + 1e-3);
    }

    #[test]
    fn test_frequency_must_be_positive() {
        let body = BodyDesc::dynamic().build();
        assert!(MouseJoint::new(&body, Vec2::ZERO, 0.0, 0.7, 10.0).is_err());
    }
}
