use crate::dynamics::Body;
use crate::error::Result;
use crate::math::Vec2;
use crate::solver::{SolverBody, SolverData};

use super::revolute::angle_limit_error;
use super::{check_limits, inverse_or_zero, JointConstraint};

/// Restricts the relative angle of two bodies to `[lower, upper]` without
/// constraining their positions. Both limits default to zero, which locks
/// the current relative angle.
#[derive(Debug, Clone)]
pub struct AngleJoint {
    reference_angle: f32,
    lower_angle: f32,
    upper_angle: f32,

    lower_impulse: f32,
    upper_impulse: f32,

    axial_mass: f32,
    angle: f32,
}

impl AngleJoint {
    pub fn new(body_a: &Body, body_b: &Body) -> Self {
        Self {
            reference_angle: body_b.angle() - body_a.angle(),
            lower_angle: 0.0,
            upper_angle: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            axial_mass: 0.0,
            angle: 0.0,
        }
    }

    /// Sets the limits relative to the angle at construction
    pub fn with_limits(mut self, lower: f32, upper: f32) -> Result<Self> {
        self.set_limits(lower, upper)?;
        Ok(self)
    }

    pub fn set_limits(&mut self, lower: f32, upper: f32) -> Result<()> {
        (self.lower_angle, self.upper_angle) = check_limits(lower, upper)?;
        Ok(())
    }

    #[inline]
    pub fn limits(&self) -> (f32, f32) {
        (self.lower_angle, self.upper_angle)
    }

    #[inline]
    pub fn reference_angle(&self) -> f32 {
        self.reference_angle
    }
}

impl JointConstraint for AngleJoint {
    fn init_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ii_a, ii_b) = (a.inv_inertia, b.inv_inertia);
        self.axial_mass = inverse_or_zero(ii_a + ii_b);
        self.angle = data.positions[b.index].a - data.positions[a.index].a - self.reference_angle;

        if data.step.warm_starting {
            self.lower_impulse *= data.step.dt_ratio;
            self.upper_impulse *= data.step.dt_ratio;
            let axial = self.lower_impulse - self.upper_impulse;
            data.velocities[a.index].w -= ii_a * axial;
            data.velocities[b.index].w += ii_b * axial;
        } else {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
    }

    fn solve_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ii_a, ii_b) = (a.inv_inertia, b.inv_inertia);
        let inv_dt = data.step.inv_dt;
        let mut wa = data.velocities[a.index].w;
        let mut wb = data.velocities[b.index].w;

        let c = self.angle - self.lower_angle;
        let impulse = -self.axial_mass * (wb - wa + c.max(0.0) * inv_dt);
        let old = self.lower_impulse;
        self.lower_impulse = (old + impulse).max(0.0);
        let impulse = self.lower_impulse - old;
        wa -= ii_a * impulse;
        wb += ii_b * impulse;

        let c = self.upper_angle - self.angle;
        let impulse = -self.axial_mass * (wa - wb + c.max(0.0) * inv_dt);
        let old = self.upper_impulse;
        self.upper_impulse = (old + impulse).max(0.0);
        let impulse = self.upper_impulse - old;
        wa += ii_a * impulse;
        wb -= ii_b * impulse;

        data.velocities[a.index].w = wa;
        data.velocities[b.index].w = wb;
    }

    fn solve_position_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) -> bool {
        let (ii_a, ii_b) = (a.inv_inertia, b.inv_inertia);
        let tolerance = data.settings.angular_tolerance();
        let angle = data.positions[b.index].a - data.positions[a.index].a - self.reference_angle;
        let c = angle_limit_error(
            angle,
            self.lower_angle,
            self.upper_angle,
            tolerance,
            data.settings.maximum_angular_correction(),
        );

        let impulse = -self.axial_mass * c;
        data.positions[a.index].a -= ii_a * impulse;
        data.positions[b.index].a += ii_b * impulse;
        c.abs() <= tolerance
    }

    fn reaction_force(&self, _inv_dt: f32) -> Vec2 {
        Vec2::ZERO
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        (self.lower_impulse - self.upper_impulse) * inv_dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::joint::test_util::{dynamic, ground, simulate};
    use crate::dynamics::BodyDesc;
    use crate::solver::{Position, Velocity};

    #[test]
    fn test_default_locks_relative_angle() {
        let a = BodyDesc::fixed().build();
        let b = BodyDesc::dynamic().with_angle(0.3).build();
        let mut joint = AngleJoint::new(&a, &b);
        assert!((joint.reference_angle() - 0.3).abs() < 1e-6);

        let mut positions = [Position::default(), Position { c: Vec2::ZERO, a: 0.3 }];
        let mut velocities = [Velocity::default(), Velocity { v: Vec2::new(1.0, 0.0), w: 2.0 }];
        simulate(&mut joint, [ground(), dynamic(1)], &mut positions, &mut velocities, 30);

        assert!((positions[1].a - 0.3).abs() < 0.01);
        // translation is untouched
        assert!((velocities[1].v.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_free_inside_limits() {
        let a = BodyDesc::fixed().build();
        let b = BodyDesc::dynamic().build();
        let mut joint = AngleJoint::new(&a, &b).with_limits(-1.0, 1.0).expect("limits");

        let mut positions = [Position::default(); 2];
        let mut velocities = [Velocity::default(), Velocity { v: Vec2::ZERO, w: 0.6 }];
        simulate(&mut joint, [ground(), dynamic(1)], &mut positions, &mut velocities, 30);
        assert!((velocities[1].w - 0.6).abs() < 1e-5);
        assert!((positions[1].a - 0.3).abs() < 1e-3);

        simulate(&mut joint, [ground(), dynamic(1)], &mut positions, &mut velocities, 120);
        assert!(positions[1].a <= 1.0 + 0.01);
    }
}
