use crate::dynamics::Body;
use crate::error::{PhysicsError, Result};
use crate::math::{Mat2, Vec2};
use crate::solver::{SolverBody, SolverData};

use super::{anchor_arm, check_finite_vec, check_limits, inverse_or_zero, JointConstraint};

/// Pins two bodies together at a shared point, leaving the relative rotation
/// free. Optionally limits the relative angle and drives it with a motor.
#[derive(Debug, Clone)]
pub struct RevoluteJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    reference_angle: f32,

    enable_limit: bool,
    lower_angle: f32,
    upper_angle: f32,
    enable_motor: bool,
    motor_speed: f32,
    max_motor_torque: f32,

    impulse: Vec2,
    motor_impulse: f32,
    lower_impulse: f32,
    upper_impulse: f32,

    r_a: Vec2,
    r_b: Vec2,
    axial_mass: f32,
    angle: f32,
}

impl RevoluteJoint {
    /// Pins both bodies at `anchor` (world coordinates)
    pub fn new(body_a: &Body, body_b: &Body, anchor: Vec2) -> Result<Self> {
        let anchor = check_finite_vec(anchor, "revolute joint anchor must be finite")?;
        Ok(Self {
            local_anchor_a: body_a.transform().inverse_transform_point(anchor),
            local_anchor_b: body_b.transform().inverse_transform_point(anchor),
            reference_angle: body_b.angle() - body_a.angle(),
            enable_limit: false,
            lower_angle: 0.0,
            upper_angle: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
            impulse: Vec2::ZERO,
            motor_impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            axial_mass: 0.0,
            angle: 0.0,
        })
    }

    /// Enables angle limits, relative to the angle at construction
    pub fn with_limits(mut self, lower: f32, upper: f32) -> Result<Self> {
        (self.lower_angle, self.upper_angle) = check_limits(lower, upper)?;
        self.enable_limit = true;
        Ok(self)
    }

    /// Enables a motor driving the relative angular velocity to `speed`
    pub fn with_motor(mut self, speed: f32, max_torque: f32) -> Result<Self> {
        self.set_motor(speed, max_torque)?;
        self.enable_motor = true;
        Ok(self)
    }

    pub fn set_motor(&mut self, speed: f32, max_torque: f32) -> Result<()> {
        if !speed.is_finite() || !max_torque.is_finite() || max_torque < 0.0 {
            return Err(PhysicsError::InvalidJoint {
                reason: "motor speed must be finite and maximum torque non-negative",
            });
        }
        self.motor_speed = speed;
        self.max_motor_torque = max_torque;
        Ok(())
    }

    pub fn enable_limit(&mut self, enable: bool) {
        if enable != self.enable_limit {
            self.enable_limit = enable;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
    }

    pub fn enable_motor(&mut self, enable: bool) {
        self.enable_motor = enable;
    }

    #[inline]
    pub fn is_limit_enabled(&self) -> bool {
        self.enable_limit
    }

    #[inline]
    pub fn is_motor_enabled(&self) -> bool {
        self.enable_motor
    }

    #[inline]
    pub fn limits(&self) -> (f32, f32) {
        (self.lower_angle, self.upper_angle)
    }

    #[inline]
    pub fn motor_speed(&self) -> f32 {
        self.motor_speed
    }

    #[inline]
    pub fn reference_angle(&self) -> f32 {
        self.reference_angle
    }

    /// Relative angle at the start of the last step
    #[inline]
    pub fn joint_angle(&self) -> f32 {
        self.angle
    }

    /// Motor torque applied during the last step
    pub fn motor_torque(&self, inv_dt: f32) -> f32 {
        self.motor_impulse * inv_dt
    }
}

/// Effective mass of a point-to-point constraint
pub(crate) fn point_mass(ma: f32, mb: f32, ii_a: f32, ii_b: f32, r_a: Vec2, r_b: Vec2) -> Mat2 {
    let k11 = ma + mb + r_a.y * r_a.y * ii_a + r_b.y * r_b.y * ii_b;
    let k12 = -r_a.y * r_a.x * ii_a - r_b.y * r_b.x * ii_b;
    let k22 = ma + mb + r_a.x * r_a.x * ii_a + r_b.x * r_b.x * ii_b;
    Mat2::new(k11, k12, k12, k22)
}

impl JointConstraint for RevoluteJoint {
    fn init_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let pa = data.positions[a.index];
        let pb = data.positions[b.index];
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        self.r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        self.r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);

        let fixed_rotation = ii_a + ii_b == 0.0;
        self.axial_mass = inverse_or_zero(ii_a + ii_b);
        self.angle = pb.a - pa.a - self.reference_angle;

        if !self.enable_limit || fixed_rotation {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
        if !self.enable_motor || fixed_rotation {
            self.motor_impulse = 0.0;
        }

        if data.step.warm_starting {
            let ratio = data.step.dt_ratio;
            self.impulse = self.impulse * ratio;
            self.motor_impulse *= ratio;
            self.lower_impulse *= ratio;
            self.upper_impulse *= ratio;

            let axial = self.motor_impulse + self.lower_impulse - self.upper_impulse;
            let p = self.impulse;
            va.v -= p * ma;
            va.w -= ii_a * (self.r_a.cross(p) + axial);
            vb.v += p * mb;
            vb.w += ii_b * (self.r_b.cross(p) + axial);
        } else {
            self.impulse = Vec2::ZERO;
            self.motor_impulse = 0.0;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];
        let fixed_rotation = ii_a + ii_b == 0.0;

        if self.enable_motor && !fixed_rotation {
            let cdot = vb.w - va.w - self.motor_speed;
            let impulse = -self.axial_mass * cdot;
            let old = self.motor_impulse;
            let max_impulse = data.step.dt * self.max_motor_torque;
            self.motor_impulse = (old + impulse).clamp(-max_impulse, max_impulse);
            let impulse = self.motor_impulse - old;
            va.w -= ii_a * impulse;
            vb.w += ii_b * impulse;
        }

        if self.enable_limit && !fixed_rotation {
            let inv_dt = data.step.inv_dt;

            let c = self.angle - self.lower_angle;
            let cdot = vb.w - va.w;
            let impulse = -self.axial_mass * (cdot + c.max(0.0) * inv_dt);
            let old = self.lower_impulse;
            self.lower_impulse = (old + impulse).max(0.0);
            let impulse = self.lower_impulse - old;
            va.w -= ii_a * impulse;
            vb.w += ii_b * impulse;

            // upper limit, with the sign reversed
            let c = self.upper_angle - self.angle;
            let cdot = va.w - vb.w;
            let impulse = -self.axial_mass * (cdot + c.max(0.0) * inv_dt);
            let old = self.upper_impulse;
            self.upper_impulse = (old + impulse).max(0.0);
            let impulse = self.upper_impulse - old;
            va.w += ii_a * impulse;
            vb.w -= ii_b * impulse;
        }

        // point to point
        let cdot = vb.v + Vec2::scalar_cross(vb.w, self.r_b) - va.v - Vec2::scalar_cross(va.w, self.r_a);
        let k = point_mass(ma, mb, ii_a, ii_b, self.r_a, self.r_b);
        let impulse = k.solve(-cdot);
        self.impulse += impulse;

        va.v -= impulse * ma;
        va.w -= ii_a * self.r_a.cross(impulse);
        vb.v += impulse * mb;
        vb.w += ii_b * self.r_b.cross(impulse);

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_position_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) -> bool {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let mut pa = data.positions[a.index];
        let mut pb = data.positions[b.index];
        let angular_tolerance = data.settings.angular_tolerance();
        let fixed_rotation = ii_a + ii_b == 0.0;

        let mut angular_error = 0.0;
        if self.enable_limit && !fixed_rotation {
            let angle = pb.a - pa.a - self.reference_angle;
            let c = angle_limit_error(
                angle,
                self.lower_angle,
                self.upper_angle,
                angular_tolerance,
                data.settings.maximum_angular_correction(),
            );
            let limit_impulse = -self.axial_mass * c;
            pa.a -= ii_a * limit_impulse;
            pb.a += ii_b * limit_impulse;
            angular_error = c.abs();
        }

        let r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        let r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);
        let c = pb.c + r_b - pa.c - r_a;
        let position_error = c.length();

        let k = point_mass(ma, mb, ii_a, ii_b, r_a, r_b);
        let impulse = -k.solve(c);

        pa.c -= impulse * ma;
        pa.a -= ii_a * r_a.cross(impulse);
        pb.c += impulse * mb;
        pb.a += ii_b * r_b.cross(impulse);

        data.positions[a.index] = pa;
        data.positions[b.index] = pb;
        position_error <= data.settings.linear_tolerance() && angular_error <= angular_tolerance
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.impulse * inv_dt
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * (self.motor_impulse + self.lower_impulse - self.upper_impulse)
    }
}

/// Position error of an angle against a limit pair, clamped to the maximum
/// angular correction. Zero inside the limits.
pub(crate) fn angle_limit_error(angle: f32, lower: f32, upper: f32, tolerance: f32, max_correction: f32) -> f32 {
    if (upper - lower).abs() < 2.0 * tolerance {
        (angle - lower).clamp(-max_correction, max_correction)
    } else if angle <= lower {
        (angle - lower + tolerance).clamp(-max_correction, 0.0)
    } else if angle >= upper {
        (angle - upper - tolerance).clamp(0.0, max_correction)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::joint::test_util::{dynamic, ground, simulate};
    use crate::dynamics::BodyDesc;
    use crate::solver::{Position, Velocity};

    fn pendulum() -> (RevoluteJoint, [Position; 2]) {
        let a = BodyDesc::fixed().build();
        let b = BodyDesc::dynamic().with_position(Vec2::new(1.0, 0.0)).build();
        let joint = RevoluteJoint::new(&a, &b, Vec2::ZERO).expect("joint");
        (joint, [Position::default(), Position { c: Vec2::new(1.0, 0.0), a: 0.0 }])
    }

    #[test]
    fn test_anchor_stays_pinned() {
        let (mut joint, mut positions) = pendulum();
        let mut velocities = [Velocity::default(), Velocity { v: Vec2::new(0.0, 2.0), w: 0.0 }];
        simulate(&mut joint, [ground(), dynamic(1)], &mut positions, &mut velocities, 90);

        // the body's own anchor point still sits on the world origin
        let anchor = positions[1].transform(Vec2::ZERO).transform_point(Vec2::new(-1.0, 0.0));
        assert!(anchor.length() < 0.01, "anchor drifted to {:?}", anchor);
        assert!((positions[1].c.length() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_motor_reaches_speed() {
        let (joint, mut positions) = pendulum();
        let mut joint = joint.with_motor(2.0, 1000.0).expect("motor");
        let mut velocities = [Velocity::default(); 2];
        simulate(&mut joint, [ground(), dynamic(1)], &mut positions, &mut velocities, 30);

        assert!((velocities[1].w - 2.0).abs() < 0.05, "w = {}", velocities[1].w);
        // still orbiting the pin
        assert!((positions[1].c.length() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_limit_stops_rotation() {
        let (joint, mut positions) = pendulum();
        let mut joint = joint.with_limits(-0.25, 0.25).expect("limits");
        let mut velocities = [Velocity::default(), Velocity { v: Vec2::new(0.0, 3.0), w: 3.0 }];
        simulate(&mut joint, [ground(), dynamic(1)], &mut positions, &mut velocities, 120);

        let angle = positions[1].a;
        assert!((-0.3..=0.3).contains(&angle), "angle = {}", angle);
        assert!(velocities[1].w.abs() < 1.0);
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let (joint, _) = pendulum();
        assert!(joint.clone().with_limits(1.0, -1.0).is_err());
        assert!(joint.with_motor(1.0, -5.0).is_err());
    }

    #[test]
    fn test_angle_limit_error() {
        assert_eq!(angle_limit_error(0.0, -1.0, 1.0, 0.01, 0.1), 0.0);
        assert!(angle_limit_error(1.5, -1.0, 1.0, 0.01, 0.1) > 0.0);
        assert!((angle_limit_error(5.0, -1.0, 1.0, 0.01, 0.1) - 0.1).abs() < 1e-6);
        assert!(angle_limit_error(-1.5, -1.0, 1.0, 0.01, 0.1) < 0.0);
    }
}
