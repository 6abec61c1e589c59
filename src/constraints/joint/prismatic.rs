use crate::dynamics::Body;
use crate::error::{PhysicsError, Result};
use crate::math::{Mat2, Mat3, Rotation, Vec2, Vec3};
use crate::solver::{SolverBody, SolverData};

use super::{anchor_arm, check_finite_vec, check_limits, inverse_or_zero, JointConstraint};

/// Lets body B slide along an axis fixed in body A, with no relative
/// rotation. Optionally limits the translation and drives it with a motor.
#[derive(Debug, Clone)]
pub struct PrismaticJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    local_x_axis_a: Vec2,
    local_y_axis_a: Vec2,
    reference_angle: f32,

    enable_limit: bool,
    lower_translation: f32,
    upper_translation: f32,
    enable_motor: bool,
    motor_speed: f32,
    max_motor_force: f32,

    /// Perpendicular and angular accumulated impulses
    impulse: Vec2,
    motor_impulse: f32,
    lower_impulse: f32,
    upper_impulse: f32,

    axis: Vec2,
    perp: Vec2,
    s1: f32,
    s2: f32,
    a1: f32,
    a2: f32,
    k: Mat2,
    translation: f32,
    axial_mass: f32,
}

impl PrismaticJoint {
    /// Slides along `axis` (world coordinates) through `anchor`
    pub fn new(body_a: &Body, body_b: &Body, anchor: Vec2, axis: Vec2) -> Result<Self> {
        let anchor = check_finite_vec(anchor, "prismatic joint anchor must be finite")?;
        let axis = check_finite_vec(axis, "prismatic joint axis must be finite")?
            .try_normalize()
            .ok_or(PhysicsError::InvalidJoint {
                reason: "prismatic joint axis must not be zero",
            })?;

        let transform_a = body_a.transform();
        let local_x_axis_a = transform_a.inverse_transform_vector(axis);
        Ok(Self {
            local_anchor_a: transform_a.inverse_transform_point(anchor),
            local_anchor_b: body_b.transform().inverse_transform_point(anchor),
            local_x_axis_a,
            local_y_axis_a: local_x_axis_a.perp(),
            reference_angle: body_b.angle() - body_a.angle(),
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_force: 0.0,
            impulse: Vec2::ZERO,
            motor_impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            axis: Vec2::ZERO,
            perp: Vec2::ZERO,
            s1: 0.0,
            s2: 0.0,
            a1: 0.0,
            a2: 0.0,
            k: Mat2::ZERO,
            translation: 0.0,
            axial_mass: 0.0,
        })
    }

    /// Enables translation limits along the axis
    pub fn with_limits(mut self, lower: f32, upper: f32) -> Result<Self> {
        (self.lower_translation, self.upper_translation) = check_limits(lower, upper)?;
        self.enable_limit = true;
        Ok(self)
    }

    /// Enables a motor driving the translation speed
    pub fn with_motor(mut self, speed: f32, max_force: f32) -> Result<Self> {
        self.set_motor(speed, max_force)?;
        self.enable_motor = true;
        Ok(self)
    }

    pub fn set_motor(&mut self, speed: f32, max_force: f32) -> Result<()> {
        if !speed.is_finite() || !max_force.is_finite() || max_force < 0.0 {
            return Err(PhysicsError::InvalidJoint {
                reason: "motor speed must be finite and maximum force non-negative",
            });
        }
        self.motor_speed = speed;
        self.max_motor_force = max_force;
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
    pub fn limits(&self) -> (f32, f32) {
        (self.lower_translation, self.upper_translation)
    }

    /// Axis in body A's frame
    #[inline]
    pub fn local_axis(&self) -> Vec2 {
        self.local_x_axis_a
    }

    /// Motor force applied during the last step
    pub fn motor_force(&self, inv_dt: f32) -> f32 {
        self.motor_impulse * inv_dt
    }
}

impl JointConstraint for PrismaticJoint {
    fn init_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let pa = data.positions[a.index];
        let pb = data.positions[b.index];
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        let rotation_a = Rotation::from_angle(pa.a);
        let r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        let r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);
        let d = pb.c - pa.c + r_b - r_a;

        self.axis = rotation_a.rotate(self.local_x_axis_a);
        self.a1 = (d + r_a).cross(self.axis);
        self.a2 = r_b.cross(self.axis);
        self.axial_mass = inverse_or_zero(ma + mb + ii_a * self.a1 * self.a1 + ii_b * self.a2 * self.a2);

        self.perp = rotation_a.rotate(self.local_y_axis_a);
        self.s1 = (d + r_a).cross(self.perp);
        self.s2 = r_b.cross(self.perp);

        let k11 = ma + mb + ii_a * self.s1 * self.s1 + ii_b * self.s2 * self.s2;
        let k12 = ii_a * self.s1 + ii_b * self.s2;
        let mut k22 = ii_a + ii_b;
        if k22 == 0.0 {
            // both bodies have fixed rotation
            k22 = 1.0;
        }
        self.k = Mat2::new(k11, k12, k12, k22);

        if self.enable_limit {
            self.translation = self.axis.dot(d);
        } else {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
        if !self.enable_motor {
            self.motor_impulse = 0.0;
        }

        if data.step.warm_starting {
            let ratio = data.step.dt_ratio;
            self.impulse = self.impulse * ratio;
            self.motor_impulse *= ratio;
            self.lower_impulse *= ratio;
            self.upper_impulse *= ratio;

            let axial = self.motor_impulse + self.lower_impulse - self.upper_impulse;
            let p = self.perp * self.impulse.x + self.axis * axial;
            let la = self.impulse.x * self.s1 + self.impulse.y + axial * self.a1;
            let lb = self.impulse.x * self.s2 + self.impulse.y + axial * self.a2;

            va.v -= p * ma;
            va.w -= ii_a * la;
            vb.v += p * mb;
            vb.w += ii_b * lb;
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

        if self.enable_motor {
            let cdot = self.axis.dot(vb.v - va.v) + self.a2 * vb.w - self.a1 * va.w;
            let impulse = self.axial_mass * (self.motor_speed - cdot);
            let old = self.motor_impulse;
            let max_impulse = data.step.dt * self.max_motor_force;
            self.motor_impulse = (old + impulse).clamp(-max_impulse, max_impulse);
            let impulse = self.motor_impulse - old;

            let p = self.axis * impulse;
            va.v -= p * ma;
            va.w -= ii_a * impulse * self.a1;
            vb.v += p * mb;
            vb.w += ii_b * impulse * self.a2;
        }

        if self.enable_limit {
            let inv_dt = data.step.inv_dt;

            let c = self.translation - self.lower_translation;
            let cdot = self.axis.dot(vb.v - va.v) + self.a2 * vb.w - self.a1 * va.w;
            let impulse = -self.axial_mass * (cdot + c.max(0.0) * inv_dt);
            let old = self.lower_impulse;
            self.lower_impulse = (old + impulse).max(0.0);
            let impulse = self.lower_impulse - old;

            let p = self.axis * impulse;
            va.v -= p * ma;
            va.w -= ii_a * impulse * self.a1;
            vb.v += p * mb;
            vb.w += ii_b * impulse * self.a2;

            // upper limit, with the sign reversed
            let c = self.upper_translation - self.translation;
            let cdot = self.axis.dot(va.v - vb.v) + self.a1 * va.w - self.a2 * vb.w;
            let impulse = -self.axial_mass * (cdot + c.max(0.0) * inv_dt);
            let old = self.upper_impulse;
            self.upper_impulse = (old + impulse).max(0.0);
            let impulse = self.upper_impulse - old;

            let p = self.axis * impulse;
            va.v += p * ma;
            va.w += ii_a * impulse * self.a1;
            vb.v -= p * mb;
            vb.w -= ii_b * impulse * self.a2;
        }

        // perpendicular and angular rows
        let cdot = Vec2::new(
            self.perp.dot(vb.v - va.v) + self.s2 * vb.w - self.s1 * va.w,
            vb.w - va.w,
        );
        let df = self.k.solve(-cdot);
        self.impulse += df;

        let p = self.perp * df.x;
        let la = df.x * self.s1 + df.y;
        let lb = df.x * self.s2 + df.y;
        va.v -= p * ma;
        va.w -= ii_a * la;
        vb.v += p * mb;
        vb.w += ii_b * lb;

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_position_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) -> bool {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let mut pa = data.positions[a.index];
        let mut pb = data.positions[b.index];
        let linear_tolerance = data.settings.linear_tolerance();

        let rotation_a = Rotation::from_angle(pa.a);
        let r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        let r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);
        let d = pb.c + r_b - pa.c - r_a;

        let axis = rotation_a.rotate(self.local_x_axis_a);
        let a1 = (d + r_a).cross(axis);
        let a2 = r_b.cross(axis);
        let perp = rotation_a.rotate(self.local_y_axis_a);
        let s1 = (d + r_a).cross(perp);
        let s2 = r_b.cross(perp);

        let c1 = Vec2::new(perp.dot(d), pb.a - pa.a - self.reference_angle);
        let mut linear_error = c1.x.abs();
        let angular_error = c1.y.abs();

        let mut active = false;
        let mut c2 = 0.0;
        if self.enable_limit {
            let translation = axis.dot(d);
            if (self.upper_translation - self.lower_translation).abs() < 2.0 * linear_tolerance {
                c2 = translation - self.lower_translation;
                linear_error = linear_error.max(c2.abs());
                active = true;
            } else if translation <= self.lower_translation {
                c2 = (translation - self.lower_translation).min(0.0);
                linear_error = linear_error.max(self.lower_translation - translation);
                active = true;
            } else if translation >= self.upper_translation {
                c2 = (translation - self.upper_translation).max(0.0);
                linear_error = linear_error.max(translation - self.upper_translation);
                active = true;
            }
        }

        let k11 = ma + mb + ii_a * s1 * s1 + ii_b * s2 * s2;
        let k12 = ii_a * s1 + ii_b * s2;
        let mut k22 = ii_a + ii_b;
        if k22 == 0.0 {
            k22 = 1.0;
        }

        let impulse = if active {
            let k13 = ii_a * s1 * a1 + ii_b * s2 * a2;
            let k23 = ii_a * a1 + ii_b * a2;
            let k33 = ma + mb + ii_a * a1 * a1 + ii_b * a2 * a2;
            let k = Mat3::from_cols(
                Vec3::new(k11, k12, k13),
                Vec3::new(k12, k22, k23),
                Vec3::new(k13, k23, k33),
            );
            -k.solve33(Vec3::new(c1.x, c1.y, c2))
        } else {
            let impulse = -Mat2::new(k11, k12, k12, k22).solve(c1);
            Vec3::new(impulse.x, impulse.y, 0.0)
        };

        let p = perp * impulse.x + axis * impulse.z;
        let la = impulse.x * s1 + impulse.y + impulse.z * a1;
        let lb = impulse.x * s2 + impulse.y + impulse.z * a2;
        pa.c -= p * ma;
        pa.a -= ii_a * la;
        pb.c += p * mb;
        pb.a += ii_b * lb;

        data.positions[a.index] = pa;
        data.positions[b.index] = pb;
        linear_error <= linear_tolerance && angular_error <= data.settings.angular_tolerance()
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        let axial = self.motor_impulse + self.lower_impulse - self.upper_impulse;
        (self.perp * self.impulse.x + self.axis * axial) * inv_dt
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.impulse.y * inv_dt
    }
}
