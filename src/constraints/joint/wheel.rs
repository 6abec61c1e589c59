use crate::dynamics::Body;
use crate::error::{PhysicsError, Result};
use crate::math::{Rotation, Vec2};
use crate::solver::{SolverBody, SolverData};

use super::{anchor_arm, check_finite_vec, check_spring, inverse_or_zero, spring_coefficients, JointConstraint};

/// A wheel on a suspension: body B may slide along an axis fixed in body A
/// (held by a spring) and rotate freely, optionally driven by a motor.
#[derive(Debug, Clone)]
pub struct WheelJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    local_x_axis_a: Vec2,
    local_y_axis_a: Vec2,

    frequency: f32,
    damping_ratio: f32,
    enable_motor: bool,
    motor_speed: f32,
    max_motor_torque: f32,

    impulse: f32,
    motor_impulse: f32,
    spring_impulse: f32,

    ax: Vec2,
    ay: Vec2,
    s_ax: f32,
    s_bx: f32,
    s_ay: f32,
    s_by: f32,
    mass: f32,
    motor_mass: f32,
    spring_mass: f32,
    bias: f32,
    gamma: f32,
}

impl WheelJoint {
    /// Suspension along `axis` (world coordinates) through `anchor`, usually
    /// the wheel center. The spring defaults to 2 Hz with a damping ratio of 0.7.
    pub fn new(body_a: &Body, body_b: &Body, anchor: Vec2, axis: Vec2) -> Result<Self> {
        let anchor = check_finite_vec(anchor, "wheel joint anchor must be finite")?;
        let axis = check_finite_vec(axis, "wheel joint axis must be finite")?
            .try_normalize()
            .ok_or(PhysicsError::InvalidJoint {
                reason: "wheel joint axis must not be zero",
            })?;

        let transform_a = body_a.transform();
        let local_x_axis_a = transform_a.inverse_transform_vector(axis);
        Ok(Self {
            local_anchor_a: transform_a.inverse_transform_point(anchor),
            local_anchor_b: body_b.transform().inverse_transform_point(anchor),
            local_x_axis_a,
            local_y_axis_a: local_x_axis_a.perp(),
            frequency: 2.0,
            damping_ratio: 0.7,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
            impulse: 0.0,
            motor_impulse: 0.0,
            spring_impulse: 0.0,
            ax: Vec2::ZERO,
            ay: Vec2::ZERO,
            s_ax: 0.0,
            s_bx: 0.0,
            s_ay: 0.0,
            s_by: 0.0,
            mass: 0.0,
            motor_mass: 0.0,
            spring_mass: 0.0,
            bias: 0.0,
            gamma: 0.0,
        })
    }

    /// Sets the suspension spring. A frequency of zero disables it and lets
    /// the wheel slide freely along the axis.
    pub fn with_spring(mut self, frequency: f32, damping_ratio: f32) -> Result<Self> {
        (self.frequency, self.damping_ratio) = check_spring(frequency, damping_ratio)?;
        Ok(self)
    }

    /// Enables a motor driving the wheel's angular velocity
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

    pub fn enable_motor(&mut self, enable: bool) {
        self.enable_motor = enable;
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    #[inline]
    pub fn damping_ratio(&self) -> f32 {
        self.damping_ratio
    }

    #[inline]
    pub fn motor_speed(&self) -> f32 {
        self.motor_speed
    }
}

impl JointConstraint for WheelJoint {
    fn init_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let pa = data.positions[a.index];
        let pb = data.positions[b.index];
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        let rotation_a = Rotation::from_angle(pa.a);
        let r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        let r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);
        let d = pb.c + r_b - pa.c - r_a;

        // point to line
        self.ay = rotation_a.rotate(self.local_y_axis_a);
        self.s_ay = (d + r_a).cross(self.ay);
        self.s_by = r_b.cross(self.ay);
        self.mass = inverse_or_zero(ma + mb + ii_a * self.s_ay * self.s_ay + ii_b * self.s_by * self.s_by);

        // suspension spring
        self.ax = rotation_a.rotate(self.local_x_axis_a);
        self.s_ax = (d + r_a).cross(self.ax);
        self.s_bx = r_b.cross(self.ax);
        self.spring_mass = 0.0;
        self.bias = 0.0;
        self.gamma = 0.0;
        if self.frequency > 0.0 {
            let inv_mass = ma + mb + ii_a * self.s_ax * self.s_ax + ii_b * self.s_bx * self.s_bx;
            if inv_mass > 0.0 {
                let c = d.dot(self.ax);
                let (gamma, beta) =
                    spring_coefficients(1.0 / inv_mass, self.frequency, self.damping_ratio, data.step.dt);
                self.gamma = gamma;
                self.bias = c * beta;
                self.spring_mass = inverse_or_zero(inv_mass + gamma);
            }
        } else {
            self.spring_impulse = 0.0;
        }

        if self.enable_motor {
            self.motor_mass = inverse_or_zero(ii_a + ii_b);
        } else {
            self.motor_mass = 0.0;
            self.motor_impulse = 0.0;
        }

        if data.step.warm_starting {
            let ratio = data.step.dt_ratio;
            self.impulse *= ratio;
            self.spring_impulse *= ratio;
            self.motor_impulse *= ratio;

            let p = self.ay * self.impulse + self.ax * self.spring_impulse;
            let la = self.impulse * self.s_ay + self.spring_impulse * self.s_ax + self.motor_impulse;
            let lb = self.impulse * self.s_by + self.spring_impulse * self.s_bx + self.motor_impulse;
            va.v -= p * ma;
            va.w -= ii_a * la;
            vb.v += p * mb;
            vb.w += ii_b * lb;
        } else {
            self.impulse = 0.0;
            self.spring_impulse = 0.0;
            self.motor_impulse = 0.0;
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        // spring
        {
            let cdot = self.ax.dot(vb.v - va.v) + self.s_bx * vb.w - self.s_ax * va.w;
            let impulse = -self.spring_mass * (cdot + self.bias + self.gamma * self.spring_impulse);
            self.spring_impulse += impulse;

            let p = self.ax * impulse;
            va.v -= p * ma;
            va.w -= ii_a * impulse * self.s_ax;
            vb.v += p * mb;
            vb.w += ii_b * impulse * self.s_bx;
        }

        // motor
        if self.enable_motor {
            let cdot = vb.w - va.w - self.motor_speed;
            let impulse = -self.motor_mass * cdot;
            let old = self.motor_impulse;
            let max_impulse = data.step.dt * self.max_motor_torque;
            self.motor_impulse = (old + impulse).clamp(-max_impulse, max_impulse);
            let impulse = self.motor_impulse - old;
            va.w -= ii_a * impulse;
            vb.w += ii_b * impulse;
        }

        // point to line
        {
            let cdot = self.ay.dot(vb.v - va.v) + self.s_by * vb.w - self.s_ay * va.w;
            let impulse = -self.mass * cdot;
            self.impulse += impulse;

            let p = self.ay * impulse;
            va.v -= p * ma;
            va.w -= ii_a * impulse * self.s_ay;
            vb.v += p * mb;
            vb.w += ii_b * impulse * self.s_by;
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_position_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) -> bool {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let mut pa = data.positions[a.index];
        let mut pb = data.positions[b.index];

        let r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        let r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);
        let d = pb.c - pa.c + r_b - r_a;

        let ay = Rotation::from_angle(pa.a).rotate(self.local_y_axis_a);
        let s_ay = (d + r_a).cross(ay);
        let s_by = r_b.cross(ay);

        let c = d.dot(ay);
        let k = ma + mb + ii_a * s_ay * s_ay + ii_b * s_by * s_by;
        let impulse = if k != 0.0 { -c / k } else { 0.0 };

        let p = ay * impulse;
        pa.c -= p * ma;
        pa.a -= ii_a * impulse * s_ay;
        pb.c += p * mb;
        pb.a += ii_b * impulse * s_by;

        data.positions[a.index] = pa;
        data.positions[b.index] = pb;
        c.abs() <= data.settings.linear_tolerance()
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        (self.ay * self.impulse + self.ax * self.spring_impulse) * inv_dt
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.motor_impulse * inv_dt
    }
}
