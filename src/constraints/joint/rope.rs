use crate::dynamics::Body;
use crate::error::{PhysicsError, Result};
use crate::math::Vec2;
use crate::solver::{SolverBody, SolverData};

use super::{anchor_arm, check_finite_vec, inverse_or_zero, JointConstraint};

/// Keeps the distance between two anchors inside `[lower, upper]`.
///
/// With a lower limit of zero this is a plain rope: slack when short, taut at
/// the upper limit.
#[derive(Debug, Clone)]
pub struct RopeJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    lower: f32,
    upper: f32,

    lower_impulse: f32,
    upper_impulse: f32,

    u: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    length: f32,
    mass: f32,
}

impl RopeJoint {
    /// Creates a rope whose maximum length is the current anchor distance
    pub fn new(body_a: &Body, body_b: &Body, anchor_a: Vec2, anchor_b: Vec2) -> Result<Self> {
        let anchor_a = check_finite_vec(anchor_a, "rope joint anchor must be finite")?;
        let anchor_b = check_finite_vec(anchor_b, "rope joint anchor must be finite")?;
        let length = anchor_a.distance(anchor_b);

        let mut joint = Self {
            local_anchor_a: body_a.transform().inverse_transform_point(anchor_a),
            local_anchor_b: body_b.transform().inverse_transform_point(anchor_b),
            lower: 0.0,
            upper: length,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            u: Vec2::ZERO,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            length: 0.0,
            mass: 0.0,
        };
        joint.set_limits(0.0, length)?;
        Ok(joint)
    }

    /// Sets both length limits
    pub fn with_limits(mut self, lower: f32, upper: f32) -> Result<Self> {
        self.set_limits(lower, upper)?;
        Ok(self)
    }

    pub fn set_limits(&mut self, lower: f32, upper: f32) -> Result<()> {
        if !(lower.is_finite() && upper.is_finite()) || lower < 0.0 || upper <= 0.0 || lower > upper {
            return Err(PhysicsError::InvalidJoint {
                reason: "rope limits must satisfy 0 <= lower <= upper with upper > 0",
            });
        }
        self.lower = lower;
        self.upper = upper;
        Ok(())
    }

    #[inline]
    pub fn lower_limit(&self) -> f32 {
        self.lower
    }

    #[inline]
    pub fn upper_limit(&self) -> f32 {
        self.upper
    }

    /// Anchor distance at the start of the last step
    #[inline]
    pub fn current_length(&self) -> f32 {
        self.length
    }
}

impl JointConstraint for RopeJoint {
    fn init_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let pa = data.positions[a.index];
        let pb = data.positions[b.index];
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        self.r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        self.r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);
        let (u, length) = (pb.c + self.r_b - pa.c - self.r_a).normalize_with_length();
        self.length = length;

        if length <= data.settings.linear_tolerance() {
            // direction is undefined
            self.u = Vec2::ZERO;
            self.mass = 0.0;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
            return;
        }
        self.u = u;

        let cr_a = self.r_a.cross(u);
        let cr_b = self.r_b.cross(u);
        self.mass = inverse_or_zero(ma + ii_a * cr_a * cr_a + mb + ii_b * cr_b * cr_b);

        if data.step.warm_starting {
            self.lower_impulse *= data.step.dt_ratio;
            self.upper_impulse *= data.step.dt_ratio;
            let p = u * (self.lower_impulse - self.upper_impulse);
            va.v -= p * ma;
            va.w -= ii_a * self.r_a.cross(p);
            vb.v += p * mb;
            vb.w += ii_b * self.r_b.cross(p);
        } else {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];
        let inv_dt = data.step.inv_dt;

        // lower limit pushes apart
        {
            let c = self.length - self.lower;
            let vp_a = va.v + Vec2::scalar_cross(va.w, self.r_a);
            let vp_b = vb.v + Vec2::scalar_cross(vb.w, self.r_b);
            let cdot = self.u.dot(vp_b - vp_a);

            // speculative while separated from the limit
            let impulse = -self.mass * (cdot + c.max(0.0) * inv_dt);
            let old = self.lower_impulse;
            self.lower_impulse = (old + impulse).max(0.0);
            let impulse = self.lower_impulse - old;

            let p = self.u * impulse;
            va.v -= p * a.inv_mass;
            va.w -= a.inv_inertia * self.r_a.cross(p);
            vb.v += p * b.inv_mass;
            vb.w += b.inv_inertia * self.r_b.cross(p);
        }

        // upper limit pulls together
        {
            let c = self.upper - self.length;
            let vp_a = va.v + Vec2::scalar_cross(va.w, self.r_a);
            let vp_b = vb.v + Vec2::scalar_cross(vb.w, self.r_b);
            let cdot = self.u.dot(vp_a - vp_b);

            let impulse = -self.mass * (cdot + c.max(0.0) * inv_dt);
            let old = self.upper_impulse;
            self.upper_impulse = (old + impulse).max(0.0);
            let impulse = self.upper_impulse - old;

            let p = self.u * -impulse;
            va.v -= p * a.inv_mass;
            va.w -= a.inv_inertia * self.r_a.cross(p);
            vb.v += p * b.inv_mass;
            vb.w += b.inv_inertia * self.r_b.cross(p);
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_position_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) -> bool {
        let mut pa = data.positions[a.index];
        let mut pb = data.positions[b.index];
        let r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        let r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);
        let (u, length) = (pb.c + r_b - pa.c - r_a).normalize_with_length();

        let max_correction = data.settings.maximum_linear_correction();
        let c = if length < self.lower {
            (length - self.lower).clamp(-max_correction, 0.0)
        } else if length > self.upper {
            (length - self.upper).clamp(0.0, max_correction)
        } else {
            return true;
        };

        let impulse = -self.mass * c;
        let p = u * impulse;
        pa.c -= p * a.inv_mass;
        pa.a -= a.inv_inertia * r_a.cross(p);
        pb.c += p * b.inv_mass;
        pb.a += b.inv_inertia * r_b.cross(p);

        data.positions[a.index] = pa;
        data.positions[b.index] = pb;
        c.abs() < data.settings.linear_tolerance()
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.u * ((self.lower_impulse - self.upper_impulse) * inv_dt)
    }

    fn reaction_torque(&self, _inv_dt: f32) -> f32 {
        0.0
    }
}
