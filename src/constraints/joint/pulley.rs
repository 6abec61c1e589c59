use crate::dynamics::Body;
use crate::error::{PhysicsError, Result};
use crate::math::Vec2;
use crate::solver::{SolverBody, SolverData};

use super::{anchor_arm, check_finite_vec, inverse_or_zero, JointConstraint};

/// Rope segments shorter than this (in linear tolerances) lose their direction
const MIN_SEGMENT_TOLERANCES: f32 = 10.0;

/// Two bodies hanging from fixed ground anchors by a shared rope:
/// `length_a + ratio * length_b` stays constant.
#[derive(Debug, Clone)]
pub struct PulleyJoint {
    ground_anchor_a: Vec2,
    ground_anchor_b: Vec2,
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    length_a: f32,
    length_b: f32,
    ratio: f32,
    constant: f32,

    impulse: f32,

    u_a: Vec2,
    u_b: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    mass: f32,
}

impl PulleyJoint {
    /// All points are in world coordinates. `ratio` scales the rope on the B
    /// side and must be positive.
    pub fn new(
        body_a: &Body,
        body_b: &Body,
        ground_anchor_a: Vec2,
        ground_anchor_b: Vec2,
        anchor_a: Vec2,
        anchor_b: Vec2,
        ratio: f32,
    ) -> Result<Self> {
        let reason = "pulley joint anchors must be finite";
        let ground_anchor_a = check_finite_vec(ground_anchor_a, reason)?;
        let ground_anchor_b = check_finite_vec(ground_anchor_b, reason)?;
        let anchor_a = check_finite_vec(anchor_a, reason)?;
        let anchor_b = check_finite_vec(anchor_b, reason)?;
        if !ratio.is_finite() || ratio <= crate::math::consts::EPSILON {
            return Err(PhysicsError::InvalidJoint {
                reason: "pulley ratio must be positive",
            });
        }

        let length_a = anchor_a.distance(ground_anchor_a);
        let length_b = anchor_b.distance(ground_anchor_b);
        Ok(Self {
            ground_anchor_a,
            ground_anchor_b,
            local_anchor_a: body_a.transform().inverse_transform_point(anchor_a),
            local_anchor_b: body_b.transform().inverse_transform_point(anchor_b),
            length_a,
            length_b,
            ratio,
            constant: length_a + ratio * length_b,
            impulse: 0.0,
            u_a: Vec2::ZERO,
            u_b: Vec2::ZERO,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            mass: 0.0,
        })
    }

    #[inline]
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    #[inline]
    pub fn ground_anchors(&self) -> (Vec2, Vec2) {
        (self.ground_anchor_a, self.ground_anchor_b)
    }

    /// Rope lengths at construction
    #[inline]
    pub fn lengths(&self) -> (f32, f32) {
        (self.length_a, self.length_b)
    }

    /// Length of rope on each side for the given body positions
    fn segments(&self, a: &SolverBody, b: &SolverBody, data: &SolverData) -> (Vec2, Vec2, Vec2, Vec2, f32, f32) {
        let pa = data.positions[a.index];
        let pb = data.positions[b.index];
        let r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        let r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);

        let min_length = MIN_SEGMENT_TOLERANCES * data.settings.linear_tolerance();
        let (u_a, length_a) = (pa.c + r_a - self.ground_anchor_a).normalize_with_length();
        let (u_b, length_b) = (pb.c + r_b - self.ground_anchor_b).normalize_with_length();
        let u_a = if length_a > min_length { u_a } else { Vec2::ZERO };
        let u_b = if length_b > min_length { u_b } else { Vec2::ZERO };
        (r_a, r_b, u_a, u_b, length_a, length_b)
    }

    fn effective_mass(&self, a: &SolverBody, b: &SolverBody, r_a: Vec2, r_b: Vec2, u_a: Vec2, u_b: Vec2) -> f32 {
        let ru_a = r_a.cross(u_a);
        let ru_b = r_b.cross(u_b);
        let m_a = a.inv_mass + a.inv_inertia * ru_a * ru_a;
        let m_b = b.inv_mass + b.inv_inertia * ru_b * ru_b;
        inverse_or_zero(m_a + self.ratio * self.ratio * m_b)
    }
}

impl JointConstraint for PulleyJoint {
    fn init_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (r_a, r_b, u_a, u_b, _, _) = self.segments(a, b, data);
        self.r_a = r_a;
        self.r_b = r_b;
        self.u_a = u_a;
        self.u_b = u_b;
        self.mass = self.effective_mass(a, b, r_a, r_b, u_a, u_b);

        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];
        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            let p_a = u_a * -self.impulse;
            let p_b = u_b * (-self.ratio * self.impulse);
            va.v += p_a * a.inv_mass;
            va.w += a.inv_inertia * r_a.cross(p_a);
            vb.v += p_b * b.inv_mass;
            vb.w += b.inv_inertia * r_b.cross(p_b);
        } else {
            self.impulse = 0.0;
        }
        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        let vp_a = va.v + Vec2::scalar_cross(va.w, self.r_a);
        let vp_b = vb.v + Vec2::scalar_cross(vb.w, self.r_b);
        let cdot = -self.u_a.dot(vp_a) - self.ratio * self.u_b.dot(vp_b);
        let impulse = -self.mass * cdot;
        self.impulse += impulse;

        let p_a = self.u_a * -impulse;
        let p_b = self.u_b * (-self.ratio * impulse);
        va.v += p_a * a.inv_mass;
        va.w += a.inv_inertia * self.r_a.cross(p_a);
        vb.v += p_b * b.inv_mass;
        vb.w += b.inv_inertia * self.r_b.cross(p_b);

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_position_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) -> bool {
        let (r_a, r_b, u_a, u_b, length_a, length_b) = self.segments(a, b, data);
        let mass = self.effective_mass(a, b, r_a, r_b, u_a, u_b);

        let c = self.constant - length_a - self.ratio * length_b;
        let impulse = -mass * c;

        let mut pa = data.positions[a.index];
        let mut pb = data.positions[b.index];
        let p_a = u_a * -impulse;
        let p_b = u_b * (-self.ratio * impulse);
        pa.c += p_a * a.inv_mass;
        pa.a += a.inv_inertia * r_a.cross(p_a);
        pb.c += p_b * b.inv_mass;
        pb.a += b.inv_inertia * r_b.cross(p_b);

        data.positions[a.index] = pa;
        data.positions[b.index] = pb;
        c.abs() < data.settings.linear_tolerance()
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.u_b * (self.impulse * inv_dt)
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
    fn test_rope_length_is_conserved() {
        let a = BodyDesc::dynamic().with_position(Vec2::new(-1.0, 0.0)).build();
        let b = BodyDesc::dynamic().with_position(Vec2::new(1.0, 0.0)).build();
        let mut joint = PulleyJoint::new(
            &a,
            &b,
            Vec2::new(-1.0, 2.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(-1.0, 0.0),
            Vec2::new(1.0, 0.0),
            1.0,
        )
        .expect("pulley");

        let mut positions = [
            Position { c: Vec2::new(-1.0, 0.0), a: 0.0 },
            Position { c: Vec2::new(1.0, 0.0), a: 0.0 },
        ];
        // pull A down; B must rise by the same amount
        let mut velocities = [Velocity { v: Vec2::new(0.0, -1.0), w: 0.0 }, Velocity::default()];
        simulate(&mut joint, [dynamic(0), dynamic(1)], &mut positions, &mut velocities, 30);

        let total = (2.0 - positions[0].c.y) + (2.0 - positions[1].c.y);
        assert!((total - 4.0).abs() < 0.01, "rope length {}", total);
        assert!(positions[1].c.y > 0.1);
    }

    #[test]
    fn test_ratio_must_be_positive() {
        let a = BodyDesc::dynamic().build();
        let b = BodyDesc::dynamic().build();
        let result = PulleyJoint::new(&a, &b, Vec2::Y, Vec2::Y, Vec2::ZERO, Vec2::ZERO, 0.0);
        assert!(result.is_err());
    }
}
