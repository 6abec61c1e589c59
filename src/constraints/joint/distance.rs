use crate::dynamics::Body;
use crate::error::{PhysicsError, Result};
use crate::math::Vec2;
use crate::solver::{SolverBody, SolverData};

use super::{anchor_arm, check_finite_vec, check_spring, inverse_or_zero, spring_coefficients, JointConstraint};

/// Shortest allowed rest length
const MIN_LENGTH: f32 = 1e-4;

/// Keeps two anchor points at a fixed distance, optionally through a spring
#[derive(Debug, Clone)]
pub struct DistanceJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    length: f32,
    frequency: f32,
    damping_ratio: f32,

    impulse: f32,
    gamma: f32,
    bias: f32,

    u: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    mass: f32,
}

impl DistanceJoint {
    /// Joins `anchor_a` on body A to `anchor_b` on body B (world coordinates).
    /// The rest length is the current distance between the anchors.
    pub fn new(body_a: &Body, body_b: &Body, anchor_a: Vec2, anchor_b: Vec2) -> Result<Self> {
        let anchor_a = check_finite_vec(anchor_a, "distance joint anchor must be finite")?;
        let anchor_b = check_finite_vec(anchor_b, "distance joint anchor must be finite")?;
        let length = anchor_a.distance(anchor_b);
        if length < MIN_LENGTH {
            return Err(PhysicsError::InvalidJoint {
                reason: "distance joint anchors coincide",
            });
        }

        Ok(Self {
            local_anchor_a: body_a.transform().inverse_transform_point(anchor_a),
            local_anchor_b: body_b.transform().inverse_transform_point(anchor_b),
            length,
            frequency: 0.0,
            damping_ratio: 0.0,
            impulse: 0.0,
            gamma: 0.0,
            bias: 0.0,
            u: Vec2::ZERO,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            mass: 0.0,
        })
    }

    /// Overrides the rest length
    pub fn with_length(mut self, length: f32) -> Result<Self> {
        self.set_length(length)?;
        Ok(self)
    }

    /// Makes the joint springy. A frequency of zero keeps it rigid.
    pub fn with_spring(mut self, frequency: f32, damping_ratio: f32) -> Result<Self> {
        (self.frequency, self.damping_ratio) = check_spring(frequency, damping_ratio)?;
        Ok(self)
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn set_length(&mut self, length: f32) -> Result<()> {
        if !length.is_finite() || length < MIN_LENGTH {
            return Err(PhysicsError::InvalidJoint {
                reason: "distance joint length must be positive",
            });
        }
        self.length = length;
        Ok(())
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
    pub fn local_anchor_a(&self) -> Vec2 {
        self.local_anchor_a
    }

    #[inline]
    pub fn local_anchor_b(&self) -> Vec2 {
        self.local_anchor_b
    }
}

impl JointConstraint for DistanceJoint {
    fn init_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let pa = data.positions[a.index];
        let pb = data.positions[b.index];
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        self.r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        self.r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);
        let (u, current_length) = (pb.c + self.r_b - pa.c - self.r_a).normalize_with_length();
        self.u = if current_length > data.settings.linear_tolerance() { u } else { Vec2::ZERO };

        let cr_a = self.r_a.cross(self.u);
        let cr_b = self.r_b.cross(self.u);
        let mut inv_mass = ma + ii_a * cr_a * cr_a + mb + ii_b * cr_b * cr_b;
        self.mass = inverse_or_zero(inv_mass);

        if self.frequency > 0.0 {
            let c = current_length - self.length;
            let (gamma, beta) = spring_coefficients(self.mass, self.frequency, self.damping_ratio, data.step.dt);
            self.gamma = gamma;
            self.bias = c * beta;
            inv_mass += gamma;
            self.mass = inverse_or_zero(inv_mass);
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
        }

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            let p = self.u * self.impulse;
            va.v -= p * ma;
            va.w -= ii_a * self.r_a.cross(p);
            vb.v += p * mb;
            vb.w += ii_b * self.r_b.cross(p);
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
        let cdot = self.u.dot(vp_b - vp_a);

        let impulse = -self.mass * (cdot + self.bias + self.gamma * self.impulse);
        self.impulse += impulse;

        let p = self.u * impulse;
        va.v -= p * a.inv_mass;
        va.w -= a.inv_inertia * self.r_a.cross(p);
        vb.v += p * b.inv_mass;
        vb.w += b.inv_inertia * self.r_b.cross(p);

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_position_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) -> bool {
        // springs are allowed to stretch
        if self.frequency > 0.0 {
            return true;
        }

        let mut pa = data.positions[a.index];
        let mut pb = data.positions[b.index];
        let r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        let r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);
        let (u, length) = (pb.c + r_b - pa.c - r_a).normalize_with_length();

        let max_correction = data.settings.maximum_linear_correction();
        let c = (length - self.length).clamp(-max_correction, max_correction);

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
        self.u * (self.impulse * inv_dt)
    }

    fn reaction_torque(&self, _inv_dt: f32) -> f32 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::joint::test_util::{dynamic, ground, simulate};
    use crate::dynamics::BodyDesc;
    use crate::solver::{Position, Velocity};

    #[test]
    fn test_coincident_anchors_rejected() {
        let a = BodyDesc::fixed().build();
        let b = BodyDesc::dynamic().build();
        assert!(DistanceJoint::new(&a, &b, Vec2::ZERO, Vec2::ZERO).is_err());
        assert!(DistanceJoint::new(&a, &b, Vec2::ZERO, Vec2::new(f32::NAN, 0.0)).is_err());
    }

    #[test]
    fn test_rigid_length_is_kept() {
        let a = BodyDesc::fixed().build();
        let b = BodyDesc::dynamic().with_position(Vec2::new(2.0, 0.0)).build();
        let mut joint = DistanceJoint::new(&a, &b, Vec2::ZERO, Vec2::new(2.0, 0.0)).expect("joint");
        assert!((joint.length() - 2.0).abs() < 1e-6);

        let mut positions = [Position::default(), Position { c: Vec2::new(2.0, 0.0), a: 0.0 }];
        let mut velocities = [Velocity::default(), Velocity { v: Vec2::new(0.0, 5.0), w: 0.0 }];
        simulate(&mut joint, [ground(), dynamic(1)], &mut positions, &mut velocities, 60);

        assert!((positions[1].c.length() - 2.0).abs() < 0.02);
        // the body swings around instead of flying off
        assert!(velocities[1].v.length() > 1.0);
    }

    #[test]
    fn test_spring_pulls_to_rest_length() {
        let a = BodyDesc::fixed().build();
        let b = BodyDesc::dynamic().with_position(Vec2::new(3.0, 0.0)).build();
        let mut joint = DistanceJoint::new(&a, &b, Vec2::ZERO, Vec2::new(3.0, 0.0))
            .and_then(|j| j.with_length(2.0))
            .and_then(|j| j.with_spring(2.0, 1.0))
            .expect("joint");

        let mut positions = [Position::default(), Position { c: Vec2::new(3.0, 0.0), a: 0.0 }];
        let mut velocities = [Velocity::default(); 2];
        simulate(&mut joint, [ground(), dynamic(1)], &mut positions, &mut velocities, 120);

        assert!((positions[1].c.x - 2.0).abs() < 0.05, "x = {}", positions[1].c.x);
    }
}
