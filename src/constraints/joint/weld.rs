use crate::dynamics::Body;
use crate::error::Result;
use crate::math::{Mat3, Vec2, Vec3};
use crate::solver::{SolverBody, SolverData};

use super::{anchor_arm, check_finite_vec, check_spring, inverse_or_zero, spring_coefficients, JointConstraint};

/// Glues two bodies together. The angular part can be made soft with a
/// spring.
#[derive(Debug, Clone)]
pub struct WeldJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    reference_angle: f32,
    frequency: f32,
    damping_ratio: f32,

    impulse: Vec3,
    gamma: f32,
    bias: f32,

    r_a: Vec2,
    r_b: Vec2,
    mass: Mat3,
}

impl WeldJoint {
    /// Welds both bodies at `anchor` (world coordinates), keeping their
    /// current relative angle
    pub fn new(body_a: &Body, body_b: &Body, anchor: Vec2) -> Result<Self> {
        let anchor = check_finite_vec(anchor, "weld joint anchor must be finite")?;
        Ok(Self {
            local_anchor_a: body_a.transform().inverse_transform_point(anchor),
            local_anchor_b: body_b.transform().inverse_transform_point(anchor),
            reference_angle: body_b.angle() - body_a.angle(),
            frequency: 0.0,
            damping_ratio: 0.0,
            impulse: Vec3::ZERO,
            gamma: 0.0,
            bias: 0.0,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            mass: Mat3::ZERO,
        })
    }

    /// Softens the angular constraint. A frequency of zero keeps it rigid.
    pub fn with_spring(mut self, frequency: f32, damping_ratio: f32) -> Result<Self> {
        (self.frequency, self.damping_ratio) = check_spring(frequency, damping_ratio)?;
        Ok(self)
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    #[inline]
    pub fn reference_angle(&self) -> f32 {
        self.reference_angle
    }
}

fn weld_mass(ma: f32, mb: f32, ii_a: f32, ii_b: f32, r_a: Vec2, r_b: Vec2) -> Mat3 {
    let ex = Vec3::new(
        ma + mb + r_a.y * r_a.y * ii_a + r_b.y * r_b.y * ii_b,
        -r_a.y * r_a.x * ii_a - r_b.y * r_b.x * ii_b,
        -r_a.y * ii_a - r_b.y * ii_b,
    );
    let ey = Vec3::new(
        ex.y,
        ma + mb + r_a.x * r_a.x * ii_a + r_b.x * r_b.x * ii_b,
        r_a.x * ii_a + r_b.x * ii_b,
    );
    let ez = Vec3::new(ex.z, ey.z, ii_a + ii_b);
    Mat3::from_cols(ex, ey, ez)
}

impl JointConstraint for WeldJoint {
    fn init_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let pa = data.positions[a.index];
        let pb = data.positions[b.index];
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        self.r_a = anchor_arm(pa.a, self.local_anchor_a, a.local_center);
        self.r_b = anchor_arm(pb.a, self.local_anchor_b, b.local_center);
        let k = weld_mass(ma, mb, ii_a, ii_b, self.r_a, self.r_b);

        if self.frequency > 0.0 {
            self.mass = k.inverse22();

            let inv_m = ii_a + ii_b;
            let m = inverse_or_zero(inv_m);
            let c = pb.a - pa.a - self.reference_angle;
            let (gamma, beta) = spring_coefficients(m, self.frequency, self.damping_ratio, data.step.dt);
            self.gamma = gamma;
            self.bias = c * beta;
            self.mass.ez.z = inverse_or_zero(inv_m + gamma);
        } else {
            self.mass = if k.ez.z == 0.0 {
                k.inverse22()
            } else {
                k.symmetric_inverse33()
            };
            self.gamma = 0.0;
            self.bias = 0.0;
        }

        if data.step.warm_starting {
            self.impulse = self.impulse * data.step.dt_ratio;
            let p = Vec2::new(self.impulse.x, self.impulse.y);
            va.v -= p * ma;
            va.w -= ii_a * (self.r_a.cross(p) + self.impulse.z);
            vb.v += p * mb;
            vb.w += ii_b * (self.r_b.cross(p) + self.impulse.z);
        } else {
            self.impulse = Vec3::ZERO;
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn solve_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) {
        let (ma, mb, ii_a, ii_b) = (a.inv_mass, b.inv_mass, a.inv_inertia, b.inv_inertia);
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        if self.frequency > 0.0 {
            let cdot2 = vb.w - va.w;
            let impulse2 = -self.mass.ez.z * (cdot2 + self.bias + self.gamma * self.impulse.z);
            self.impulse.z += impulse2;
            va.w -= ii_a * impulse2;
            vb.w += ii_b * impulse2;

            let cdot1 = vb.v + Vec2::scalar_cross(vb.w, self.r_b) - va.v - Vec2::scalar_cross(va.w, self.r_a);
            let impulse1 = -self.mass.mul_vec2(cdot1);
            self.impulse.x += impulse1.x;
            self.impulse.y += impulse1.y;

            va.v -= impulse1 * ma;
            va.w -= ii_a * self.r_a.cross(impulse1);
            vb.v += impulse1 * mb;
            vb.w += ii_b * self.r_b.cross(impulse1);
        } else {
            let cdot1 = vb.v + Vec2::scalar_cross(vb.w, self.r_b) - va.v - Vec2::scalar_cross(va.w, self.r_a);
            let cdot2 = vb.w - va.w;
            let impulse = -self.mass.mul_vec(Vec3::new(cdot1.x, cdot1.y, cdot2));
            self.impulse = self.impulse + impulse;

            let p = Vec2::new(impulse.x, impulse.y);
            va.v -= p * ma;
            va.w -= ii_a * (self.r_a.cross(p) + impulse.z);
            vb.v += p * mb;
            vb.w += ii_b * (self.r_b.cross(p) + impulse.z);
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
        let k = weld_mass(ma, mb, ii_a, ii_b, r_a, r_b);

        let c1 = pb.c + r_b - pa.c - r_a;
        let position_error = c1.length();
        let mut angular_error = 0.0;

        if self.frequency > 0.0 {
            let p = -k.solve22(c1);
            pa.c -= p * ma;
            pa.a -= ii_a * r_a.cross(p);
            pb.c += p * mb;
            pb.a += ii_b * r_b.cross(p);
        } else {
            let c2 = pb.a - pa.a - self.reference_angle;
            angular_error = c2.abs();

            let impulse = if k.ez.z > 0.0 {
                -k.solve33(Vec3::new(c1.x, c1.y, c2))
            } else {
                let impulse2 = -k.solve22(c1);
                Vec3::new(impulse2.x, impulse2.y, 0.0)
            };

            let p = Vec2::new(impulse.x, impulse.y);
            pa.c -= p * ma;
            pa.a -= ii_a * (r_a.cross(p) + impulse.z);
            pb.c += p * mb;
            pb.a += ii_b * (r_b.cross(p) + impulse.z);
        }

        data.positions[a.index] = pa;
        data.positions[b.index] = pb;
        position_error <= data.settings.linear_tolerance() && angular_error <= data.settings.angular_tolerance()
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        Vec2::new(self.impulse.x, self.impulse.y) * inv_dt
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.impulse.z * inv_dt
    }
}
