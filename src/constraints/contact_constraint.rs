use crate::collision::Contact;
use crate::math::{Mat2, Vec2};
use crate::solver::{SolverBody, SolverData};

/// Block solves are skipped when the 2x2 effective mass is this badly
/// conditioned.
const MAX_CONDITION_NUMBER: f32 = 1000.0;

/// Fraction of the linear tolerance left as resting penetration
const RESTING_SLOP: f32 = 0.25;

/// Per-point solver state
#[derive(Debug, Clone, Copy, Default)]
struct ConstraintPoint {
    /// Anchor relative to the center of mass of body A
    r_a: Vec2,
    /// Anchor relative to the center of mass of body B
    r_b: Vec2,
    local_point_a: Vec2,
    local_point_b: Vec2,
    /// Penetration depth when the contact was detected
    depth: f32,
    normal_impulse: f32,
    tangent_impulse: f32,
    normal_mass: f32,
    tangent_mass: f32,
    /// Restitution target for the normal velocity
    velocity_bias: f32,
}

/// Normal and friction rows for one contact.
///
/// The normal points from body A to body B. A positive normal impulse pushes
/// B along the normal and A against it.
#[derive(Debug, Clone)]
pub struct ContactConstraint {
    /// Index of the contact this constraint was built from
    pub contact_index: usize,
    body_a: SolverBody,
    body_b: SolverBody,
    normal: Vec2,
    tangent: Vec2,
    friction: f32,
    restitution: f32,
    points: [ConstraintPoint; 2],
    point_count: usize,
    /// Two-point effective mass and its inverse
    k: Mat2,
    normal_mass: Mat2,
    block_solve: bool,
}

impl ContactConstraint {
    /// Builds the rows from a contact and the current solver state.
    ///
    /// Accumulated impulses are taken from the contact (scaled by the step
    /// ratio) when warm starting is on, and start at zero otherwise.
    pub fn new(
        contact_index: usize,
        contact: &Contact,
        body_a: SolverBody,
        body_b: SolverBody,
        data: &SolverData,
    ) -> Self {
        let normal = contact.normal;
        let tangent = normal.right();
        let (ma, mb) = (body_a.inv_mass, body_b.inv_mass);
        let (ia, ib) = (body_a.inv_inertia, body_b.inv_inertia);

        let ca = data.positions[body_a.index].c;
        let cb = data.positions[body_b.index].c;
        let va = data.velocities[body_a.index];
        let vb = data.velocities[body_b.index];
        let restitution_velocity = data.settings.restitution_velocity();

        let mut points = [ConstraintPoint::default(); 2];
        let point_count = contact.points.len().min(2);
        for (cp, point) in points.iter_mut().zip(contact.points.iter()) {
            let r_a = point.point - ca;
            let r_b = point.point - cb;

            let rn_a = r_a.cross(normal);
            let rn_b = r_b.cross(normal);
            let k_normal = ma + mb + ia * rn_a * rn_a + ib * rn_b * rn_b;

            let rt_a = r_a.cross(tangent);
            let rt_b = r_b.cross(tangent);
            let k_tangent = ma + mb + ia * rt_a * rt_a + ib * rt_b * rt_b;

            let dv = vb.v + Vec2::scalar_cross(vb.w, r_b) - va.v - Vec2::scalar_cross(va.w, r_a);
            let v_rel = normal.dot(dv);
            let velocity_bias = if v_rel < -restitution_velocity {
                -contact.restitution * v_rel
            } else {
                0.0
            };

            let (normal_impulse, tangent_impulse) = if data.step.warm_starting {
                (
                    data.step.dt_ratio * point.normal_impulse,
                    data.step.dt_ratio * point.tangent_impulse,
                )
            } else {
                (0.0, 0.0)
            };

            *cp = ConstraintPoint {
                r_a,
                r_b,
                local_point_a: point.local_point_a,
                local_point_b: point.local_point_b,
                depth: point.depth,
                normal_impulse,
                tangent_impulse,
                normal_mass: inverse_or_zero(k_normal),
                tangent_mass: inverse_or_zero(k_tangent),
                velocity_bias,
            };
        }

        let mut constraint = Self {
            contact_index,
            body_a,
            body_b,
            normal,
            tangent,
            friction: contact.friction,
            restitution: contact.restitution,
            points,
            point_count,
            k: Mat2::ZERO,
            normal_mass: Mat2::ZERO,
            block_solve: false,
        };

        if point_count == 2 {
            let [p1, p2] = constraint.points;
            let rn1_a = p1.r_a.cross(normal);
            let rn1_b = p1.r_b.cross(normal);
            let rn2_a = p2.r_a.cross(normal);
            let rn2_b = p2.r_b.cross(normal);

            let k11 = ma + mb + ia * rn1_a * rn1_a + ib * rn1_b * rn1_b;
            let k22 = ma + mb + ia * rn2_a * rn2_a + ib * rn2_b * rn2_b;
            let k12 = ma + mb + ia * rn1_a * rn2_a + ib * rn1_b * rn2_b;

            if k11 * k11 < MAX_CONDITION_NUMBER * (k11 * k22 - k12 * k12) {
                constraint.k = Mat2::new(k11, k12, k12, k22);
                constraint.normal_mass = constraint.k.inverse();
                constraint.block_solve = true;
            }
        }
        constraint
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    #[inline]
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Applies the accumulated impulses from the previous step
    pub fn warm_start(&self, data: &mut SolverData) {
        let (ia, ib) = (self.body_a.index, self.body_b.index);
        let mut va = data.velocities[ia];
        let mut vb = data.velocities[ib];

        for cp in &self.points[..self.point_count] {
            let p = self.normal * cp.normal_impulse + self.tangent * cp.tangent_impulse;
            va.v -= p * self.body_a.inv_mass;
            va.w -= self.body_a.inv_inertia * cp.r_a.cross(p);
            vb.v += p * self.body_b.inv_mass;
            vb.w += self.body_b.inv_inertia * cp.r_b.cross(p);
        }

        data.velocities[ia] = va;
        data.velocities[ib] = vb;
    }

    /// One velocity iteration: friction rows first, then the normal rows
    pub fn solve_velocity(&mut self, data: &mut SolverData) {
        let (ia, ib) = (self.body_a.index, self.body_b.index);
        let (ma, mb) = (self.body_a.inv_mass, self.body_b.inv_mass);
        let (ii_a, ii_b) = (self.body_a.inv_inertia, self.body_b.inv_inertia);
        let mut va = data.velocities[ia];
        let mut vb = data.velocities[ib];

        let normal = self.normal;
        let tangent = self.tangent;
        let friction = self.friction;

        for cp in &mut self.points[..self.point_count] {
            let dv = relative_velocity(va.v, va.w, vb.v, vb.w, cp.r_a, cp.r_b);
            let vt = dv.dot(tangent);
            let lambda = -cp.tangent_mass * vt;

            // Coulomb cone
            let max_friction = friction * cp.normal_impulse;
            let new_impulse = (cp.tangent_impulse + lambda).clamp(-max_friction, max_friction);
            let lambda = new_impulse - cp.tangent_impulse;
            cp.tangent_impulse = new_impulse;

            let p = tangent * lambda;
            va.v -= p * ma;
            va.w -= ii_a * cp.r_a.cross(p);
            vb.v += p * mb;
            vb.w += ii_b * cp.r_b.cross(p);
        }

        if self.block_solve {
            self.solve_normal_block(&mut va, &mut vb);
        } else {
            for cp in &mut self.points[..self.point_count] {
                let dv = relative_velocity(va.v, va.w, vb.v, vb.w, cp.r_a, cp.r_b);
                let vn = dv.dot(normal);
                let lambda = -cp.normal_mass * (vn - cp.velocity_bias);

                let new_impulse = (cp.normal_impulse + lambda).max(0.0);
                let lambda = new_impulse - cp.normal_impulse;
                cp.normal_impulse = new_impulse;

                let p = normal * lambda;
                va.v -= p * ma;
                va.w -= ii_a * cp.r_a.cross(p);
                vb.v += p * mb;
                vb.w += ii_b * cp.r_b.cross(p);
            }
        }

        data.velocities[ia] = va;
        data.velocities[ib] = vb;
    }

    /// Solves both normal rows together as a linear complementarity problem,
    /// trying each combination of active rows in turn
    fn solve_normal_block(&mut self, va: &mut crate::solver::Velocity, vb: &mut crate::solver::Velocity) {
        let (ma, mb) = (self.body_a.inv_mass, self.body_b.inv_mass);
        let (ii_a, ii_b) = (self.body_a.inv_inertia, self.body_b.inv_inertia);
        let normal = self.normal;
        let [mut cp1, mut cp2] = self.points;

        let a = Vec2::new(cp1.normal_impulse, cp2.normal_impulse);

        let dv1 = relative_velocity(va.v, va.w, vb.v, vb.w, cp1.r_a, cp1.r_b);
        let dv2 = relative_velocity(va.v, va.w, vb.v, vb.w, cp2.r_a, cp2.r_b);
        let vn1 = dv1.dot(normal);
        let vn2 = dv2.dot(normal);

        let b = Vec2::new(vn1 - cp1.velocity_bias, vn2 - cp2.velocity_bias) - self.k.mul_vec(a);

        let candidates = [
            // both rows active
            {
                let x = -self.normal_mass.mul_vec(b);
                (x, x.x >= 0.0 && x.y >= 0.0)
            },
            // only the first row active
            {
                let x1 = -cp1.normal_mass * b.x;
                let vn2 = self.k.ex.y * x1 + b.y;
                (Vec2::new(x1, 0.0), x1 >= 0.0 && vn2 >= 0.0)
            },
            // only the second row active
            {
                let x2 = -cp2.normal_mass * b.y;
                let vn1 = self.k.ey.x * x2 + b.x;
                (Vec2::new(0.0, x2), x2 >= 0.0 && vn1 >= 0.0)
            },
            // neither
            (Vec2::ZERO, b.x >= 0.0 && b.y >= 0.0),
        ];

        // no combination fits: leave the impulses alone this iteration
        let Some(&(x, _)) = candidates.iter().find(|(_, ok)| *ok) else {
            return;
        };

        let d = x - a;
        let p1 = normal * d.x;
        let p2 = normal * d.y;
        va.v -= (p1 + p2) * ma;
        va.w -= ii_a * (cp1.r_a.cross(p1) + cp2.r_a.cross(p2));
        vb.v += (p1 + p2) * mb;
        vb.w += ii_b * (cp1.r_b.cross(p1) + cp2.r_b.cross(p2));

        cp1.normal_impulse = x.x;
        cp2.normal_impulse = x.y;
        self.points = [cp1, cp2];
    }

    /// One position iteration. Returns true once the deepest point is within
    /// the linear tolerance.
    pub fn solve_position(&self, data: &mut SolverData) -> bool {
        let (ia, ib) = (self.body_a.index, self.body_b.index);
        let (ma, mb) = (self.body_a.inv_mass, self.body_b.inv_mass);
        let (ii_a, ii_b) = (self.body_a.inv_inertia, self.body_b.inv_inertia);
        let linear_tolerance = data.settings.linear_tolerance();
        let max_correction = data.settings.maximum_linear_correction();
        let baumgarte = data.settings.baumgarte();
        let slop = RESTING_SLOP * linear_tolerance;

        let mut pa = data.positions[ia];
        let mut pb = data.positions[ib];
        let mut min_separation = 0.0f32;

        for cp in &self.points[..self.point_count] {
            let ta = pa.transform(self.body_a.local_center);
            let tb = pb.transform(self.body_b.local_center);
            let point_a = ta.transform_point(cp.local_point_a);
            let point_b = tb.transform_point(cp.local_point_b);

            let separation = (point_b - point_a).dot(self.normal) - cp.depth;
            min_separation = min_separation.min(separation);

            let point = (point_a + point_b) * 0.5;
            let r_a = point - pa.c;
            let r_b = point - pb.c;

            let c = (baumgarte * (separation + slop)).clamp(-max_correction, 0.0);
            let rn_a = r_a.cross(self.normal);
            let rn_b = r_b.cross(self.normal);
            let k = ma + mb + ii_a * rn_a * rn_a + ii_b * rn_b * rn_b;
            let impulse = if k > 0.0 { -c / k } else { 0.0 };

            let p = self.normal * impulse;
            pa.c -= p * ma;
            pa.a -= ii_a * r_a.cross(p);
            pb.c += p * mb;
            pb.a += ii_b * r_b.cross(p);
        }

        data.positions[ia] = pa;
        data.positions[ib] = pb;
        min_separation >= -linear_tolerance
    }

    /// Writes the accumulated impulses back for the next step's warm start
    pub fn store_impulses(&self, contact: &mut Contact) {
        for (point, cp) in contact.points.iter_mut().zip(&self.points[..self.point_count]) {
            point.normal_impulse = cp.normal_impulse;
            point.tangent_impulse = cp.tangent_impulse;
        }
    }
}

#[inline]
fn inverse_or_zero(k: f32) -> f32 {
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

/// Velocity of B's anchor relative to A's anchor
#[inline]
fn relative_velocity(va: Vec2, wa: f32, vb: Vec2, wb: f32, r_a: Vec2, r_b: Vec2) -> Vec2 {
    vb + Vec2::scalar_cross(wb, r_b) - va - Vec2::scalar_cross(wa, r_a)
}
