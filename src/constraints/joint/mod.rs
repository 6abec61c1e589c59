//! Joints between bodies.
//!
//! Every joint variant implements [`JointConstraint`]: it is initialized once
//! per step, warm started from its accumulated impulses, then iterated with the
//! contact constraints. Anchors are stored in body-local coordinates so a joint
//! keeps working when its bodies are moved.

mod angle;
mod distance;
mod friction;
mod mouse;
mod prismatic;
mod pulley;
mod revolute;
mod rope;
mod weld;
mod wheel;

pub use angle::AngleJoint;
pub use distance::DistanceJoint;
pub use friction::FrictionJoint;
pub use mouse::MouseJoint;
pub use prismatic::PrismaticJoint;
pub use pulley::PulleyJoint;
pub use revolute::RevoluteJoint;
pub use rope::RopeJoint;
pub use weld::WeldJoint;
pub use wheel::WheelJoint;

use crate::collision::BodyHandle;
use crate::error::{PhysicsError, Result};
use crate::math::consts::TAU;
use crate::math::{Rotation, Vec2};
use crate::solver::{SolverBody, SolverData};

/// Lifecycle shared by every joint type.
///
/// `a` and `b` describe the two bodies in the solver arrays. Single-body joints
/// receive [`SolverBody::GROUND`] as `b` and must not index with it.
pub trait JointConstraint {
    /// Computes effective masses and applies the warm-start impulses
    fn init_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData);

    /// One velocity iteration
    fn solve_velocity_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData);

    /// One position iteration; true once the joint error is within tolerance
    fn solve_position_constraints(&mut self, a: &SolverBody, b: &SolverBody, data: &mut SolverData) -> bool;

    /// Force applied to body B at its anchor during the last step
    fn reaction_force(&self, inv_dt: f32) -> Vec2;

    /// Torque applied to body B during the last step
    fn reaction_torque(&self, inv_dt: f32) -> f32;
}

/// The type-specific part of a joint
#[derive(Debug, Clone)]
pub enum JointKind {
    Distance(DistanceJoint),
    Revolute(RevoluteJoint),
    Prismatic(PrismaticJoint),
    Weld(WeldJoint),
    Rope(RopeJoint),
    Wheel(WheelJoint),
    Pulley(PulleyJoint),
    Angle(AngleJoint),
    Friction(FrictionJoint),
    Mouse(MouseJoint),
}

impl JointKind {
    pub fn constraint(&self) -> &dyn JointConstraint {
        match self {
            JointKind::Distance(j) => j,
            JointKind::Revolute(j) => j,
            JointKind::Prismatic(j) => j,
            JointKind::Weld(j) => j,
            JointKind::Rope(j) => j,
            JointKind::Wheel(j) => j,
            JointKind::Pulley(j) => j,
            JointKind::Angle(j) => j,
            JointKind::Friction(j) => j,
            JointKind::Mouse(j) => j,
        }
    }

    pub fn constraint_mut(&mut self) -> &mut dyn JointConstraint {
        match self {
            JointKind::Distance(j) => j,
            JointKind::Revolute(j) => j,
            JointKind::Prismatic(j) => j,
            JointKind::Weld(j) => j,
            JointKind::Rope(j) => j,
            JointKind::Wheel(j) => j,
            JointKind::Pulley(j) => j,
            JointKind::Angle(j) => j,
            JointKind::Friction(j) => j,
            JointKind::Mouse(j) => j,
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            JointKind::Distance(_) => "distance",
            JointKind::Revolute(_) => "revolute",
            JointKind::Prismatic(_) => "prismatic",
            JointKind::Weld(_) => "weld",
            JointKind::Rope(_) => "rope",
            JointKind::Wheel(_) => "wheel",
            JointKind::Pulley(_) => "pulley",
            JointKind::Angle(_) => "angle",
            JointKind::Friction(_) => "friction",
            JointKind::Mouse(_) => "mouse",
        }
    }
}

macro_rules! impl_from_joint {
    ($($joint:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$joint> for JointKind {
                fn from(joint: $joint) -> Self {
                    JointKind::$variant(joint)
                }
            }
        )*
    };
}

impl_from_joint! {
    DistanceJoint => Distance,
    RevoluteJoint => Revolute,
    PrismaticJoint => Prismatic,
    WeldJoint => Weld,
    RopeJoint => Rope,
    WheelJoint => Wheel,
    PulleyJoint => Pulley,
    AngleJoint => Angle,
    FrictionJoint => Friction,
    MouseJoint => Mouse,
}

/// A joint owned by the world.
///
/// # Example
///
/// ```rust
/// use rustphy2d::prelude::*;
///
/// let mut world = World::new();
/// let a = world.add_body(BodyDesc::fixed().build());
/// let b = world.add_body(BodyDesc::dynamic().with_position(Vec2::new(0.0, -2.0)).build());
///
/// let revolute = RevoluteJoint::new(
///     world.body(a).unwrap(),
///     world.body(b).unwrap(),
///     Vec2::ZERO,
/// ).unwrap();
/// let handle = world.add_joint(Joint::new(a, b, revolute)).unwrap();
/// assert_eq!(world.joint_count(), 1);
/// # let _ = handle;
/// ```
#[derive(Debug, Clone)]
pub struct Joint {
    body_a: BodyHandle,
    body_b: Option<BodyHandle>,
    /// Whether the joined bodies still collide with each other
    pub collide_connected: bool,
    /// Optional user data
    pub user_data: u64,
    kind: JointKind,
}

impl Joint {
    /// Joins two bodies
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, kind: impl Into<JointKind>) -> Self {
        Self {
            body_a,
            body_b: Some(body_b),
            collide_connected: false,
            user_data: 0,
            kind: kind.into(),
        }
    }

    /// Attaches a mouse joint to a single body
    pub fn mouse(body: BodyHandle, joint: MouseJoint) -> Self {
        Self {
            body_a: body,
            body_b: None,
            collide_connected: false,
            user_data: 0,
            kind: JointKind::Mouse(joint),
        }
    }

    pub fn with_collide_connected(mut self, collide: bool) -> Self {
        self.collide_connected = collide;
        self
    }

    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }

    #[inline]
    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    /// Second body, `None` for single-body joints
    #[inline]
    pub fn body_b(&self) -> Option<BodyHandle> {
        self.body_b
    }

    /// True if the joint attaches to `body`
    pub fn involves(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == Some(body)
    }

    /// True if this joint connects exactly the two given bodies, in any order
    pub fn connects(&self, a: BodyHandle, b: BodyHandle) -> bool {
        match self.body_b {
            Some(body_b) => (self.body_a == a && body_b == b) || (self.body_a == b && body_b == a),
            None => false,
        }
    }

    #[inline]
    pub fn kind(&self) -> &JointKind {
        &self.kind
    }

    #[inline]
    pub fn kind_mut(&mut self) -> &mut JointKind {
        &mut self.kind
    }

    /// Force applied to body B during the last step
    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.kind.constraint().reaction_force(inv_dt)
    }

    /// Torque applied to body B during the last step
    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.kind.constraint().reaction_torque(inv_dt)
    }
}

/// Offset from the center of mass to an anchor, in world orientation
#[inline]
pub(crate) fn anchor_arm(angle: f32, local_anchor: Vec2, local_center: Vec2) -> Vec2 {
    Rotation::from_angle(angle).rotate(local_anchor - local_center)
}

#[inline]
pub(crate) fn inverse_or_zero(k: f32) -> f32 {
    if k != 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

/// Soft constraint coefficients for a spring of the given frequency (Hz) and
/// damping ratio acting on `mass`. Returns `(gamma, beta)` where gamma is the
/// inverse softness and beta scales the position error into a bias velocity.
pub(crate) fn spring_coefficients(mass: f32, frequency: f32, damping_ratio: f32, dt: f32) -> (f32, f32) {
    let omega = TAU * frequency;
    let d = 2.0 * mass * damping_ratio * omega;
    let k = mass * omega * omega;
    let gamma = inverse_or_zero(dt * (d + dt * k));
    (gamma, dt * k * gamma)
}

pub(crate) fn check_finite_vec(value: Vec2, reason: &'static str) -> Result<Vec2> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidJoint { reason })
    }
}

pub(crate) fn check_non_negative(value: f32, reason: &'static str) -> Result<f32> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidJoint { reason })
    }
}

/// Validates a spring: frequency zero (rigid) or positive, damping non-negative
pub(crate) fn check_spring(frequency: f32, damping_ratio: f32) -> Result<(f32, f32)> {
    let frequency = check_non_negative(frequency, "spring frequency must be a non-negative finite number")?;
    let damping_ratio = check_non_negative(damping_ratio, "damping ratio must be a non-negative finite number")?;
    Ok((frequency, damping_ratio))
}

/// Validates a limit pair
pub(crate) fn check_limits(lower: f32, upper: f32) -> Result<(f32, f32)> {
    if lower.is_finite() && upper.is_finite() && lower <= upper {
        Ok((lower, upper))
    } else {
        Err(PhysicsError::InvalidJoint {
            reason: "lower limit must not exceed the upper limit",
        })
    }
}
