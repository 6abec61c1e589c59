//! Sequential impulse solver state.
//!
//! The world copies the moving state of every body into flat `Position` and
//! `Velocity` arrays before solving. Constraints address bodies by their index
//! into those arrays, never by reference.

mod pgs;

pub use pgs::ContactSolver;

use crate::math::{Rotation, Transform, Vec2};
use crate::settings::Settings;

/// Center-of-mass position and angle of a body during a solve
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// World center of mass
    pub c: Vec2,
    /// Angle in radians
    pub a: f32,
}

impl Position {
    /// Body transform for a body whose center of mass sits at `local_center`
    #[inline]
    pub fn transform(&self, local_center: Vec2) -> Transform {
        let rotation = Rotation::from_angle(self.a);
        Transform::new(self.c - rotation.rotate(local_center), rotation)
    }
}

/// Linear and angular velocity of a body during a solve
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub v: Vec2,
    pub w: f32,
}

/// Timing of the current step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStep {
    /// Step duration in seconds
    pub dt: f32,
    /// Inverse step duration, zero when `dt` is zero
    pub inv_dt: f32,
    /// `dt / previous dt`, used to scale warm-start impulses
    pub dt_ratio: f32,
    pub warm_starting: bool,
}

impl TimeStep {
    pub fn new(dt: f32, previous_dt: f32, warm_starting: bool) -> Self {
        Self {
            dt,
            inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            dt_ratio: if previous_dt > 0.0 { dt / previous_dt } else { 1.0 },
            warm_starting,
        }
    }
}

/// Mass data of one body as seen by constraints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverBody {
    /// Index into the position and velocity arrays
    pub index: usize,
    pub inv_mass: f32,
    pub inv_inertia: f32,
    /// Center of mass in body coordinates
    pub local_center: Vec2,
}

impl SolverBody {
    /// Stand-in for the missing second body of single-body joints. Its index
    /// is never dereferenced.
    pub const GROUND: Self = Self {
        index: usize::MAX,
        inv_mass: 0.0,
        inv_inertia: 0.0,
        local_center: Vec2::ZERO,
    };

    /// True if impulses cannot move this body
    #[inline]
    pub fn is_immovable(&self) -> bool {
        self.inv_mass == 0.0 && self.inv_inertia == 0.0
    }
}

/// Everything a constraint needs during one solver pass
pub struct SolverData<'a> {
    pub step: TimeStep,
    pub positions: &'a mut [Position],
    pub velocities: &'a mut [Velocity],
    pub settings: &'a Settings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_step_ratio() {
        let step = TimeStep::new(0.01, 0.02, true);
        assert!((step.inv_dt - 100.0).abs() < 1e-3);
        assert!((step.dt_ratio - 0.5).abs() < 1e-6);

        let first = TimeStep::new(0.01, 0.0, true);
        assert_eq!(first.dt_ratio, 1.0);
    }

    #[test]
    fn test_position_transform() {
        let position = Position {
            c: Vec2::new(1.0, 1.0),
            a: std::f32::consts::FRAC_PI_2,
        };
        let t = position.transform(Vec2::new(1.0, 0.0));
        // the local center maps back onto c
        assert!(t.transform_point(Vec2::new(1.0, 0.0)).distance(position.c) < 1e-5);
        assert!(t.position.distance(Vec2::new(1.0, 0.0)) < 1e-5);
    }
}
