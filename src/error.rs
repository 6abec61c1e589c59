//! Error type shared by shape construction, configuration and the world stepper.

use thiserror::Error;

use crate::collision::{BodyHandle, FixtureId, JointHandle};

/// Errors raised at construction time, at the settings boundary, or when the
/// solver detects a non-finite state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// A shape has zero area, zero length, a non-positive radius or coincident vertices
    #[error("degenerate shape: {reason}")]
    DegenerateShape { reason: &'static str },

    /// Polygon vertices do not describe a convex polygon
    #[error("polygon vertices are not convex")]
    NonConvexPolygon,

    /// Polygon vertices are not wound counter-clockwise
    #[error("polygon vertices must be wound counter-clockwise")]
    InvalidWinding,

    /// A settings value was rejected
    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting {
        name: &'static str,
        reason: &'static str,
    },

    /// A fixture property (density, friction, restitution) was rejected
    #[error("invalid fixture property `{name}`: {reason}")]
    InvalidFixture {
        name: &'static str,
        reason: &'static str,
    },

    /// Joint parameters are degenerate
    #[error("invalid joint: {reason}")]
    InvalidJoint { reason: &'static str },

    /// The step duration is not a positive finite number
    #[error("invalid time step {dt}")]
    InvalidTimeStep { dt: f32 },

    /// No body exists for the handle
    #[error("body {0:?} does not exist")]
    BodyNotFound(BodyHandle),

    /// No joint exists for the handle
    #[error("joint {0:?} does not exist")]
    JointNotFound(JointHandle),

    /// No fixture with this id exists on the body
    #[error("fixture {fixture:?} does not exist on body {body:?}")]
    FixtureNotFound { body: BodyHandle, fixture: FixtureId },

    /// A body velocity or position became non-finite or exceeded the sanity bound
    #[error("numerical instability detected on body {body:?}")]
    NumericalInstability { body: BodyHandle },
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, PhysicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = PhysicsError::InvalidSetting {
            name: "velocity_iterations",
            reason: "must be at least 1",
        };
        assert_eq!(
            err.to_string(),
            "invalid setting `velocity_iterations`: must be at least 1"
        );
        assert_eq!(
            PhysicsError::DegenerateShape { reason: "zero radius" }.to_string(),
            "degenerate shape: zero radius"
        );
    }
}
