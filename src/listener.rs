//! Callbacks fired by [`World::step`](crate::World::step).
//!
//! Listeners see event data by reference and never the world itself, so they
//! cannot add or remove bodies mid-step. Record what you need and apply the
//! changes after `step` returns.

use crate::collision::{BodyHandle, Contact};
use crate::dynamics::Body;
use crate::world::StepInfo;

/// Contact lifecycle events. Every method has a no-op default.
pub trait ContactListener {
    /// A sensor fixture overlaps another fixture. Fired every step the
    /// overlap lasts.
    fn sensed(&mut self, _contact: &Contact) {}

    /// Two fixtures touch for the first time. Return `false` to skip solving
    /// the contact this step.
    fn begin(&mut self, _contact: &Contact) -> bool {
        true
    }

    /// Two fixtures that touched last step still touch.
    /// Return `false` to skip solving the contact this step.
    fn persist(&mut self, _contact: &Contact) -> bool {
        true
    }

    /// Two fixtures stopped touching, or one of them was removed
    fn end(&mut self, _contact: &Contact) {}

    /// Called for every enabled contact right before the solve.
    /// Return `false` to skip solving it.
    fn pre_solve(&mut self, _contact: &Contact) -> bool {
        true
    }

    /// Called after the solve with the accumulated impulses filled in
    fn post_solve(&mut self, _contact: &Contact) {}
}

/// Step boundaries
pub trait StepListener {
    fn pre_step(&mut self, _info: &StepInfo) {}

    fn post_step(&mut self, _info: &StepInfo) {}
}

/// Fired once when a body leaves the world bounds and is deactivated
pub trait BoundsListener {
    fn outside(&mut self, body: BodyHandle, state: &Body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{ContactKey, FixtureId, FixtureKey};
    use crate::math::Vec2;

    struct Defaults;

    impl ContactListener for Defaults {}
    impl StepListener for Defaults {}

    #[test]
    fn test_defaults_keep_contacts_enabled() {
        let key = ContactKey::new(
            FixtureKey::new(BodyHandle::new(0, 0), FixtureId(0)),
            FixtureKey::new(BodyHandle::new(1, 0), FixtureId(0)),
        );
        let contact = Contact {
            key,
            normal: Vec2::Y,
            points: Vec::new(),
            friction: 0.0,
            restitution: 0.0,
            sensor: false,
            enabled: true,
        };

        let mut listener = Defaults;
        assert!(listener.begin(&contact));
        assert!(listener.persist(&contact));
        assert!(listener.pre_solve(&contact));
    }
}
