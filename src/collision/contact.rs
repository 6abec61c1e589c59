#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math::Vec2;

use super::manifold::{Manifold, ManifoldPointId};

/// Maximum number of contact points in a 2D manifold
pub const MAX_CONTACT_POINTS: usize = 2;

/// A handle to a body in the physics world.
///
/// The generation changes every time a slot is reused, so a handle to a
/// removed body never resolves to the body that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    /// Invalid/null body handle
    pub const INVALID: Self = Self {
        index: u32::MAX,
        generation: 0,
    };

    /// Creates a new body handle
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index of this handle
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Returns true if this handle is valid
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for BodyHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// A handle to a joint in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointHandle {
    index: u32,
    generation: u32,
}

impl JointHandle {
    pub const INVALID: Self = Self {
        index: u32::MAX,
        generation: 0,
    };

    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl Default for JointHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Identifies a fixture within its body. Ids are never reused by a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FixtureId(pub u32);

/// Globally identifies a fixture: the owning body plus the fixture id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureKey {
    pub body: BodyHandle,
    pub fixture: FixtureId,
}

impl FixtureKey {
    #[inline]
    pub const fn new(body: BodyHandle, fixture: FixtureId) -> Self {
        Self { body, fixture }
    }
}

/// An unordered pair of fixtures, stored with `a < b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactKey {
    pub a: FixtureKey,
    pub b: FixtureKey,
}

impl ContactKey {
    /// Creates a key, ordering the two fixtures
    pub fn new(a: FixtureKey, b: FixtureKey) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }
}

/// A single solved contact point between two fixtures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// Feature id used to match the point across steps
    pub id: ManifoldPointId,
    /// World space contact point
    pub point: Vec2,
    /// Penetration depth (positive when overlapping)
    pub depth: f32,
    /// Contact point in local space of body A
    pub local_point_a: Vec2,
    /// Contact point in local space of body B
    pub local_point_b: Vec2,
    /// Accumulated normal impulse (for warm starting)
    pub normal_impulse: f32,
    /// Accumulated tangent impulse (for warm starting)
    pub tangent_impulse: f32,
}

impl ContactPoint {
    pub fn new(id: ManifoldPointId, point: Vec2, depth: f32, local_point_a: Vec2, local_point_b: Vec2) -> Self {
        Self {
            id,
            point,
            depth,
            local_point_a,
            local_point_b,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
        }
    }
}

/// A contact between two fixtures, cached across steps for warm starting
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub key: ContactKey,
    /// Contact normal, pointing from fixture A to fixture B
    pub normal: Vec2,
    /// At most [`MAX_CONTACT_POINTS`] points
    pub points: Vec<ContactPoint>,
    /// Combined friction coefficient
    pub friction: f32,
    /// Combined restitution coefficient
    pub restitution: f32,
    /// Sensor contacts are reported but never solved
    pub sensor: bool,
    /// Cleared by listeners to skip solving this step
    pub enabled: bool,
}

impl Contact {
    /// Builds a contact from a manifold. Points are converted into the
    /// local frames of both bodies using their transforms.
    pub fn from_manifold(
        key: ContactKey,
        manifold: &Manifold,
        transform_a: crate::math::Transform,
        transform_b: crate::math::Transform,
    ) -> Self {
        let points = manifold
            .points
            .iter()
            .take(MAX_CONTACT_POINTS)
            .map(|mp| {
                ContactPoint::new(
                    mp.id,
                    mp.point,
                    mp.depth,
                    transform_a.inverse_transform_point(mp.point),
                    transform_b.inverse_transform_point(mp.point),
                )
            })
            .collect();

        Self {
            key,
            normal: manifold.normal,
            points,
            friction: 0.0,
            restitution: 0.0,
            sensor: false,
            enabled: true,
        }
    }

    /// Copies accumulated impulses from the previous step's contact for the
    /// same fixture pair.
    ///
    /// Indexed points match on their feature id; distance points match the
    /// nearest old point within `warm_start_distance`. Unmatched points start
    /// cold.
    pub fn warm_start_from(&mut self, previous: &Contact, warm_start_distance: f32) {
        let max_distance_sq = warm_start_distance * warm_start_distance;
        for point in &mut self.points {
            let matched = match point.id {
                ManifoldPointId::Distance => previous
                    .points
                    .iter()
                    .filter(|old| old.id == ManifoldPointId::Distance)
                    .find(|old| old.point.distance_squared(point.point) <= max_distance_sq),
                id => previous.points.iter().find(|old| old.id == id),
            };
            if let Some(old) = matched {
                point.normal_impulse = old.normal_impulse;
                point.tangent_impulse = old.tangent_impulse;
            }
        }
    }

    /// Returns the number of contact points
    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Returns the body handles of the two fixtures
    #[inline]
    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.key.a.body, self.key.b.body)
    }

    /// True if either fixture belongs to `body`
    #[inline]
    pub fn involves(&self, body: BodyHandle) -> bool {
        self.key.a.body == body || self.key.b.body == body
    }
}

/// Friction mixing: geometric mean
#[inline]
pub fn mix_friction(a: f32, b: f32) -> f32 {
    (a * b).sqrt()
}

/// Restitution mixing: the bouncier fixture wins
#[inline]
pub fn mix_restitution(a: f32, b: f32) -> f32 {
    a.max(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::manifold::ManifoldPoint;

    fn key(body: u32, fixture: u32) -> FixtureKey {
        FixtureKey::new(BodyHandle::new(body, 0), FixtureId(fixture))
    }

    fn contact(points: Vec<ManifoldPoint>) -> Contact {
        let manifold = Manifold {
            normal: Vec2::Y,
            points,
        };
        Contact::from_manifold(
            ContactKey::new(key(0, 0), key(1, 0)),
            &manifold,
            crate::math::Transform::IDENTITY,
            crate::math::Transform::IDENTITY,
        )
    }

    #[test]
    fn test_contact_key_is_ordered() {
        let k1 = ContactKey::new(key(3, 0), key(1, 2));
        let k2 = ContactKey::new(key(1, 2), key(3, 0));
        assert_eq!(k1, k2);
        assert!(k1.a < k1.b);
    }

    #[test]
    fn test_handle_generation_distinguishes() {
        let old = BodyHandle::new(4, 0);
        let new = BodyHandle::new(4, 1);
        assert_ne!(old, new);
        assert_eq!(old.index(), new.index());
        assert!(!BodyHandle::INVALID.is_valid());
    }

    #[test]
    fn test_warm_start_by_feature_id() {
        let id = ManifoldPointId::Indexed {
            reference_edge: 2,
            incident_edge: 0,
            incident_vertex: 1,
            flipped: false,
        };
        let mut previous = contact(vec![ManifoldPoint {
            id,
            point: Vec2::new(0.0, 0.0),
            depth: 0.01,
        }]);
        previous.points[0].normal_impulse = 3.0;
        previous.points[0].tangent_impulse = -0.5;

        // same id, drifted position
        let mut current = contact(vec![ManifoldPoint {
            id,
            point: Vec2::new(0.3, 0.0),
            depth: 0.02,
        }]);
        current.warm_start_from(&previous, 0.01);
        assert_eq!(current.points[0].normal_impulse, 3.0);
        assert_eq!(current.points[0].tangent_impulse, -0.5);
    }

    #[test]
    fn test_warm_start_by_distance() {
        let mut previous = contact(vec![ManifoldPoint {
            id: ManifoldPointId::Distance,
            point: Vec2::ZERO,
            depth: 0.01,
        }]);
        previous.points[0].normal_impulse = 2.0;

        let mut near = contact(vec![ManifoldPoint {
            id: ManifoldPointId::Distance,
            point: Vec2::new(0.005, 0.0),
            depth: 0.01,
        }]);
        near.warm_start_from(&previous, 0.01);
        assert_eq!(near.points[0].normal_impulse, 2.0);

        let mut far = contact(vec![ManifoldPoint {
            id: ManifoldPointId::Distance,
            point: Vec2::new(0.5, 0.0),
            depth: 0.01,
        }]);
        far.warm_start_from(&previous, 0.01);
        assert_eq!(far.points[0].normal_impulse, 0.0);
    }

    #[test]
    fn test_mixing() {
        assert!((mix_friction(0.25, 1.0) - 0.5).abs() < 1e-6);
        assert_eq!(mix_restitution(0.2, 0.7), 0.7);
    }
}
