//! Broad-phase pair pruning.
//!
//! Every implementation stores a "fat" box per fixture: the tight box grown by
//! a margin and stretched along the fixture's recent displacement. A fixture
//! whose tight box is still inside its fat box needs no update, which keeps
//! the per-step cost proportional to the number of fast movers.

mod brute_force;
mod dynamic_tree;
mod sap;

pub use brute_force::BruteForce;
pub use dynamic_tree::DynamicTree;
pub use sap::SweepAndPrune;

use crate::collision::contact::FixtureKey;
use crate::geometry::Aabb;
use crate::math::Vec2;
use crate::settings::BroadPhaseKind;

/// Contract shared by all broad-phase strategies.
///
/// `query_pairs` must report every pair whose fat boxes overlap (touching
/// counts). False positives are allowed; the narrow phase filters them.
pub trait BroadPhase {
    /// Adds a fixture with its tight world box
    fn insert(&mut self, key: FixtureKey, aabb: Aabb);

    /// Removes a fixture; returns false if it was not present
    fn remove(&mut self, key: FixtureKey) -> bool;

    /// Refreshes a fixture after it moved by `displacement` this step.
    ///
    /// Returns true if the fat box had to be rebuilt.
    fn update(&mut self, key: FixtureKey, aabb: Aabb, displacement: Vec2) -> bool;

    fn contains(&self, key: FixtureKey) -> bool;

    /// The stored fat box of a fixture
    fn fat_aabb(&self, key: FixtureKey) -> Option<Aabb>;

    /// All overlapping pairs, each ordered `(a, b)` with `a < b`, sorted and
    /// free of duplicates
    fn query_pairs(&self) -> Vec<(FixtureKey, FixtureKey)>;

    /// Fixtures whose fat boxes overlap `aabb`, sorted
    fn query_aabb(&self, aabb: Aabb) -> Vec<FixtureKey>;

    /// Fixtures whose fat boxes a ray may hit within `max_distance`, sorted
    fn query_ray(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Vec<FixtureKey>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}

/// Creates the broad phase selected by `kind`
pub fn create(kind: BroadPhaseKind, fattening: Fattening) -> Box<dyn BroadPhase> {
    match kind {
        BroadPhaseKind::BruteForce => Box::new(BruteForce::new(fattening)),
        BroadPhaseKind::SweepAndPrune => Box::new(SweepAndPrune::new(fattening)),
        BroadPhaseKind::DynamicTree => Box::new(DynamicTree::new(fattening)),
    }
}

/// How tight boxes are grown into fat boxes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fattening {
    /// Margin added on every side
    pub margin: f32,
    /// Scales the displacement the box is stretched along
    pub displacement_multiplier: f32,
}

impl Default for Fattening {
    fn default() -> Self {
        Self {
            margin: 0.1,
            displacement_multiplier: 2.0,
        }
    }
}

impl Fattening {
    pub const fn new(margin: f32, displacement_multiplier: f32) -> Self {
        Self {
            margin,
            displacement_multiplier,
        }
    }

    /// Grows a tight box into a fat box
    #[inline]
    pub fn fatten(&self, aabb: Aabb, displacement: Vec2) -> Aabb {
        aabb.expand(self.margin)
            .extend_along(displacement * self.displacement_multiplier)
    }
}

/// True if a ray can hit `aabb` before `max_distance`
#[inline]
pub(crate) fn ray_hits_aabb(aabb: Aabb, origin: Vec2, direction: Vec2, max_distance: f32) -> bool {
    matches!(aabb.ray_intersection(origin, direction), Some((t_min, _)) if t_min <= max_distance)
}
