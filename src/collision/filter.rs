#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Category/mask collision filter.
///
/// Two fixtures collide when each one's category is accepted by the other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionFilter {
    /// Bits describing what this fixture is
    pub category: u32,
    /// Bits describing what this fixture collides with
    pub mask: u32,
}

impl CollisionFilter {
    /// Collides with everything
    pub const DEFAULT: Self = Self {
        category: 1,
        mask: u32::MAX,
    };

    /// Collides with nothing
    pub const NONE: Self = Self {
        category: 0,
        mask: 0,
    };

    pub const fn new(category: u32, mask: u32) -> Self {
        Self { category, mask }
    }

    /// Returns true if fixtures with these filters may collide
    #[inline]
    pub fn allows(&self, other: &CollisionFilter) -> bool {
        (self.category & other.mask) != 0 && (other.category & self.mask) != 0
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_collides_with_default() {
        assert!(CollisionFilter::DEFAULT.allows(&CollisionFilter::DEFAULT));
        assert!(!CollisionFilter::NONE.allows(&CollisionFilter::DEFAULT));
    }

    #[test]
    fn test_category_mask() {
        let player = CollisionFilter::new(0b01, 0b10);
        let enemy = CollisionFilter::new(0b10, 0b01);
        let ghost = CollisionFilter::new(0b100, 0b10);

        assert!(player.allows(&enemy));
        // ghost accepts players, but players do not accept ghosts
        assert!(!player.allows(&ghost));
        assert!(!ghost.allows(&player));
    }
}
