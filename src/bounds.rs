//! World bounds. Bodies that leave them are deactivated.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::Aabb;
use crate::math::Vec2;

/// A region of space the simulation is confined to
pub trait Bounds {
    /// True if a body with this box is entirely outside the bounds
    fn is_outside(&self, aabb: Aabb) -> bool;
}

/// Rectangular bounds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisAlignedBounds {
    aabb: Aabb,
}

impl AxisAlignedBounds {
    /// Bounds of the given size centered on the origin
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            aabb: Aabb::from_center_half_extents(Vec2::ZERO, Vec2::new(width * 0.5, height * 0.5)),
        }
    }

    pub fn from_aabb(aabb: Aabb) -> Self {
        Self { aabb }
    }

    #[inline]
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.aabb = self.aabb.translated(delta);
    }
}

impl Bounds for AxisAlignedBounds {
    fn is_outside(&self, aabb: Aabb) -> bool {
        !self.aabb.intersects(aabb)
    }
}
