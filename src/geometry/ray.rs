use crate::math::Vec2;

/// A half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec2,
    /// Unit direction; zero if constructed from a zero vector
    pub direction: Vec2,
}

impl Ray {
    /// Creates a ray, normalizing the direction
    #[inline]
    pub fn new(origin: Vec2, direction: Vec2) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Point at distance `t` along the ray
    #[inline]
    pub fn at(self, t: f32) -> Vec2 {
        self.origin + self.direction * t
    }
}

/// The first intersection of a ray with a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space hit point
    pub point: Vec2,
    /// Surface normal at the hit point, facing the ray
    pub normal: Vec2,
    /// Distance from the ray origin
    pub distance: f32,
}
