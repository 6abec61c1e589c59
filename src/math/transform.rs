#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::rotation::Rotation;
use super::vec2::Vec2;

/// A rigid transformation combining position and rotation.
///
/// Maps shape and body local coordinates into world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Position (translation)
    pub position: Vec2,
    /// Rotation
    pub rotation: Rotation,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform (no translation or rotation)
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: Rotation::IDENTITY,
    };

    /// Creates a new transform from position and rotation
    #[inline]
    pub const fn new(position: Vec2, rotation: Rotation) -> Self {
        Self { position, rotation }
    }

    /// Creates a transform from a position and an angle in radians
    #[inline]
    pub fn from_position_angle(position: Vec2, angle: f32) -> Self {
        Self {
            position,
            rotation: Rotation::from_angle(angle),
        }
    }

    /// Creates a transform with only translation
    #[inline]
    pub const fn from_position(position: Vec2) -> Self {
        Self {
            position,
            rotation: Rotation::IDENTITY,
        }
    }

    /// Rotation angle in radians
    #[inline]
    pub fn angle(self) -> f32 {
        self.rotation.angle()
    }

    /// Transforms a point from local space to world space
    #[inline]
    pub fn transform_point(self, point: Vec2) -> Vec2 {
        self.rotation.rotate(point) + self.position
    }

    /// Transforms a vector (direction) from local space to world space
    /// Unlike points, vectors are not affected by translation
    #[inline]
    pub fn transform_vector(self, vector: Vec2) -> Vec2 {
        self.rotation.rotate(vector)
    }

    /// Inverse transforms a point from world space to local space
    #[inline]
    pub fn inverse_transform_point(self, point: Vec2) -> Vec2 {
        self.rotation.inverse_rotate(point - self.position)
    }

    /// Inverse transforms a vector from world space to local space
    #[inline]
    pub fn inverse_transform_vector(self, vector: Vec2) -> Vec2 {
        self.rotation.inverse_rotate(vector)
    }

    /// Returns the inverse of this transform
    #[inline]
    pub fn inverse(self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            position: inv_rotation.rotate(-self.position),
            rotation: inv_rotation,
        }
    }

    /// Combines two transforms: self * other
    /// The result transforms from other's local space to self's local space to world
    #[inline]
    pub fn compose(self, other: Self) -> Self {
        Self {
            position: self.transform_point(other.position),
            rotation: self.rotation * other.rotation,
        }
    }

    /// Returns a copy translated by `delta` in world space
    #[inline]
    pub fn translated(self, delta: Vec2) -> Self {
        Self {
            position: self.position + delta,
            rotation: self.rotation,
        }
    }

    /// Returns true if every component is finite
    #[inline]
    pub fn is_finite(self) -> bool {
        self.position.is_finite() && self.rotation.cos.is_finite() && self.rotation.sin.is_finite()
    }

    /// Returns true if this transform is approximately equal to another
    #[inline]
    pub fn approx_eq(self, other: Self, epsilon: f32) -> bool {
        self.position.distance_squared(other.position) < epsilon * epsilon
            && (self.rotation.cos - other.rotation.cos).abs() < epsilon
            && (self.rotation.sin - other.rotation.sin).abs() < epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    fn vec2_approx_eq(a: Vec2, b: Vec2) -> bool {
        a.distance_squared(b) < EPSILON * EPSILON
    }

    #[test]
    fn test_translation_only() {
        let t = Transform::from_position(Vec2::new(1.0, 2.0));
        let p = Vec2::new(1.0, 1.0);

        // Points are affected by translation
        assert!(vec2_approx_eq(t.transform_point(p), Vec2::new(2.0, 3.0)));

        // Vectors are not affected by translation
        assert!(vec2_approx_eq(t.transform_vector(p), p));
    }

    #[test]
    fn test_combined() {
        let t = Transform::from_position_angle(Vec2::new(1.0, 0.0), FRAC_PI_2);

        // First rotate X -> Y, then translate by (1, 0)
        assert!(vec2_approx_eq(t.transform_point(Vec2::X), Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_inverse() {
        let t = Transform::from_position_angle(Vec2::new(1.0, 2.0), 0.7);
        let p = Vec2::new(4.0, 5.0);

        let back = t.inverse().transform_point(t.transform_point(p));
        assert!(vec2_approx_eq(back, p));
        assert!(vec2_approx_eq(t.inverse_transform_point(t.transform_point(p)), p));
    }

    #[test]
    fn test_compose() {
        let t1 = Transform::from_position(Vec2::new(1.0, 0.0));
        let t2 = Transform::from_position_angle(Vec2::ZERO, FRAC_PI_2);

        let composed = t1.compose(t2);
        assert!(vec2_approx_eq(composed.transform_point(Vec2::X), Vec2::new(1.0, 1.0)));
    }
}
