use std::ops::Mul;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::vec2::Vec2;

/// A rotation in the plane stored as the cosine/sine pair of its angle.
///
/// Composition and vector rotation never call trigonometric functions, so
/// rotating the same vector twice yields bit-identical results.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rotation {
    pub cos: f32,
    pub sin: f32,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Rotation {
    /// Identity rotation (angle zero)
    pub const IDENTITY: Self = Self { cos: 1.0, sin: 0.0 };

    /// Creates a rotation from an angle in radians
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { cos, sin }
    }

    /// Returns the angle of this rotation in radians, in (-π, π]
    #[inline]
    pub fn angle(self) -> f32 {
        self.sin.atan2(self.cos)
    }

    /// Returns the inverse rotation
    #[inline]
    pub fn inverse(self) -> Self {
        Self {
            cos: self.cos,
            sin: -self.sin,
        }
    }

    /// Rotates a vector by this rotation
    #[inline]
    pub fn rotate(self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.cos * v.x - self.sin * v.y,
            self.sin * v.x + self.cos * v.y,
        )
    }

    /// Rotates a vector by the inverse of this rotation
    #[inline]
    pub fn inverse_rotate(self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.cos * v.x + self.sin * v.y,
            -self.sin * v.x + self.cos * v.y,
        )
    }

    /// The rotated X axis
    #[inline]
    pub fn x_axis(self) -> Vec2 {
        Vec2::new(self.cos, self.sin)
    }

    /// The rotated Y axis
    #[inline]
    pub fn y_axis(self) -> Vec2 {
        Vec2::new(-self.sin, self.cos)
    }

    /// Re-normalizes the cosine/sine pair after accumulated drift
    #[inline]
    pub fn normalize(self) -> Self {
        let len = (self.cos * self.cos + self.sin * self.sin).sqrt();
        if len > 1e-12 {
            Self {
                cos: self.cos / len,
                sin: self.sin / len,
            }
        } else {
            Self::IDENTITY
        }
    }

    /// Normalized linear interpolation between two rotations
    #[inline]
    pub fn nlerp(self, other: Self, t: f32) -> Self {
        Self {
            cos: self.cos + (other.cos - self.cos) * t,
            sin: self.sin + (other.sin - self.sin) * t,
        }
        .normalize()
    }
}

impl Mul for Rotation {
    type Output = Self;

    /// Composes two rotations: `self * other` applies `other` first
    #[inline]
    fn mul(self, other: Self) -> Self {
        Self {
            cos: self.cos * other.cos - self.sin * other.sin,
            sin: self.sin * other.cos + self.cos * other.sin,
        }
    }
}

impl Mul<Vec2> for Rotation {
    type Output = Vec2;

    #[inline]
    fn mul(self, v: Vec2) -> Vec2 {
        self.rotate(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    const EPSILON: f32 = 1e-6;

    fn vec2_approx_eq(a: Vec2, b: Vec2) -> bool {
        a.distance_squared(b) < EPSILON * EPSILON
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let r = Rotation::from_angle(FRAC_PI_2);
        assert!(vec2_approx_eq(r.rotate(Vec2::X), Vec2::Y));
        assert!(vec2_approx_eq(r.inverse_rotate(Vec2::Y), Vec2::X));
    }

    #[test]
    fn test_compose() {
        let a = Rotation::from_angle(0.3);
        let b = Rotation::from_angle(0.5);
        assert!(((a * b).angle() - 0.8).abs() < EPSILON);
        assert!(((a * a.inverse()).angle()).abs() < EPSILON);
    }

    #[test]
    fn test_angle_wraps() {
        let r = Rotation::from_angle(PI + 0.25);
        assert!((r.angle() - (-PI + 0.25)).abs() < 1e-5);
    }

    #[test]
    fn test_nlerp_midpoint() {
        let a = Rotation::IDENTITY;
        let b = Rotation::from_angle(FRAC_PI_2);
        let mid = a.nlerp(b, 0.5);
        assert!((mid.angle() - FRAC_PI_2 * 0.5).abs() < 1e-5);
    }
}
