use std::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 2D vector with f32 components.
///
/// Used for positions, velocities, forces, support directions and contact normals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    /// Zero vector (0, 0)
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Unit vector along X axis (1, 0)
    pub const X: Self = Self::new(1.0, 0.0);

    /// Unit vector along Y axis (0, 1)
    pub const Y: Self = Self::new(0.0, 1.0);

    /// One vector (1, 1)
    pub const ONE: Self = Self::new(1.0, 1.0);

    /// Creates a new Vec2 from components
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Creates a Vec2 with both components set to the same value
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v)
    }

    /// Dot product of two vectors
    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product, the z component of the 3D cross product
    #[inline]
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Cross product of this vector with a scalar z axis: `v × s`
    #[inline]
    pub fn cross_scalar(self, s: f32) -> Self {
        Self::new(s * self.y, -s * self.x)
    }

    /// Cross product of a scalar z axis with a vector: `s × v`
    ///
    /// For an angular velocity `w` and arm `r` this is the point velocity `w × r`.
    #[inline]
    pub fn scalar_cross(s: f32, v: Self) -> Self {
        Self::new(-s * v.y, s * v.x)
    }

    /// Vector rotated 90 degrees counter-clockwise
    #[inline]
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Vector rotated 90 degrees clockwise
    ///
    /// For an edge of a counter-clockwise polygon this is the outward normal.
    #[inline]
    pub fn right(self) -> Self {
        Self::new(self.y, -self.x)
    }

    /// Vector triple product `(a × b) × c` expanded in the plane
    #[inline]
    pub fn triple_product(a: Self, b: Self, c: Self) -> Self {
        b * a.dot(c) - a * b.dot(c)
    }

    /// Squared length of the vector (avoids sqrt)
    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length (magnitude) of the vector
    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Returns a normalized (unit length) version of the vector
    /// Returns zero vector if the input is zero or near-zero
    #[inline]
    pub fn normalize(self) -> Self {
        let len_sq = self.length_squared();
        if len_sq > 1e-12 {
            self / len_sq.sqrt()
        } else {
            Self::ZERO
        }
    }

    /// Returns a normalized vector and its original length
    /// Returns (ZERO, 0.0) if the input is zero or near-zero
    #[inline]
    pub fn normalize_with_length(self) -> (Self, f32) {
        let len_sq = self.length_squared();
        if len_sq > 1e-12 {
            let len = len_sq.sqrt();
            (self / len, len)
        } else {
            (Self::ZERO, 0.0)
        }
    }

    /// Attempts to normalize, returning None if the vector is too small
    #[inline]
    pub fn try_normalize(self) -> Option<Self> {
        let len_sq = self.length_squared();
        if len_sq > 1e-12 {
            Some(self / len_sq.sqrt())
        } else {
            None
        }
    }

    /// Returns true if the vector is approximately zero
    #[inline]
    pub fn is_near_zero(self, epsilon: f32) -> bool {
        self.length_squared() < epsilon * epsilon
    }

    /// Returns true if both components are finite
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Linear interpolation between two vectors
    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// Component-wise minimum
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Component-wise absolute value
    #[inline]
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs())
    }

    /// Returns the distance between two points
    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Returns the squared distance between two points
    #[inline]
    pub fn distance_squared(self, other: Self) -> f32 {
        (other - self).length_squared()
    }

    /// Angle of the vector measured from the positive X axis
    #[inline]
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }
}

// Operator overloads

impl Add for Vec2 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl SubAssign for Vec2 {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl Mul<Vec2> for f32 {
    type Output = Vec2;

    #[inline]
    fn mul(self, vec: Vec2) -> Vec2 {
        Vec2::new(self * vec.x, self * vec.y)
    }
}

impl MulAssign<f32> for Vec2 {
    #[inline]
    fn mul_assign(&mut self, scalar: f32) {
        self.x *= scalar;
        self.y *= scalar;
    }
}

impl Div<f32> for Vec2 {
    type Output = Self;

    #[inline]
    fn div(self, scalar: f32) -> Self {
        let inv = 1.0 / scalar;
        Self::new(self.x * inv, self.y * inv)
    }
}

impl DivAssign<f32> for Vec2 {
    #[inline]
    fn div_assign(&mut self, scalar: f32) {
        let inv = 1.0 / scalar;
        self.x *= inv;
        self.y *= inv;
    }
}

impl Neg for Vec2 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Index<usize> for Vec2 {
    type Output = f32;

    #[inline]
    fn index(&self, index: usize) -> &f32 {
        match index {
            0 => &self.x,
            1 => &self.y,
            _ => panic!("Vec2 index out of bounds: {}", index),
        }
    }
}

impl IndexMut<usize> for Vec2 {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => panic!("Vec2 index out of bounds: {}", index),
        }
    }
}

impl From<[f32; 2]> for Vec2 {
    #[inline]
    fn from(arr: [f32; 2]) -> Self {
        Self::new(arr[0], arr[1])
    }
}

impl From<(f32, f32)> for Vec2 {
    #[inline]
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn vec2_approx_eq(a: Vec2, b: Vec2) -> bool {
        approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
    }

    #[test]
    fn test_cross_variants() {
        assert!(approx_eq(Vec2::X.cross(Vec2::Y), 1.0));
        assert!(approx_eq(Vec2::Y.cross(Vec2::X), -1.0));

        // w × r for w = 1 and r = X is a velocity along +Y
        assert!(vec2_approx_eq(Vec2::scalar_cross(1.0, Vec2::X), Vec2::Y));
        assert!(vec2_approx_eq(Vec2::X.cross_scalar(1.0), -Vec2::Y));
    }

    #[test]
    fn test_perpendiculars() {
        let v = Vec2::new(2.0, 1.0);
        assert!(approx_eq(v.perp().dot(v), 0.0));
        assert!(approx_eq(v.right().dot(v), 0.0));
        assert!(v.cross(v.perp()) > 0.0);
        assert!(v.cross(v.right()) < 0.0);
    }

    #[test]
    fn test_triple_product_points_away_from_edge() {
        // Edge from a to b with the origin on the left side
        let ab = Vec2::new(1.0, 0.0);
        let ao = Vec2::new(0.0, 1.0);
        let d = Vec2::triple_product(ab, ao, ab);
        assert!(approx_eq(d.dot(ab), 0.0));
        assert!(d.dot(ao) > 0.0);
    }

    #[test]
    fn test_normalize() {
        let v = Vec2::new(3.0, 4.0);
        let n = v.normalize();
        assert!(approx_eq(n.length(), 1.0));
        assert!(vec2_approx_eq(n, Vec2::new(0.6, 0.8)));

        assert_eq!(Vec2::ZERO.try_normalize(), None);
        assert!(vec2_approx_eq(Vec2::ZERO.normalize(), Vec2::ZERO));
    }

    #[test]
    fn test_operators() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(4.0, 5.0);

        assert!(vec2_approx_eq(a + b, Vec2::new(5.0, 7.0)));
        assert!(vec2_approx_eq(b - a, Vec2::new(3.0, 3.0)));
        assert!(vec2_approx_eq(a * 2.0, Vec2::new(2.0, 4.0)));
        assert!(vec2_approx_eq(2.0 * a, Vec2::new(2.0, 4.0)));
        assert!(vec2_approx_eq(a / 2.0, Vec2::new(0.5, 1.0)));
        assert!(vec2_approx_eq(-a, Vec2::new(-1.0, -2.0)));
        assert_eq!(a[0], 1.0);
        assert_eq!(a[1], 2.0);
    }

    #[test]
    fn test_finite() {
        assert!(Vec2::new(1.0, 2.0).is_finite());
        assert!(!Vec2::new(f32::NAN, 0.0).is_finite());
        assert!(!Vec2::new(0.0, f32::INFINITY).is_finite());
    }
}
