use std::ops::{Add, Mul, Neg, Sub};

use super::vec2::Vec2;

/// A three component vector used by the 3x3 block solves of planar joints.
///
/// The components are (linear x, linear y, angular) impulses or errors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a new Vec3 from components
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Dot product
    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    #[inline]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// The linear (x, y) part
    #[inline]
    pub fn xy(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// A 3x3 matrix stored as three column vectors.
///
/// Only the operations needed for constraint effective masses are provided:
/// full and upper-left 2x2 solves, and the inverse forms of both.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Mat3 {
    pub ex: Vec3,
    pub ey: Vec3,
    pub ez: Vec3,
}

impl Mat3 {
    /// Zero matrix
    pub const ZERO: Self = Self::from_cols(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);

    /// Creates a matrix from columns
    #[inline]
    pub const fn from_cols(ex: Vec3, ey: Vec3, ez: Vec3) -> Self {
        Self { ex, ey, ez }
    }

    /// Multiplies the matrix with a vector
    #[inline]
    pub fn mul_vec(self, v: Vec3) -> Vec3 {
        self.ex * v.x + self.ey * v.y + self.ez * v.z
    }

    /// Multiplies the upper-left 2x2 block with a vector
    #[inline]
    pub fn mul_vec2(self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.ex.x * v.x + self.ey.x * v.y,
            self.ex.y * v.x + self.ey.y * v.y,
        )
    }

    /// Solves `A * x = b`. Returns zero if the matrix is singular.
    pub fn solve33(self, b: Vec3) -> Vec3 {
        let mut det = self.ex.dot(self.ey.cross(self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec3::new(
            det * b.dot(self.ey.cross(self.ez)),
            det * self.ex.dot(b.cross(self.ez)),
            det * self.ex.dot(self.ey.cross(b)),
        )
    }

    /// Solves the upper-left 2x2 block `A * x = b`.
    /// Returns zero if the block is singular.
    pub fn solve22(self, b: Vec2) -> Vec2 {
        let (a11, a12, a21, a22) = (self.ex.x, self.ey.x, self.ex.y, self.ey.y);
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2::new(det * (a22 * b.x - a12 * b.y), det * (a11 * b.y - a21 * b.x))
    }

    /// Inverse of the upper-left 2x2 block, with the third row and column zeroed
    pub fn inverse22(self) -> Self {
        let (a, b, c, d) = (self.ex.x, self.ey.x, self.ex.y, self.ey.y);
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Self::from_cols(
            Vec3::new(det * d, -det * c, 0.0),
            Vec3::new(-det * b, det * a, 0.0),
            Vec3::ZERO,
        )
    }

    /// Inverse of a symmetric matrix. Returns the zero matrix if singular.
    pub fn symmetric_inverse33(self) -> Self {
        let mut det = self.ex.dot(self.ey.cross(self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }

        let (a11, a12, a13) = (self.ex.x, self.ey.x, self.ez.x);
        let (a22, a23) = (self.ey.y, self.ez.y);
        let a33 = self.ez.z;

        let ex = Vec3::new(
            det * (a22 * a33 - a23 * a23),
            det * (a13 * a23 - a12 * a33),
            det * (a12 * a23 - a13 * a22),
        );
        let ey = Vec3::new(
            ex.y,
            det * (a11 * a33 - a13 * a13),
            det * (a13 * a12 - a11 * a23),
        );
        let ez = Vec3::new(ex.z, ey.z, det * (a11 * a22 - a12 * a12));
        Self::from_cols(ex, ey, ez)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn vec3_approx_eq(a: Vec3, b: Vec3) -> bool {
        (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON && (a.z - b.z).abs() < EPSILON
    }

    fn symmetric() -> Mat3 {
        Mat3::from_cols(
            Vec3::new(4.0, 1.0, 0.5),
            Vec3::new(1.0, 3.0, 0.25),
            Vec3::new(0.5, 0.25, 2.0),
        )
    }

    #[test]
    fn test_solve33() {
        let m = symmetric();
        let b = Vec3::new(1.0, -2.0, 0.5);
        let x = m.solve33(b);
        assert!(vec3_approx_eq(m.mul_vec(x), b));
    }

    #[test]
    fn test_symmetric_inverse_matches_solve() {
        let m = symmetric();
        let b = Vec3::new(0.3, 0.7, -1.1);
        assert!(vec3_approx_eq(m.symmetric_inverse33().mul_vec(b), m.solve33(b)));
    }

    #[test]
    fn test_solve22_ignores_third_row() {
        let m = symmetric();
        let b = Vec2::new(1.0, 1.0);
        let x = m.solve22(b);
        assert!(m.mul_vec2(x).distance(b) < EPSILON);
        assert!(m.inverse22().mul_vec2(b).distance(x) < EPSILON);
    }
}
