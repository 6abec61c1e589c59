use std::ops::{Add, Mul};

use super::vec2::Vec2;

/// A 2x2 matrix stored as two column vectors.
///
/// Used for the effective mass of two-row constraints (point constraints and
/// the two-point contact block).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Mat2 {
    /// First column
    pub ex: Vec2,
    /// Second column
    pub ey: Vec2,
}

impl Mat2 {
    /// Zero matrix
    pub const ZERO: Self = Self::from_cols(Vec2::ZERO, Vec2::ZERO);

    /// Identity matrix
    pub const IDENTITY: Self = Self::from_cols(Vec2::X, Vec2::Y);

    /// Creates a matrix from columns
    #[inline]
    pub const fn from_cols(ex: Vec2, ey: Vec2) -> Self {
        Self { ex, ey }
    }

    /// Creates a matrix from its entries in row-major order
    #[inline]
    pub const fn new(a11: f32, a12: f32, a21: f32, a22: f32) -> Self {
        Self::from_cols(Vec2::new(a11, a21), Vec2::new(a12, a22))
    }

    /// Determinant
    #[inline]
    pub fn determinant(self) -> f32 {
        self.ex.x * self.ey.y - self.ey.x * self.ex.y
    }

    /// Inverse, or the zero matrix if singular
    #[inline]
    pub fn inverse(self) -> Self {
        let (a, b, c, d) = (self.ex.x, self.ey.x, self.ex.y, self.ey.y);
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Self::new(det * d, -det * b, -det * c, det * a)
    }

    /// Solves `A * x = b` without forming the inverse.
    /// Returns zero if the matrix is singular.
    #[inline]
    pub fn solve(self, b: Vec2) -> Vec2 {
        let (a11, a12, a21, a22) = (self.ex.x, self.ey.x, self.ex.y, self.ey.y);
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2::new(det * (a22 * b.x - a12 * b.y), det * (a11 * b.y - a21 * b.x))
    }

    /// Multiplies the matrix with a vector
    #[inline]
    pub fn mul_vec(self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.ex.x * v.x + self.ey.x * v.y,
            self.ex.y * v.x + self.ey.y * v.y,
        )
    }
}

impl Mul<Vec2> for Mat2 {
    type Output = Vec2;

    #[inline]
    fn mul(self, v: Vec2) -> Vec2 {
        self.mul_vec(v)
    }
}

impl Add for Mat2 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::from_cols(self.ex + other.ex, self.ey + other.ey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_solve_matches_inverse() {
        let m = Mat2::new(4.0, 1.0, 2.0, 3.0);
        let b = Vec2::new(1.0, 2.0);

        let x = m.solve(b);
        let y = m.inverse() * b;
        assert!(x.distance(y) < EPSILON);
        assert!((m * x).distance(b) < EPSILON);
    }

    #[test]
    fn test_singular_solves_to_zero() {
        let m = Mat2::new(1.0, 2.0, 2.0, 4.0);
        assert_eq!(m.determinant(), 0.0);
        assert_eq!(m.solve(Vec2::ONE), Vec2::ZERO);
        assert_eq!(m.inverse(), Mat2::ZERO);
    }
}
