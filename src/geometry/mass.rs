use crate::math::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a body's mass takes part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MassType {
    /// Finite mass and inertia
    #[default]
    Normal,
    /// Neither translates nor rotates in response to impulses
    Infinite,
    /// Rotates in response to impulses but never translates
    FixedLinearVelocity,
    /// Translates in response to impulses but never rotates
    FixedAngularVelocity,
}

/// Mass properties of a shape or body.
///
/// `inertia` is the rotational inertia about `center`, expressed in the
/// shape's (or body's) local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassProperties {
    /// Total mass
    pub mass: f32,
    /// Center of mass in local coordinates
    pub center: Vec2,
    /// Rotational inertia about the center of mass
    pub inertia: f32,
    /// Mass type
    pub mass_type: MassType,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self::INFINITE
    }
}

impl MassProperties {
    /// Infinite mass centered at the origin (static bodies)
    pub const INFINITE: Self = Self {
        mass: 0.0,
        center: Vec2::ZERO,
        inertia: 0.0,
        mass_type: MassType::Infinite,
    };

    /// Creates normal mass properties
    #[inline]
    pub fn new(center: Vec2, mass: f32, inertia: f32) -> Self {
        Self {
            mass,
            center,
            inertia,
            mass_type: MassType::Normal,
        }
    }

    /// Returns a copy with a different mass type
    #[inline]
    pub fn with_type(mut self, mass_type: MassType) -> Self {
        self.mass_type = mass_type;
        self
    }

    /// Returns the inverse mass (0 for infinite or fixed linear mass)
    #[inline]
    pub fn inv_mass(&self) -> f32 {
        match self.mass_type {
            MassType::Infinite | MassType::FixedLinearVelocity => 0.0,
            _ if self.mass > 0.0 => 1.0 / self.mass,
            _ => 0.0,
        }
    }

    /// Returns the inverse inertia (0 for infinite or fixed angular mass)
    #[inline]
    pub fn inv_inertia(&self) -> f32 {
        match self.mass_type {
            MassType::Infinite | MassType::FixedAngularVelocity => 0.0,
            _ if self.inertia > 0.0 => 1.0 / self.inertia,
            _ => 0.0,
        }
    }

    /// Returns true if the mass never responds to impulses
    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.mass_type == MassType::Infinite
    }

    /// Combines several mass properties into one.
    ///
    /// The combined inertia is taken about the combined center of mass using
    /// the parallel axis theorem.
    pub fn combine(parts: &[MassProperties]) -> Self {
        match parts {
            [] => Self::INFINITE,
            [single] => *single,
            _ => {
                let mass: f32 = parts.iter().map(|p| p.mass).sum();
                if mass <= 0.0 {
                    return Self::INFINITE;
                }

                let center = parts
                    .iter()
                    .fold(Vec2::ZERO, |acc, p| acc + p.center * p.mass)
                    / mass;
                let inertia = parts
                    .iter()
                    .map(|p| p.inertia + p.mass * p.center.distance_squared(center))
                    .sum();
                Self::new(center, mass, inertia)
            }
        }
    }
}
