mod mat2;
mod mat3;
mod rotation;
mod transform;
mod vec2;

pub use mat2::Mat2;
pub use mat3::{Mat3, Vec3};
pub use rotation::Rotation;
pub use transform::Transform;
pub use vec2::Vec2;

/// Common math constants and utilities
pub mod consts {
    /// A small epsilon value for floating point comparisons
    pub const EPSILON: f32 = 1e-6;

    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Two times Pi
    pub const TAU: f32 = std::f32::consts::TAU;

    /// Pi divided by 2
    pub const FRAC_PI_2: f32 = std::f32::consts::FRAC_PI_2;
}
