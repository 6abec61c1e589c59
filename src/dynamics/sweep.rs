use crate::math::{Rotation, Transform, Vec2};

/// Motion of a body's center of mass over one step.
///
/// `c0`/`a0` are the world center and angle at the start of the step, `c`/`a`
/// at the end. Time-of-impact queries interpolate between the two.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sweep {
    /// Center of mass in body-local coordinates
    pub local_center: Vec2,
    /// World center at the start of the step
    pub c0: Vec2,
    /// World center at the end of the step
    pub c: Vec2,
    /// Angle at the start of the step
    pub a0: f32,
    /// Angle at the end of the step
    pub a: f32,
}

impl Sweep {
    /// A sweep at rest at the given transform
    pub fn at_rest(transform: Transform, local_center: Vec2) -> Self {
        let c = transform.transform_point(local_center);
        let a = transform.angle();
        Self {
            local_center,
            c0: c,
            c,
            a0: a,
            a,
        }
    }

    /// Body transform at fraction `t` of the step (0 = start, 1 = end)
    pub fn transform_at(&self, t: f32) -> Transform {
        let center = self.c0 + (self.c - self.c0) * t;
        let rotation = Rotation::from_angle(self.a0 + (self.a - self.a0) * t);
        Transform::new(center - rotation.rotate(self.local_center), rotation)
    }

    /// Body transform at the end of the step
    #[inline]
    pub fn end_transform(&self) -> Transform {
        self.transform_at(1.0)
    }

    /// Moves the end of the sweep back to fraction `t`
    pub fn clamp_to(&mut self, t: f32) {
        self.c = self.c0 + (self.c - self.c0) * t;
        self.a = self.a0 + (self.a - self.a0) * t;
    }

    /// Starts a new step at the current end state
    #[inline]
    pub fn advance(&mut self) {
        self.c0 = self.c;
        self.a0 = self.a;
    }

    /// Displacement of the center over the step
    #[inline]
    pub fn linear_displacement(&self) -> Vec2 {
        self.c - self.c0
    }

    /// Rotation over the step
    #[inline]
    pub fn angular_displacement(&self) -> f32 {
        self.a - self.a0
    }
}
