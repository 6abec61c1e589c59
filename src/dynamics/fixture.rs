use crate::collision::{CollisionFilter, FixtureId};
use crate::error::{PhysicsError, Result};
use crate::geometry::{Aabb, MassProperties, Shape};
use crate::math::Transform;

/// Default fixture density in kg/m^2
pub const DEFAULT_DENSITY: f32 = 1.0;
/// Default friction coefficient
pub const DEFAULT_FRICTION: f32 = 0.2;
/// Default restitution coefficient
pub const DEFAULT_RESTITUTION: f32 = 0.0;

/// A shape attached to a body, with its material and filtering.
///
/// Sensor fixtures report overlaps to contact listeners but never produce
/// contact constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    id: FixtureId,
    shape: Shape,
    density: f32,
    friction: f32,
    restitution: f32,
    /// Collision filter
    pub filter: CollisionFilter,
    /// Sensors detect overlaps without responding to them
    pub sensor: bool,
    /// Optional user data
    pub user_data: u64,
}

impl Fixture {
    /// Creates a fixture with the default material
    pub fn new(shape: Shape) -> Self {
        Self {
            id: FixtureId::default(),
            shape,
            density: DEFAULT_DENSITY,
            friction: DEFAULT_FRICTION,
            restitution: DEFAULT_RESTITUTION,
            filter: CollisionFilter::DEFAULT,
            sensor: false,
            user_data: 0,
        }
    }

    /// Sets the density; must be finite and non-negative
    pub fn with_density(mut self, density: f32) -> Result<Self> {
        self.set_density(density)?;
        Ok(self)
    }

    /// Sets the friction coefficient; must be finite and non-negative
    pub fn with_friction(mut self, friction: f32) -> Result<Self> {
        self.set_friction(friction)?;
        Ok(self)
    }

    /// Sets the restitution coefficient; must be finite and non-negative
    pub fn with_restitution(mut self, restitution: f32) -> Result<Self> {
        self.set_restitution(restitution)?;
        Ok(self)
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    /// Id assigned by the owning body
    #[inline]
    pub fn id(&self) -> FixtureId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: FixtureId) {
        self.id = id;
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn density(&self) -> f32 {
        self.density
    }

    /// Changing the density of an attached fixture takes effect once the
    /// body's mass is recomputed with `Body::update_mass`
    pub fn set_density(&mut self, density: f32) -> Result<()> {
        self.density = non_negative("density", density)?;
        Ok(())
    }

    #[inline]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn set_friction(&mut self, friction: f32) -> Result<()> {
        self.friction = non_negative("friction", friction)?;
        Ok(())
    }

    #[inline]
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    pub fn set_restitution(&mut self, restitution: f32) -> Result<()> {
        self.restitution = non_negative("restitution", restitution)?;
        Ok(())
    }

    /// World-space bounding box under the body transform
    #[inline]
    pub fn aabb(&self, transform: Transform) -> Aabb {
        self.shape.aabb(transform)
    }

    /// Mass properties of the shape at this fixture's density
    #[inline]
    pub fn mass_properties(&self) -> MassProperties {
        self.shape.mass_properties(self.density)
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<f32> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidFixture {
            name,
            reason: "must be a non-negative finite number",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let fixture = Fixture::new(Shape::circle(1.0).expect("circle"));
        assert_eq!(fixture.density(), DEFAULT_DENSITY);
        assert_eq!(fixture.friction(), DEFAULT_FRICTION);
        assert_eq!(fixture.restitution(), DEFAULT_RESTITUTION);
        assert_eq!(fixture.filter, CollisionFilter::DEFAULT);
        assert!(!fixture.sensor);
    }

    #[test]
    fn test_validation() {
        let shape = Shape::circle(1.0).expect("circle");
        assert!(Fixture::new(shape.clone()).with_density(-1.0).is_err());
        assert!(Fixture::new(shape.clone()).with_friction(f32::NAN).is_err());
        assert!(Fixture::new(shape.clone()).with_restitution(f32::INFINITY).is_err());

        let fixture = Fixture::new(shape)
            .with_density(2.0)
            .and_then(|f| f.with_friction(0.5))
            .expect("valid fixture");
        assert_eq!(fixture.density(), 2.0);
        assert_eq!(fixture.friction(), 0.5);
    }

    #[test]
    fn test_mass_uses_density() {
        let fixture = Fixture::new(Shape::rectangle(2.0, 1.0).expect("rectangle"))
            .with_density(3.0)
            .expect("density");
        assert!((fixture.mass_properties().mass - 6.0).abs() < 1e-5);
    }
}
