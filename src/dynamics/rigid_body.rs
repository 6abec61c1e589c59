use crate::collision::FixtureId;
use crate::geometry::{Aabb, MassProperties, MassType};
use crate::math::{Transform, Vec2};

use super::fixture::Fixture;
use super::sweep::Sweep;

/// The type of rigid body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyType {
    /// Static bodies never move
    Static,
    /// Dynamic bodies are affected by forces and collisions
    #[default]
    Dynamic,
    /// Kinematic bodies move according to their velocity but aren't affected by forces
    Kinematic,
}

/// A rigid body: an ordered list of fixtures moving as one.
///
/// The mass is recomputed from the fixture densities whenever a fixture is
/// added or removed, unless an explicit mass was set with [`Body::set_mass`].
#[derive(Debug, Clone)]
pub struct Body {
    body_type: BodyType,
    transform: Transform,
    sweep: Sweep,

    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f32,

    force: Vec2,
    torque: f32,

    mass: MassProperties,
    mass_type: MassType,
    explicit_mass: bool,

    /// Linear damping coefficient (per second)
    pub linear_damping: f32,
    /// Angular damping coefficient (per second)
    pub angular_damping: f32,
    /// Multiplier applied to the world gravity
    pub gravity_scale: f32,
    /// Bullets get time-of-impact checks against dynamic bodies too
    pub bullet: bool,

    awake: bool,
    auto_sleep: bool,
    active: bool,
    pub(crate) sleep_time: f32,

    fixtures: Vec<Fixture>,
    next_fixture_id: u32,
    pub(crate) fixtures_changed: bool,

    /// Optional user data
    pub user_data: u64,
}

impl Default for Body {
    fn default() -> Self {
        Self::new(BodyDesc::default())
    }
}

impl Body {
    /// Creates a body without fixtures
    pub fn new(desc: BodyDesc) -> Self {
        let transform = Transform::from_position_angle(desc.position, desc.angle);
        let mut body = Self {
            body_type: desc.body_type,
            transform,
            sweep: Sweep::at_rest(transform, Vec2::ZERO),
            linear_velocity: desc.linear_velocity,
            angular_velocity: desc.angular_velocity,
            force: Vec2::ZERO,
            torque: 0.0,
            mass: MassProperties::INFINITE,
            mass_type: MassType::Normal,
            explicit_mass: false,
            linear_damping: desc.linear_damping,
            angular_damping: desc.angular_damping,
            gravity_scale: desc.gravity_scale,
            bullet: desc.bullet,
            awake: desc.awake,
            auto_sleep: desc.auto_sleep,
            active: true,
            sleep_time: 0.0,
            fixtures: Vec::new(),
            next_fixture_id: 0,
            fixtures_changed: true,
            user_data: desc.user_data,
        };
        if body.body_type == BodyType::Static {
            body.linear_velocity = Vec2::ZERO;
            body.angular_velocity = 0.0;
        }
        body.update_mass();
        body
    }

    /// Adds a fixture, returning the body for chaining
    pub fn with_fixture(mut self, fixture: Fixture) -> Self {
        self.add_fixture(fixture);
        self
    }

    #[inline]
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    #[inline]
    pub fn is_kinematic(&self) -> bool {
        self.body_type == BodyType::Kinematic
    }

    // ---- fixtures ----

    /// Appends a fixture and recomputes the mass. Fixture ids are never
    /// reused by the same body.
    pub fn add_fixture(&mut self, mut fixture: Fixture) -> FixtureId {
        let id = FixtureId(self.next_fixture_id);
        self.next_fixture_id += 1;
        fixture.set_id(id);
        self.fixtures.push(fixture);
        self.fixtures_changed = true;
        self.update_mass();
        id
    }

    /// Removes a fixture, keeping the order of the others
    pub fn remove_fixture(&mut self, id: FixtureId) -> Option<Fixture> {
        let index = self.fixtures.iter().position(|f| f.id() == id)?;
        let fixture = self.fixtures.remove(index);
        self.fixtures_changed = true;
        self.update_mass();
        Some(fixture)
    }

    pub fn fixture(&self, id: FixtureId) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.id() == id)
    }

    /// Mutable access to a fixture. Call [`Body::update_mass`] after
    /// changing its density.
    pub fn fixture_mut(&mut self, id: FixtureId) -> Option<&mut Fixture> {
        self.fixtures.iter_mut().find(|f| f.id() == id)
    }

    /// Fixtures in insertion order
    #[inline]
    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    #[inline]
    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    // ---- mass ----

    /// Recomputes the mass from the fixtures, unless an explicit mass is set.
    pub fn update_mass(&mut self) {
        if self.explicit_mass {
            return;
        }

        let mass = if self.is_dynamic() {
            let parts: Vec<MassProperties> = self
                .fixtures
                .iter()
                .filter(|f| f.density() > 0.0)
                .map(Fixture::mass_properties)
                .collect();
            let combined = MassProperties::combine(&parts);
            if combined.mass > 0.0 && combined.mass_type != MassType::Infinite {
                combined
            } else {
                if !self.fixtures.is_empty() {
                    log::warn!("dynamic body has no mass from its fixtures, using unit mass");
                }
                MassProperties::new(combined.center, 1.0, 1.0)
            }
        } else {
            MassProperties::INFINITE
        };
        self.apply_mass(mass.with_type(self.effective_mass_type()));
    }

    /// Sets an explicit mass that fixture changes no longer override
    pub fn set_mass(&mut self, mass: MassProperties) {
        self.explicit_mass = true;
        self.mass_type = mass.mass_type;
        let mass = mass.with_type(self.effective_mass_type());
        self.apply_mass(mass);
    }

    /// Drops an explicit mass and goes back to fixture-computed mass
    pub fn clear_explicit_mass(&mut self) {
        self.explicit_mass = false;
        self.update_mass();
    }

    /// Changes how the mass responds to impulses
    pub fn set_mass_type(&mut self, mass_type: MassType) {
        self.mass_type = mass_type;
        let mass = self.mass.with_type(self.effective_mass_type());
        self.apply_mass(mass);
    }

    #[inline]
    pub fn mass_type(&self) -> MassType {
        self.mass.mass_type
    }

    /// Current mass properties
    #[inline]
    pub fn mass_properties(&self) -> &MassProperties {
        &self.mass
    }

    /// Total mass; zero for non-dynamic bodies
    #[inline]
    pub fn mass(&self) -> f32 {
        if self.is_dynamic() {
            self.mass.mass
        } else {
            0.0
        }
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        if self.is_dynamic() {
            self.mass.inv_mass()
        } else {
            0.0
        }
    }

    #[inline]
    pub fn inv_inertia(&self) -> f32 {
        if self.is_dynamic() {
            self.mass.inv_inertia()
        } else {
            0.0
        }
    }

    fn effective_mass_type(&self) -> MassType {
        if self.is_dynamic() {
            self.mass_type
        } else {
            MassType::Infinite
        }
    }

    fn apply_mass(&mut self, mass: MassProperties) {
        self.mass = mass;
        // keep the body origin fixed while the center of mass moves
        self.sweep = Sweep::at_rest(self.transform, mass.center);
    }

    // ---- transform ----

    #[inline]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Teleports the body and wakes it
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.sweep = Sweep::at_rest(transform, self.sweep.local_center);
        self.wake_up();
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    #[inline]
    pub fn angle(&self) -> f32 {
        self.sweep.a
    }

    /// Center of mass in world coordinates
    #[inline]
    pub fn world_center(&self) -> Vec2 {
        self.sweep.c
    }

    /// Center of mass in body coordinates
    #[inline]
    pub fn local_center(&self) -> Vec2 {
        self.sweep.local_center
    }

    #[inline]
    pub fn sweep(&self) -> &Sweep {
        &self.sweep
    }

    /// Sets the end of the sweep and derives the transform from it
    pub(crate) fn set_sweep_end(&mut self, center: Vec2, angle: f32) {
        self.sweep.c = center;
        self.sweep.a = angle;
        self.transform = self.sweep.end_transform();
    }

    /// Clamps the sweep to fraction `t` and syncs the transform
    pub(crate) fn clamp_sweep(&mut self, t: f32) {
        self.sweep.clamp_to(t);
        self.transform = self.sweep.end_transform();
    }

    /// Begins a step: the current state becomes the sweep start
    pub(crate) fn advance_sweep(&mut self) {
        self.sweep.advance();
    }

    /// World box around all fixtures, `None` without fixtures
    pub fn aabb(&self) -> Option<Aabb> {
        self.fixtures
            .iter()
            .map(|f| f.aabb(self.transform))
            .reduce(Aabb::union)
    }

    /// Largest distance from the center of mass to any fixture point
    pub fn rotation_radius(&self) -> f32 {
        let center = self.sweep.local_center;
        self.fixtures
            .iter()
            .map(|f| f.shape().rotation_radius(center))
            .fold(0.0, f32::max)
    }

    // ---- velocity ----

    /// Linear velocity of the center of mass
    #[inline]
    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    /// Sets the linear velocity; a non-zero velocity wakes the body.
    /// Static bodies ignore it.
    pub fn set_linear_velocity(&mut self, velocity: Vec2) {
        if self.is_static() {
            return;
        }
        if velocity.length_squared() > 0.0 {
            self.wake_up();
        }
        self.linear_velocity = velocity;
    }

    /// Angular velocity in radians per second
    #[inline]
    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Sets the angular velocity; a non-zero velocity wakes the body.
    /// Static bodies ignore it.
    pub fn set_angular_velocity(&mut self, velocity: f32) {
        if self.is_static() {
            return;
        }
        if velocity != 0.0 {
            self.wake_up();
        }
        self.angular_velocity = velocity;
    }

    // ---- forces ----

    /// Applies a force at the center of mass
    pub fn apply_force(&mut self, force: Vec2) {
        if self.is_dynamic() {
            self.force += force;
            self.wake_up();
        }
    }

    /// Applies a force at a world point
    pub fn apply_force_at(&mut self, force: Vec2, point: Vec2) {
        if self.is_dynamic() {
            self.force += force;
            self.torque += (point - self.sweep.c).cross(force);
            self.wake_up();
        }
    }

    /// Applies a torque
    pub fn apply_torque(&mut self, torque: f32) {
        if self.is_dynamic() {
            self.torque += torque;
            self.wake_up();
        }
    }

    /// Applies an impulse at the center of mass
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        if self.is_dynamic() {
            self.linear_velocity += impulse * self.inv_mass();
            self.wake_up();
        }
    }

    /// Applies an impulse at a world point
    pub fn apply_impulse_at(&mut self, impulse: Vec2, point: Vec2) {
        if self.is_dynamic() {
            self.linear_velocity += impulse * self.inv_mass();
            self.angular_velocity += self.inv_inertia() * (point - self.sweep.c).cross(impulse);
            self.wake_up();
        }
    }

    /// Applies an angular impulse
    pub fn apply_angular_impulse(&mut self, impulse: f32) {
        if self.is_dynamic() {
            self.angular_velocity += self.inv_inertia() * impulse;
            self.wake_up();
        }
    }

    #[inline]
    pub fn force(&self) -> Vec2 {
        self.force
    }

    #[inline]
    pub fn torque(&self) -> f32 {
        self.torque
    }

    /// Velocity of a world point moving with the body
    pub fn velocity_at_point(&self, point: Vec2) -> Vec2 {
        self.linear_velocity + Vec2::scalar_cross(self.angular_velocity, point - self.sweep.c)
    }

    /// Clears accumulated forces
    pub fn clear_forces(&mut self) {
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }

    // ---- sleep and activity ----

    #[inline]
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    /// Wakes up the body
    pub fn wake_up(&mut self) {
        if !self.is_static() {
            self.awake = true;
            self.sleep_time = 0.0;
        }
    }

    /// Puts the body to sleep, zeroing its velocity and forces
    pub fn put_to_sleep(&mut self) {
        self.awake = false;
        self.sleep_time = 0.0;
        self.linear_velocity = Vec2::ZERO;
        self.angular_velocity = 0.0;
        self.clear_forces();
    }

    #[inline]
    pub fn auto_sleep(&self) -> bool {
        self.auto_sleep
    }

    /// Disabling auto sleep also wakes the body
    pub fn set_auto_sleep(&mut self, enabled: bool) {
        self.auto_sleep = enabled;
        if !enabled {
            self.wake_up();
        }
    }

    /// Inactive bodies are neither simulated nor collided
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if active {
            self.wake_up();
        }
    }

    /// Linear and angular speed both below the sleep thresholds
    pub(crate) fn is_slow(&self, linear: f32, angular: f32) -> bool {
        self.linear_velocity.length_squared() <= linear * linear
            && self.angular_velocity.abs() <= angular
    }
}

/// Description for creating a body
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub body_type: BodyType,
    pub position: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub gravity_scale: f32,
    pub awake: bool,
    pub auto_sleep: bool,
    pub bullet: bool,
    pub user_data: u64,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.01,
            gravity_scale: 1.0,
            awake: true,
            auto_sleep: true,
            bullet: false,
            user_data: 0,
        }
    }
}

impl BodyDesc {
    /// A dynamic body description
    pub fn dynamic() -> Self {
        Self::default()
    }

    /// A static body description
    pub fn fixed() -> Self {
        Self {
            body_type: BodyType::Static,
            ..Self::default()
        }
    }

    /// A kinematic body description
    pub fn kinematic() -> Self {
        Self {
            body_type: BodyType::Kinematic,
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Sets the angle in radians
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_linear_velocity(mut self, velocity: Vec2) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, velocity: f32) -> Self {
        self.angular_velocity = velocity;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear.max(0.0);
        self.angular_damping = angular.max(0.0);
        self
    }

    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    pub fn with_bullet(mut self, bullet: bool) -> Self {
        self.bullet = bullet;
        self
    }

    pub fn with_auto_sleep(mut self, auto_sleep: bool) -> Self {
        self.auto_sleep = auto_sleep;
        self
    }

    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }

    /// Builds the body
    pub fn build(self) -> Body {
        Body::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Shape;

    const EPSILON: f32 = 1e-5;

    fn unit_box() -> Fixture {
        Fixture::new(Shape::rectangle(1.0, 1.0).expect("rectangle"))
    }

    #[test]
    fn test_body_creation() {
        let body = BodyDesc::dynamic()
            .with_position(Vec2::new(1.0, 2.0))
            .build()
            .with_fixture(unit_box().with_density(2.0).expect("density"));

        assert_eq!(body.position(), Vec2::new(1.0, 2.0));
        assert!((body.inv_mass() - 0.5).abs() < EPSILON);
        assert!(body.world_center().distance(Vec2::new(1.0, 2.0)) < EPSILON);
    }

    #[test]
    fn test_static_body() {
        let body = BodyDesc::fixed().build().with_fixture(unit_box());

        assert!(body.is_static());
        assert_eq!(body.inv_mass(), 0.0);
        assert_eq!(body.inv_inertia(), 0.0);
    }

    #[test]
    fn test_fixture_ids_are_not_reused() {
        let mut body = Body::default();
        let a = body.add_fixture(unit_box());
        let b = body.add_fixture(unit_box());
        assert!(body.remove_fixture(a).is_some());
        let c = body.add_fixture(unit_box());
        assert_ne!(c, a);
        assert_ne!(c, b);
        assert_eq!(body.fixtures().iter().map(|f| f.id()).collect::<Vec<_>>(), vec![b, c]);
        assert!(body.remove_fixture(a).is_none());
    }

    #[test]
    fn test_offset_fixture_moves_center_of_mass() {
        let mut shape = Shape::rectangle(1.0, 1.0).expect("rectangle");
        shape.translate(Vec2::new(2.0, 0.0));
        let body = Body::default().with_fixture(Fixture::new(shape));

        assert!(body.local_center().distance(Vec2::new(2.0, 0.0)) < EPSILON);
        assert_eq!(body.position(), Vec2::ZERO);
    }

    #[test]
    fn test_zero_density_falls_back_to_unit_mass() {
        let body = Body::default().with_fixture(unit_box().with_density(0.0).expect("density"));
        assert!((body.mass() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_explicit_mass_survives_fixture_changes() {
        let mut body = Body::default().with_fixture(unit_box());
        body.set_mass(MassProperties::new(Vec2::ZERO, 10.0, 5.0));
        body.add_fixture(unit_box());
        assert!((body.mass() - 10.0).abs() < EPSILON);

        body.clear_explicit_mass();
        assert!((body.mass() - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_mass_types() {
        let mut body = Body::default().with_fixture(unit_box());
        body.set_mass_type(MassType::FixedAngularVelocity);
        assert_eq!(body.inv_inertia(), 0.0);
        assert!(body.inv_mass() > 0.0);

        body.set_mass_type(MassType::Infinite);
        assert_eq!(body.inv_mass(), 0.0);
    }

    #[test]
    fn test_apply_impulse_at_point() {
        let mut body = Body::default().with_fixture(unit_box());
        body.apply_impulse_at(Vec2::new(0.0, 1.0), Vec2::new(0.5, 0.0));

        assert!(body.linear_velocity.distance(Vec2::new(0.0, 1.0)) < EPSILON);
        // unit box: I = 1/6
        assert!((body.angular_velocity - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_velocity_at_point() {
        let mut body = Body::default().with_fixture(unit_box());
        body.linear_velocity = Vec2::new(1.0, 0.0);
        body.angular_velocity = 1.0;

        // w x r = 1 x (0, 1) = (-1, 0)
        let vel = body.velocity_at_point(Vec2::new(0.0, 1.0));
        assert!(vel.length() < EPSILON);
    }

    #[test]
    fn test_setting_velocity_wakes_body() {
        let mut body = Body::default().with_fixture(unit_box());
        body.put_to_sleep();
        body.set_linear_velocity(Vec2::ZERO);
        assert!(!body.is_awake());

        body.set_linear_velocity(Vec2::new(2.0, 0.0));
        assert!(body.is_awake());
        assert_eq!(body.linear_velocity(), Vec2::new(2.0, 0.0));

        body.put_to_sleep();
        body.set_angular_velocity(1.5);
        assert!(body.is_awake());
        assert_eq!(body.angular_velocity(), 1.5);

        let mut ground = BodyDesc::fixed().build();
        ground.set_linear_velocity(Vec2::X);
        assert_eq!(ground.linear_velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_sleep_clears_motion() {
        let mut body = Body::default().with_fixture(unit_box());
        body.linear_velocity = Vec2::new(1.0, 1.0);
        body.apply_force(Vec2::X);
        body.put_to_sleep();
        assert!(!body.is_awake());
        assert_eq!(body.linear_velocity, Vec2::ZERO);
        assert_eq!(body.force(), Vec2::ZERO);

        body.apply_impulse(Vec2::X);
        assert!(body.is_awake());
    }

    #[test]
    fn test_aabb_covers_all_fixtures() {
        let mut far = Shape::circle(0.5).expect("circle");
        far.translate(Vec2::new(3.0, 0.0));
        let body = Body::default().with_fixture(unit_box()).with_fixture(Fixture::new(far));
        let aabb = body.aabb().expect("aabb");
        assert!((aabb.min.x + 0.5).abs() < EPSILON);
        assert!((aabb.max.x - 3.5).abs() < EPSILON);
        assert!(Body::default().aabb().is_none());
    }
}
