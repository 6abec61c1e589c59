use std::collections::{HashMap, HashSet};

use crate::bounds::Bounds;
use crate::collision::contact::{mix_friction, mix_restitution};
use crate::collision::{broad_phase, manifold, narrow_phase};
use crate::collision::{
    BodyHandle, BroadPhase, ConservativeAdvancement, Contact, ContactKey, Fattening, FixtureId, FixtureKey,
    JointHandle, ManifoldSolver, NarrowPhaseDetector, Separation, TimeOfImpactDetector,
};
use crate::constraints::Joint;
use crate::dynamics::{integrate_position, integrate_velocity, Body, Sweep};
use crate::error::{PhysicsError, Result};
use crate::geometry::{Aabb, Ray};
use crate::listener::{BoundsListener, ContactListener, StepListener};
use crate::math::Vec2;
use crate::settings::{ContinuousDetectionMode, Settings};
use crate::solver::{ContactSolver, Position, SolverBody, SolverData, TimeStep, Velocity};

/// Earth gravity along -y
pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, -9.8);

/// Speeds above this are treated as a solver blow-up
const RUNAWAY_SPEED: f32 = 1.0e6;

/// Timing of the step being run, handed to step listeners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInfo {
    pub dt: f32,
    pub inv_dt: f32,
    /// `dt / previous dt`
    pub dt_ratio: f32,
    /// Number of steps taken, including this one
    pub step_count: u64,
}

/// Result of a ray cast query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastHit {
    /// Body that was hit
    pub body: BodyHandle,
    /// Fixture that was hit
    pub fixture: FixtureId,
    /// World space hit point
    pub point: Vec2,
    /// Surface normal at hit point
    pub normal: Vec2,
    /// Distance from ray origin
    pub distance: f32,
}

#[derive(Debug)]
struct BodySlot {
    generation: u32,
    body: Option<Body>,
    /// Fixtures currently registered with the broad phase
    proxies: Vec<FixtureId>,
}

#[derive(Debug)]
struct JointSlot {
    generation: u32,
    joint: Option<Joint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContactState {
    Began,
    Persisted,
    /// Both bodies asleep; kept from the previous step untouched
    Sleeping,
}

/// Bodies connected through contacts and joints, solved together
#[derive(Debug, Default)]
struct Island {
    bodies: Vec<BodyHandle>,
    contacts: Vec<usize>,
    joints: Vec<JointHandle>,
}

/// Solver output for the members of one island, not yet written back
#[derive(Debug)]
struct SolvedIsland {
    bodies: Vec<BodyHandle>,
    positions: Vec<Position>,
    velocities: Vec<Velocity>,
    /// Touches a kinematic body moving faster than the sleep thresholds
    carried: bool,
}

/// The main physics world containing all bodies and managing simulation.
///
/// Bodies and joints are addressed by generational handles. Iteration order
/// is always insertion order, so two worlds built the same way step the same
/// way.
pub struct World {
    settings: Settings,
    gravity: Vec2,

    bodies: Vec<BodySlot>,
    free_bodies: Vec<u32>,
    body_order: Vec<BodyHandle>,

    joints: Vec<JointSlot>,
    free_joints: Vec<u32>,
    joint_order: Vec<JointHandle>,

    broad_phase: Box<dyn BroadPhase>,
    narrow_phase: Box<dyn NarrowPhaseDetector>,
    manifold_solver: Box<dyn ManifoldSolver>,
    /// Contacts of the last step, sorted by key
    contacts: Vec<Contact>,
    contact_solver: ContactSolver,

    bounds: Option<Box<dyn Bounds>>,
    contact_listeners: Vec<Box<dyn ContactListener>>,
    step_listeners: Vec<Box<dyn StepListener>>,
    bounds_listeners: Vec<Box<dyn BoundsListener>>,

    step_count: u64,
    previous_dt: f32,
    accumulator: f32,
    time: f32,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world with the default settings
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Creates a world using the strategies selected in `settings`
    pub fn with_settings(settings: Settings) -> Self {
        let fattening = Fattening::new(settings.broad_phase_margin(), settings.displacement_multiplier());
        let broad = broad_phase::create(settings.broad_phase(), fattening);
        let narrow = narrow_phase::create(settings.narrow_phase(), &settings);
        let manifolds = manifold::create(settings.manifold_solver(), &settings);
        Self::with_strategies(settings, broad, narrow, manifolds)
    }

    /// Creates a world with caller-provided strategies. The strategy kinds in
    /// `settings` are ignored.
    pub fn with_strategies(
        settings: Settings,
        broad_phase: Box<dyn BroadPhase>,
        narrow_phase: Box<dyn NarrowPhaseDetector>,
        manifold_solver: Box<dyn ManifoldSolver>,
    ) -> Self {
        log::debug!(
            "creating world: {} Hz, {} velocity / {} position iterations",
            settings.step_frequency(),
            settings.velocity_iterations(),
            settings.position_iterations()
        );
        Self {
            settings,
            gravity: DEFAULT_GRAVITY,
            bodies: Vec::new(),
            free_bodies: Vec::new(),
            body_order: Vec::new(),
            joints: Vec::new(),
            free_joints: Vec::new(),
            joint_order: Vec::new(),
            broad_phase,
            narrow_phase,
            manifold_solver,
            contacts: Vec::new(),
            contact_solver: ContactSolver::new(),
            bounds: None,
            contact_listeners: Vec::new(),
            step_listeners: Vec::new(),
            bounds_listeners: Vec::new(),
            step_count: 0,
            previous_dt: 0.0,
            accumulator: 0.0,
            time: 0.0,
        }
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the settings. Strategy kinds only apply at construction.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    #[inline]
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    /// Confines the simulation; bodies that leave are deactivated
    pub fn set_bounds(&mut self, bounds: impl Bounds + 'static) {
        self.bounds = Some(Box::new(bounds));
    }

    pub fn clear_bounds(&mut self) {
        self.bounds = None;
    }

    pub fn add_contact_listener(&mut self, listener: impl ContactListener + 'static) {
        self.contact_listeners.push(Box::new(listener));
    }

    pub fn add_step_listener(&mut self, listener: impl StepListener + 'static) {
        self.step_listeners.push(Box::new(listener));
    }

    pub fn add_bounds_listener(&mut self, listener: impl BoundsListener + 'static) {
        self.bounds_listeners.push(Box::new(listener));
    }

    /// Adds a body and registers its fixtures with the broad phase
    pub fn add_body(&mut self, mut body: Body) -> BodyHandle {
        body.fixtures_changed = false;
        let index = match self.free_bodies.pop() {
            Some(index) => index as usize,
            None => {
                self.bodies.push(BodySlot {
                    generation: 0,
                    body: None,
                    proxies: Vec::new(),
                });
                self.bodies.len() - 1
            }
        };

        let slot = &mut self.bodies[index];
        let handle = BodyHandle::new(index as u32, slot.generation);
        if body.is_active() {
            insert_proxies(&mut *self.broad_phase, handle, &body, &mut slot.proxies);
        }
        slot.body = Some(body);
        self.body_order.push(handle);

        log::debug!("added body {:?}, {} bodies", handle, self.body_order.len());
        handle
    }

    /// Removes a body together with its joints. Its contacts end and the
    /// bodies it touched wake up.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<Body> {
        let slot = self
            .bodies
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .ok_or(PhysicsError::BodyNotFound(handle))?;
        let body = slot.body.take().ok_or(PhysicsError::BodyNotFound(handle))?;
        remove_proxies(&mut *self.broad_phase, handle, &mut slot.proxies);
        slot.generation = slot.generation.wrapping_add(1);
        self.free_bodies.push(handle.index() as u32);
        self.body_order.retain(|&h| h != handle);

        let attached: Vec<JointHandle> = self
            .joint_order
            .iter()
            .copied()
            .filter(|&j| self.joint(j).is_some_and(|joint| joint.involves(handle)))
            .collect();
        for joint in attached {
            self.remove_joint(joint)?;
        }

        let (ended, kept): (Vec<Contact>, Vec<Contact>) =
            std::mem::take(&mut self.contacts).into_iter().partition(|c| c.involves(handle));
        self.contacts = kept;
        for contact in &ended {
            for listener in &mut self.contact_listeners {
                listener.end(contact);
            }
            let (a, b) = contact.bodies();
            let other = if a == handle { b } else { a };
            if let Some(other) = self.body_mut(other) {
                other.wake_up();
            }
        }

        log::debug!("removed body {:?}, {} bodies", handle, self.body_order.len());
        Ok(body)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.body.as_ref())
    }

    /// Mutable access to a body. Fixture changes reach the broad phase on
    /// the next step.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.body.as_mut())
    }

    /// Body handle at `index` in insertion order
    pub fn body_handle(&self, index: usize) -> Option<BodyHandle> {
        self.body_order.get(index).copied()
    }

    /// Body at `index` in insertion order
    pub fn body_at(&self, index: usize) -> Option<&Body> {
        self.body_handle(index).and_then(|handle| self.body(handle))
    }

    #[inline]
    pub fn body_count(&self) -> usize {
        self.body_order.len()
    }

    /// All bodies in insertion order
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> + '_ {
        self.body_order
            .iter()
            .filter_map(|&handle| self.body(handle).map(|body| (handle, body)))
    }

    /// Adds a joint between existing bodies and wakes them
    pub fn add_joint(&mut self, joint: Joint) -> Result<JointHandle> {
        let body_a = joint.body_a();
        if self.body(body_a).is_none() {
            return Err(PhysicsError::BodyNotFound(body_a));
        }
        if let Some(body_b) = joint.body_b() {
            if self.body(body_b).is_none() {
                return Err(PhysicsError::BodyNotFound(body_b));
            }
            if body_a == body_b {
                return Err(PhysicsError::InvalidJoint {
                    reason: "a joint needs two different bodies",
                });
            }
        }
        self.wake_joint_bodies(&joint);

        let index = match self.free_joints.pop() {
            Some(index) => index as usize,
            None => {
                self.joints.push(JointSlot {
                    generation: 0,
                    joint: None,
                });
                self.joints.len() - 1
            }
        };
        let slot = &mut self.joints[index];
        let handle = JointHandle::new(index as u32, slot.generation);
        log::debug!("added {} joint {:?}", joint.kind().name(), handle);
        slot.joint = Some(joint);
        self.joint_order.push(handle);
        Ok(handle)
    }

    /// Removes a joint and wakes its bodies
    pub fn remove_joint(&mut self, handle: JointHandle) -> Result<Joint> {
        let slot = self
            .joints
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .ok_or(PhysicsError::JointNotFound(handle))?;
        let joint = slot.joint.take().ok_or(PhysicsError::JointNotFound(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_joints.push(handle.index() as u32);
        self.joint_order.retain(|&h| h != handle);
        self.wake_joint_bodies(&joint);

        log::debug!("removed {} joint {:?}", joint.kind().name(), handle);
        Ok(joint)
    }

    pub fn joint(&self, handle: JointHandle) -> Option<&Joint> {
        self.joints
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.joint.as_ref())
    }

    pub fn joint_mut(&mut self, handle: JointHandle) -> Option<&mut Joint> {
        joint_entry(&mut self.joints, handle)
    }

    /// Joint at `index` in insertion order
    pub fn joint_at(&self, index: usize) -> Option<&Joint> {
        self.joint_order.get(index).and_then(|&handle| self.joint(handle))
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joint_order.len()
    }

    /// All joints in insertion order
    pub fn joints(&self) -> impl Iterator<Item = (JointHandle, &Joint)> + '_ {
        self.joint_order
            .iter()
            .filter_map(|&handle| self.joint(handle).map(|joint| (handle, joint)))
    }

    fn wake_joint_bodies(&mut self, joint: &Joint) {
        for handle in std::iter::once(joint.body_a()).chain(joint.body_b()) {
            if let Some(body) = self.body_mut(handle) {
                body.wake_up();
            }
        }
    }

    /// Contacts found by the last step, sorted by fixture pair
    #[inline]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    #[inline]
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    #[inline]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Simulated time in seconds
    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Every fixture hit by the ray within `max_distance`, nearest first.
    ///
    /// Uses the broad phase as of the last step (or `add_body`), so fixtures
    /// added through [`World::body_mut`] show up after the next step.
    pub fn ray_cast(&self, ray: Ray, max_distance: f32) -> Vec<RayCastHit> {
        let mut hits: Vec<RayCastHit> = self
            .broad_phase
            .query_ray(ray.origin, ray.direction, max_distance)
            .into_iter()
            .filter_map(|key| {
                let body = self.body(key.body)?;
                let fixture = body.fixture(key.fixture)?;
                let hit = fixture.shape().ray_cast(ray, max_distance, body.transform())?;
                Some(RayCastHit {
                    body: key.body,
                    fixture: key.fixture,
                    point: hit.point,
                    normal: hit.normal,
                    distance: hit.distance,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Accumulates `elapsed` seconds and runs as many fixed steps of
    /// `1 / step_frequency` as fit. Returns the number of steps taken.
    pub fn update(&mut self, elapsed: f32) -> Result<usize> {
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Err(PhysicsError::InvalidTimeStep { dt: elapsed });
        }
        let dt = self.settings.step_duration();
        self.accumulator += elapsed;

        let mut steps = 0;
        while self.accumulator >= dt {
            self.step(dt)?;
            self.accumulator -= dt;
            steps += 1;
        }
        Ok(steps)
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// Continuous detection moves a fast body back to its time of impact
    /// pose; the contact it hits there is built and solved by the next step,
    /// so the bullet is resolved one step late.
    ///
    /// On [`PhysicsError::NumericalInstability`] no body is moved, forces
    /// stay accumulated and the step count does not advance. The contact
    /// list, contact events and warm-start impulses of this step remain.
    pub fn step(&mut self, dt: f32) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(PhysicsError::InvalidTimeStep { dt });
        }
        let step = TimeStep::new(dt, self.previous_dt, self.settings.warm_starting());
        let info = StepInfo {
            dt,
            inv_dt: step.inv_dt,
            dt_ratio: step.dt_ratio,
            step_count: self.step_count + 1,
        };
        for listener in &mut self.step_listeners {
            listener.pre_step(&info);
        }

        // Broad phase, then narrow phase and contact events
        self.sync_broad_phase();
        self.update_contacts();

        // Integrate and solve every awake island
        self.solve(step)?;
        self.step_count = info.step_count;

        // Pull fast bodies back to their time of impact
        if self.settings.continuous_mode() != ContinuousDetectionMode::None {
            self.solve_continuous();
        }
        self.check_bounds();

        for slot in &mut self.bodies {
            if let Some(body) = slot.body.as_mut() {
                body.clear_forces();
            }
        }

        self.previous_dt = dt;
        self.time += dt;
        for listener in &mut self.step_listeners {
            listener.post_step(&info);
        }
        Ok(())
    }

    /// Brings the broad phase up to date with fixture changes, activity and
    /// motion since the last step
    fn sync_broad_phase(&mut self) {
        let broad_phase = &mut *self.broad_phase;
        for &handle in &self.body_order {
            let slot = &mut self.bodies[handle.index()];
            let Some(body) = slot.body.as_mut() else {
                continue;
            };

            if !body.is_active() {
                remove_proxies(broad_phase, handle, &mut slot.proxies);
                continue;
            }
            if body.fixtures_changed || slot.proxies.len() != body.fixture_count() {
                remove_proxies(broad_phase, handle, &mut slot.proxies);
                insert_proxies(broad_phase, handle, body, &mut slot.proxies);
                body.fixtures_changed = false;
                continue;
            }
            if body.is_static() || body.is_awake() {
                let transform = body.transform();
                let displacement = body.sweep().linear_displacement();
                for fixture in body.fixtures() {
                    broad_phase.update(
                        FixtureKey::new(handle, fixture.id()),
                        fixture.aabb(transform),
                        displacement,
                    );
                }
            }
        }
    }

    /// Runs the narrow phase over the broad-phase pairs and fires the
    /// contact events
    fn update_contacts(&mut self) {
        let pairs = self.broad_phase.query_pairs();
        let previous = std::mem::take(&mut self.contacts);
        let no_collide = self.non_colliding_pairs();
        let warm_start_distance = self.settings.warm_start_distance();

        let mut contacts = Vec::new();
        let mut states = Vec::new();
        for (key_a, key_b) in pairs {
            if key_a.body == key_b.body {
                continue;
            }
            let (Some(body_a), Some(body_b)) = (self.body(key_a.body), self.body(key_b.body)) else {
                continue;
            };
            if !body_a.is_dynamic() && !body_b.is_dynamic() {
                continue;
            }
            if !body_a.is_active() || !body_b.is_active() {
                continue;
            }
            let (Some(fixture_a), Some(fixture_b)) = (body_a.fixture(key_a.fixture), body_b.fixture(key_b.fixture))
            else {
                continue;
            };
            if !fixture_a.filter.allows(&fixture_b.filter) || no_collide.contains(&ordered(key_a.body, key_b.body)) {
                continue;
            }

            let key = ContactKey::new(key_a, key_b);
            let old = previous
                .binary_search_by(|c| c.key.cmp(&key))
                .ok()
                .map(|index| &previous[index]);

            if !is_moving(body_a) && !is_moving(body_b) {
                if let Some(old) = old {
                    contacts.push(old.clone());
                    states.push(ContactState::Sleeping);
                }
                continue;
            }

            let (transform_a, transform_b) = (body_a.transform(), body_b.transform());
            let (shape_a, shape_b) = (fixture_a.shape(), fixture_b.shape());
            let Some(penetration) = self.narrow_phase.detect(shape_a, transform_a, shape_b, transform_b) else {
                continue;
            };
            let Some(manifold) =
                self.manifold_solver
                    .manifold(&penetration, shape_a, transform_a, shape_b, transform_b)
            else {
                continue;
            };

            let mut contact = Contact::from_manifold(key, &manifold, transform_a, transform_b);
            contact.friction = mix_friction(fixture_a.friction(), fixture_b.friction());
            contact.restitution = mix_restitution(fixture_a.restitution(), fixture_b.restitution());
            contact.sensor = fixture_a.sensor || fixture_b.sensor;

            let state = match old {
                Some(old) => {
                    contact.warm_start_from(old, warm_start_distance);
                    ContactState::Persisted
                }
                None => ContactState::Began,
            };
            contacts.push(contact);
            states.push(state);
        }

        // new touches wake both bodies, and a moving kinematic body wakes
        // whatever rests on it
        let (linear, angular) = (self.settings.sleep_linear_velocity(), self.settings.sleep_angular_velocity());
        let carries = |body: &Body| body.is_kinematic() && !body.is_slow(linear, angular);
        for (contact, state) in contacts.iter().zip(&states) {
            if contact.sensor {
                continue;
            }
            let (a, b) = contact.bodies();
            let wake = *state == ContactState::Began
                || self.body(a).is_some_and(carries)
                || self.body(b).is_some_and(carries);
            if wake {
                for handle in [a, b] {
                    if let Some(body) = self.body_mut(handle) {
                        if !body.is_awake() {
                            body.wake_up();
                        }
                    }
                }
            }
        }

        for (contact, state) in contacts.iter_mut().zip(&states) {
            match state {
                ContactState::Sleeping => {}
                _ if contact.sensor => {
                    for listener in &mut self.contact_listeners {
                        listener.sensed(contact);
                    }
                }
                ContactState::Began => {
                    let mut enabled = true;
                    for listener in &mut self.contact_listeners {
                        enabled &= listener.begin(contact);
                    }
                    contact.enabled = enabled;
                }
                ContactState::Persisted => {
                    let mut enabled = true;
                    for listener in &mut self.contact_listeners {
                        enabled &= listener.persist(contact);
                    }
                    contact.enabled = enabled;
                }
            }
        }

        for old in &previous {
            if contacts.binary_search_by(|c| c.key.cmp(&old.key)).is_err() {
                for listener in &mut self.contact_listeners {
                    listener.end(old);
                }
            }
        }

        for (contact, state) in contacts.iter_mut().zip(&states) {
            if *state == ContactState::Sleeping || !contact.enabled || contact.sensor {
                continue;
            }
            let mut enabled = true;
            for listener in &mut self.contact_listeners {
                enabled &= listener.pre_solve(contact);
            }
            contact.enabled = enabled;
        }

        self.contacts = contacts;
    }

    /// Body pairs joined by a joint that disables their collision
    fn non_colliding_pairs(&self) -> HashSet<(BodyHandle, BodyHandle)> {
        self.joints()
            .filter(|(_, joint)| !joint.collide_connected)
            .filter_map(|(_, joint)| joint.body_b().map(|b| ordered(joint.body_a(), b)))
            .collect()
    }

    fn solve(&mut self, step: TimeStep) -> Result<()> {
        for slot in &mut self.bodies {
            if let Some(body) = slot.body.as_mut() {
                body.advance_sweep();
            }
        }

        let islands = self.build_islands();
        let settings = self.settings.clone();
        let mut solved = Vec::new();
        let mut results = Vec::with_capacity(islands.len());
        for island in &islands {
            results.push(self.solve_island(island, step, &settings, &mut solved)?);
        }
        // every island passed its checks; only now do bodies move
        for result in results {
            self.finish_island(result, step.dt, &settings);
        }

        solved.sort_unstable();
        for index in solved {
            let contact = &self.contacts[index];
            for listener in &mut self.contact_listeners {
                listener.post_solve(contact);
            }
        }

        // kinematic bodies follow their velocity
        for slot in &mut self.bodies {
            let Some(body) = slot.body.as_mut() else {
                continue;
            };
            if body.is_kinematic() && body.is_active() && body.is_awake() {
                let center = body.world_center() + body.linear_velocity * step.dt;
                let angle = body.angle() + body.angular_velocity * step.dt;
                body.set_sweep_end(center, angle);
            }
        }
        Ok(())
    }

    /// Groups the active dynamic bodies into islands with union-find, wakes
    /// every island that has an awake member and drops the sleeping ones
    fn build_islands(&mut self) -> Vec<Island> {
        let simulated = |body: &Body| body.is_dynamic() && body.is_active();
        let mut parent: Vec<usize> = (0..self.bodies.len()).collect();

        let mut links = Vec::new();
        for contact in self.contacts.iter().filter(|c| is_solvable(c)) {
            links.push(contact.bodies());
        }
        for (_, joint) in self.joints() {
            if let Some(body_b) = joint.body_b() {
                links.push((joint.body_a(), body_b));
            }
        }
        for (a, b) in links {
            if self.body(a).is_some_and(simulated) && self.body(b).is_some_and(simulated) {
                union(&mut parent, a.index(), b.index());
            }
        }

        let mut island_of = vec![usize::MAX; self.bodies.len()];
        let mut islands: Vec<Island> = Vec::new();
        for &handle in &self.body_order {
            if !self.body(handle).is_some_and(simulated) {
                continue;
            }
            let root = find(&mut parent, handle.index());
            if island_of[root] == usize::MAX {
                island_of[root] = islands.len();
                islands.push(Island::default());
            }
            island_of[handle.index()] = island_of[root];
            islands[island_of[root]].bodies.push(handle);
        }

        let island_for = |handles: &[BodyHandle]| {
            handles
                .iter()
                .map(|h| island_of[h.index()])
                .find(|&island| island != usize::MAX)
        };
        for (index, contact) in self.contacts.iter().enumerate() {
            if !is_solvable(contact) {
                continue;
            }
            let (a, b) = contact.bodies();
            if let Some(island) = island_for(&[a, b]) {
                islands[island].contacts.push(index);
            }
        }
        for &handle in &self.joint_order {
            let Some(joint) = self.joint(handle) else {
                continue;
            };
            let bodies: Vec<BodyHandle> = std::iter::once(joint.body_a()).chain(joint.body_b()).collect();
            if let Some(island) = island_for(&bodies) {
                islands[island].joints.push(handle);
            }
        }

        islands.retain(|island| island.bodies.iter().any(|&h| self.body(h).is_some_and(Body::is_awake)));
        for island in &islands {
            for &handle in &island.bodies {
                if let Some(body) = self.body_mut(handle) {
                    if !body.is_awake() {
                        body.wake_up();
                    }
                }
            }
        }
        islands
    }

    fn solve_island(
        &mut self,
        island: &Island,
        step: TimeStep,
        settings: &Settings,
        solved: &mut Vec<usize>,
    ) -> Result<SolvedIsland> {
        let dt = step.dt;

        // island members first, then the bodies they touch through constraints
        let mut handles = Vec::new();
        let mut local: HashMap<BodyHandle, usize> = HashMap::new();
        let mut positions = Vec::new();
        let mut velocities = Vec::new();
        let mut solver_bodies = Vec::new();
        let touched = island
            .bodies
            .iter()
            .copied()
            .chain(island.contacts.iter().flat_map(|&index| {
                let (a, b) = self.contacts[index].bodies();
                [a, b]
            }))
            .chain(
                island
                    .joints
                    .iter()
                    .filter_map(|&handle| self.joint(handle))
                    .flat_map(|joint| std::iter::once(joint.body_a()).chain(joint.body_b())),
            );
        for handle in touched {
            if local.contains_key(&handle) {
                continue;
            }
            let Some(body) = self.body(handle) else {
                continue;
            };
            let index = positions.len();
            local.insert(handle, index);
            handles.push(handle);
            positions.push(Position {
                c: body.world_center(),
                a: body.angle(),
            });
            velocities.push(Velocity {
                v: body.linear_velocity,
                w: body.angular_velocity,
            });
            solver_bodies.push(SolverBody {
                index,
                inv_mass: body.inv_mass(),
                inv_inertia: body.inv_inertia(),
                local_center: body.local_center(),
            });
        }
        let members = island.bodies.len();

        for (handle, velocity) in handles.iter().zip(velocities.iter_mut()).take(members) {
            if let Some(body) = self.body(*handle) {
                integrate_velocity(body, velocity, self.gravity, dt);
            }
        }

        let solver_body = |handle: BodyHandle| local.get(&handle).map(|&index| solver_bodies[index]);
        let joint_bodies: Vec<(JointHandle, SolverBody, SolverBody)> = island
            .joints
            .iter()
            .filter_map(|&handle| {
                let joint = self.joint(handle)?;
                let a = solver_body(joint.body_a())?;
                let b = match joint.body_b() {
                    Some(body_b) => solver_body(body_b)?,
                    None => SolverBody::GROUND,
                };
                Some((handle, a, b))
            })
            .collect();

        let mut data = SolverData {
            step,
            positions: &mut positions,
            velocities: &mut velocities,
            settings,
        };

        self.contact_solver
            .initialize(&self.contacts, &island.contacts, &solver_body, &data);
        self.contact_solver.warm_start(&mut data);
        for (handle, a, b) in &joint_bodies {
            if let Some(joint) = joint_entry(&mut self.joints, *handle) {
                joint.kind_mut().constraint_mut().init_velocity_constraints(a, b, &mut data);
            }
        }

        for _ in 0..settings.velocity_iterations() {
            for (handle, a, b) in &joint_bodies {
                if let Some(joint) = joint_entry(&mut self.joints, *handle) {
                    joint.kind_mut().constraint_mut().solve_velocity_constraints(a, b, &mut data);
                }
            }
            self.contact_solver.solve_velocity(&mut data);
        }

        for (position, velocity) in data.positions.iter_mut().zip(data.velocities.iter_mut()) {
            integrate_position(
                position,
                velocity,
                dt,
                settings.maximum_translation(),
                settings.maximum_rotation(),
            );
        }

        for _ in 0..settings.position_iterations() {
            let contacts_ok = self.contact_solver.solve_position(&mut data);
            let mut joints_ok = true;
            for (handle, a, b) in &joint_bodies {
                if let Some(joint) = joint_entry(&mut self.joints, *handle) {
                    joints_ok &= joint.kind_mut().constraint_mut().solve_position_constraints(a, b, &mut data);
                }
            }
            if contacts_ok && joints_ok {
                break;
            }
        }

        self.contact_solver.store_impulses(&mut self.contacts);
        solved.extend(self.contact_solver.contact_indices());

        for i in 0..members {
            let (p, v) = (positions[i], velocities[i]);
            let finite = p.c.is_finite() && p.a.is_finite() && v.v.is_finite() && v.w.is_finite();
            if !finite || v.v.length_squared() > RUNAWAY_SPEED * RUNAWAY_SPEED {
                log::error!(
                    "numerical instability on body {:?}: position {:?}, velocity {:?}",
                    handles[i],
                    p,
                    v
                );
                return Err(PhysicsError::NumericalInstability { body: handles[i] });
            }
        }

        let (linear, angular) = (settings.sleep_linear_velocity(), settings.sleep_angular_velocity());
        let carried = handles[members..]
            .iter()
            .filter_map(|&handle| self.body(handle))
            .any(|body| body.is_kinematic() && !body.is_slow(linear, angular));

        handles.truncate(members);
        positions.truncate(members);
        velocities.truncate(members);
        Ok(SolvedIsland {
            bodies: handles,
            positions,
            velocities,
            carried,
        })
    }

    /// Writes a solved island back to its bodies and puts it to sleep once
    /// every member has rested long enough
    fn finish_island(&mut self, island: SolvedIsland, dt: f32, settings: &Settings) {
        for ((&handle, position), velocity) in island.bodies.iter().zip(&island.positions).zip(&island.velocities) {
            if let Some(body) = self.body_mut(handle) {
                body.set_sweep_end(position.c, position.a);
                body.linear_velocity = velocity.v;
                body.angular_velocity = velocity.w;
            }
        }

        if !settings.auto_sleep() {
            return;
        }
        let linear = settings.sleep_linear_velocity();
        let angular = settings.sleep_angular_velocity();
        let mut min_sleep_time = f32::MAX;
        for &handle in &island.bodies {
            let Some(body) = self.body_mut(handle) else {
                continue;
            };
            if !body.auto_sleep() || !body.is_slow(linear, angular) {
                body.sleep_time = 0.0;
                min_sleep_time = 0.0;
            } else {
                body.sleep_time += dt;
                min_sleep_time = min_sleep_time.min(body.sleep_time);
            }
        }
        // a moving platform keeps whatever it carries awake
        if island.carried {
            min_sleep_time = 0.0;
        }

        if min_sleep_time >= settings.sleep_time() {
            for &handle in &island.bodies {
                if let Some(body) = self.body_mut(handle) {
                    body.put_to_sleep();
                }
            }
        }
    }

    /// Pulls fast bodies back to their first time of impact so they cannot
    /// tunnel through thin geometry. The body is left sinking into the
    /// obstacle by the linear tolerance, so the next step builds a contact.
    fn solve_continuous(&mut self) {
        let mode = self.settings.continuous_mode();
        let detector = ConservativeAdvancement::from_settings(&self.settings);
        let tolerance = self.settings.linear_tolerance();
        let no_collide = self.non_colliding_pairs();

        let fast: Vec<BodyHandle> = self
            .bodies()
            .filter(|(_, body)| needs_continuous(body, mode))
            .map(|(handle, _)| handle)
            .collect();

        for handle in fast {
            let Some(body) = self.body(handle) else {
                continue;
            };
            let sweep = *body.sweep();
            let Some(swept) = swept_aabb(body) else {
                continue;
            };

            let mut first: Option<(f32, Separation)> = None;
            for key in self.broad_phase.query_aabb(swept) {
                if key.body == handle || no_collide.contains(&ordered(handle, key.body)) {
                    continue;
                }
                let Some(other) = self.body(key.body) else {
                    continue;
                };
                if !other.is_active() || (other.is_dynamic() && !body.bullet) {
                    continue;
                }
                let Some(other_fixture) = other.fixture(key.fixture) else {
                    continue;
                };
                if other_fixture.sensor {
                    continue;
                }
                let other_sweep = Sweep::at_rest(other.transform(), other.local_center());

                for fixture in body.fixtures() {
                    if fixture.sensor || !fixture.filter.allows(&other_fixture.filter) {
                        continue;
                    }
                    let Some(toi) = detector.time_of_impact(
                        fixture.shape(),
                        &sweep,
                        other_fixture.shape(),
                        &other_sweep,
                        0.0,
                        1.0,
                    ) else {
                        continue;
                    };
                    if first.map_or(true, |(time, _)| toi.time < time) {
                        first = Some((toi.time, toi.separation));
                    }
                }
            }

            if let Some((time, separation)) = first {
                if let Some(body) = self.body_mut(handle) {
                    body.clamp_sweep(time);
                    let center = body.world_center() + separation.normal * (separation.distance + tolerance);
                    let angle = body.angle();
                    body.set_sweep_end(center, angle);
                    log::trace!("body {:?} clamped to its time of impact {}", handle, time);
                }
            }
        }
    }

    /// Deactivates the bodies that left the bounds
    fn check_bounds(&mut self) {
        let Some(bounds) = self.bounds.as_deref() else {
            return;
        };
        for &handle in &self.body_order {
            let Some(body) = self.bodies[handle.index()].body.as_mut() else {
                continue;
            };
            if body.is_static() || !body.is_active() {
                continue;
            }
            let Some(aabb) = body.aabb() else {
                continue;
            };
            if bounds.is_outside(aabb) {
                body.set_active(false);
                log::debug!("body {:?} left the world bounds and was deactivated", handle);
                for listener in &mut self.bounds_listeners {
                    listener.outside(handle, body);
                }
            }
        }
    }
}

fn insert_proxies(broad_phase: &mut dyn BroadPhase, handle: BodyHandle, body: &Body, proxies: &mut Vec<FixtureId>) {
    let transform = body.transform();
    for fixture in body.fixtures() {
        broad_phase.insert(FixtureKey::new(handle, fixture.id()), fixture.aabb(transform));
        proxies.push(fixture.id());
    }
}

fn remove_proxies(broad_phase: &mut dyn BroadPhase, handle: BodyHandle, proxies: &mut Vec<FixtureId>) {
    for id in proxies.drain(..) {
        broad_phase.remove(FixtureKey::new(handle, id));
    }
}

fn joint_entry(joints: &mut [JointSlot], handle: JointHandle) -> Option<&mut Joint> {
    joints
        .get_mut(handle.index())
        .filter(|slot| slot.generation == handle.generation())
        .and_then(|slot| slot.joint.as_mut())
}

#[inline]
fn ordered(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Awake and able to move
#[inline]
fn is_moving(body: &Body) -> bool {
    !body.is_static() && body.is_awake()
}

#[inline]
fn is_solvable(contact: &Contact) -> bool {
    contact.enabled && !contact.sensor && !contact.points.is_empty()
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        // the lower slot wins so roots don't depend on link order
        let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[high] = low;
    }
}

/// True if the body moved far enough this step to skip past an obstacle
fn needs_continuous(body: &Body, mode: ContinuousDetectionMode) -> bool {
    let eligible = match mode {
        ContinuousDetectionMode::All => true,
        ContinuousDetectionMode::BulletsOnly => body.bullet,
        ContinuousDetectionMode::None => false,
    };
    if !eligible || !body.is_dynamic() || !body.is_active() || !body.is_awake() {
        return false;
    }
    let Some(aabb) = body.aabb() else {
        return false;
    };

    let sweep = body.sweep();
    let motion = sweep.linear_displacement().length() + body.rotation_radius() * sweep.angular_displacement().abs();
    let size = aabb.size();
    motion > 0.5 * size.x.min(size.y)
}

/// Box around the body at the start and end of the step
fn swept_aabb(body: &Body) -> Option<Aabb> {
    let start = body.sweep().transform_at(0.0);
    let before = body
        .fixtures()
        .iter()
        .map(|fixture| fixture.aabb(start))
        .reduce(Aabb::union)?;
    Some(before.union(body.aabb()?))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::bounds::AxisAlignedBounds;
    use crate::constraints::DistanceJoint;
    use crate::dynamics::{BodyDesc, Fixture};
    use crate::geometry::Shape;

    const DT: f32 = 1.0 / 60.0;

    fn ball(position: Vec2) -> Body {
        BodyDesc::dynamic()
            .with_position(position)
            .build()
            .with_fixture(Fixture::new(Shape::circle(0.5).expect("circle")))
    }

    fn floor() -> Body {
        BodyDesc::fixed()
            .build()
            .with_fixture(Fixture::new(Shape::rectangle(20.0, 1.0).expect("rectangle")))
    }

    #[test]
    fn test_world_creation() {
        let world = World::new();
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.gravity(), DEFAULT_GRAVITY);
    }

    #[test]
    fn test_add_and_remove_body() {
        let mut world = World::new();
        let handle = world.add_body(ball(Vec2::ZERO));
        assert_eq!(world.body_count(), 1);
        assert!(world.body_at(0).is_some());

        assert!(world.remove_body(handle).is_ok());
        assert_eq!(world.body_count(), 0);
        assert!(world.body(handle).is_none());
        assert_eq!(world.remove_body(handle).unwrap_err(), PhysicsError::BodyNotFound(handle));
    }

    #[test]
    fn test_stale_handle_does_not_alias() {
        let mut world = World::new();
        let old = world.add_body(ball(Vec2::ZERO));
        world.remove_body(old).expect("remove");
        let new = world.add_body(ball(Vec2::new(3.0, 0.0)));

        assert_eq!(old.index(), new.index());
        assert!(world.body(old).is_none());
        assert!(world.body(new).is_some());
    }

    #[test]
    fn test_gravity_simulation() {
        let mut world = World::new();
        let handle = world.add_body(ball(Vec2::new(0.0, 10.0)));

        for _ in 0..60 {
            world.step(DT).expect("step");
        }

        // semi-implicit Euler: y = 10 - g dt^2 (1 + 2 + ... + 60)
        let y = world.body(handle).expect("body").position().y;
        assert!((y - 5.0183).abs() < 0.01, "y = {}", y);
    }

    #[test]
    fn test_ball_comes_to_rest_on_floor() {
        let mut world = World::new();
        world.add_body(floor());
        let handle = world.add_body(ball(Vec2::new(0.0, 3.0)));

        for _ in 0..300 {
            world.step(DT).expect("step");
        }

        // floor top at 0.5, ball radius 0.5
        let body = world.body(handle).expect("body");
        let y = body.position().y;
        assert!(y > 0.95 && y < 1.02, "ball at y = {}", y);
        assert!(!body.is_awake());
        assert_eq!(world.contact_count(), 1);
    }

    #[test]
    fn test_invalid_time_step() {
        let mut world = World::new();
        assert!(matches!(world.step(0.0), Err(PhysicsError::InvalidTimeStep { .. })));
        assert!(world.step(f32::NAN).is_err());
        assert!(world.update(-1.0).is_err());
    }

    #[test]
    fn test_instability_leaves_bodies_in_place() {
        let mut world = World::new();
        let calm = world.add_body(ball(Vec2::new(0.0, 5.0)));
        let broken = world.add_body(ball(Vec2::new(10.0, 5.0)));
        world.body_mut(calm).expect("calm").apply_force(Vec2::new(1.0, 0.0));
        world
            .body_mut(broken)
            .expect("broken")
            .set_linear_velocity(Vec2::new(f32::NAN, 0.0));

        let result = world.step(DT);
        assert!(matches!(result, Err(PhysicsError::NumericalInstability { body }) if body == broken));

        // the calm island solved first but was never written back
        let body = world.body(calm).expect("calm");
        assert_eq!(body.position(), Vec2::new(0.0, 5.0));
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
        assert_eq!(body.force(), Vec2::new(1.0, 0.0));
        assert_eq!(world.step_count(), 0);
    }

    #[test]
    fn test_update_runs_fixed_steps() {
        let mut world = World::new();
        assert_eq!(world.update(0.04).expect("update"), 2);
        assert_eq!(world.update(0.02).expect("update"), 1);
        assert_eq!(world.step_count(), 3);
    }

    #[test]
    fn test_joint_validation() {
        let mut world = World::new();
        let a = world.add_body(ball(Vec2::ZERO));
        let b = world.add_body(ball(Vec2::new(2.0, 0.0)));
        let joint = DistanceJoint::new(
            world.body(a).expect("a"),
            world.body(b).expect("b"),
            Vec2::ZERO,
            Vec2::new(2.0, 0.0),
        )
        .expect("distance");

        assert!(matches!(
            world.add_joint(Joint::new(a, a, joint.clone())),
            Err(PhysicsError::InvalidJoint { .. })
        ));

        let missing = BodyHandle::new(7, 0);
        assert_eq!(
            world.add_joint(Joint::new(a, missing, joint.clone())).unwrap_err(),
            PhysicsError::BodyNotFound(missing)
        );

        let handle = world.add_joint(Joint::new(a, b, joint)).expect("joint");
        assert!(world.joint(handle).is_some());
        assert_eq!(world.joint_count(), 1);
    }

    #[test]
    fn test_remove_body_removes_joints() {
        let mut world = World::new();
        let a = world.add_body(ball(Vec2::ZERO));
        let b = world.add_body(ball(Vec2::new(2.0, 0.0)));
        let joint = DistanceJoint::new(
            world.body(a).expect("a"),
            world.body(b).expect("b"),
            Vec2::ZERO,
            Vec2::new(2.0, 0.0),
        )
        .expect("distance");
        let handle = world.add_joint(Joint::new(a, b, joint)).expect("joint");

        world.remove_body(b).expect("remove");
        assert_eq!(world.joint_count(), 0);
        assert!(world.joint(handle).is_none());
        assert_eq!(
            world.remove_joint(handle).unwrap_err(),
            PhysicsError::JointNotFound(handle)
        );
    }

    struct Recorder(Rc<RefCell<Vec<BodyHandle>>>);

    impl BoundsListener for Recorder {
        fn outside(&mut self, body: BodyHandle, _state: &Body) {
            self.0.borrow_mut().push(body);
        }
    }

    #[test]
    fn test_bodies_leaving_bounds_are_deactivated() {
        let mut world = World::new();
        world.set_gravity(Vec2::ZERO);
        world.set_bounds(AxisAlignedBounds::new(10.0, 10.0));
        let left = Rc::new(RefCell::new(Vec::new()));
        world.add_bounds_listener(Recorder(left.clone()));

        let mut body = ball(Vec2::ZERO);
        body.linear_velocity = Vec2::new(60.0, 0.0);
        let handle = world.add_body(body);

        for _ in 0..20 {
            world.step(DT).expect("step");
        }

        assert_eq!(left.borrow().as_slice(), &[handle]);
        let body = world.body(handle).expect("body");
        assert!(!body.is_active());
        let x = body.position().x;

        world.step(DT).expect("step");
        assert_eq!(world.body(handle).expect("body").position().x, x);
    }

    #[test]
    fn test_ray_cast_sorted_by_distance() {
        let mut world = World::new();
        let mut handles = Vec::new();
        for x in [8.0, 2.0, 5.0] {
            let body = BodyDesc::fixed()
                .with_position(Vec2::new(x, 0.0))
                .build()
                .with_fixture(Fixture::new(Shape::circle(0.5).expect("circle")));
            handles.push(world.add_body(body));
        }

        let hits = world.ray_cast(Ray::new(Vec2::ZERO, Vec2::X), 10.0);
        let distances: Vec<f32> = hits.iter().map(|hit| hit.distance).collect();
        assert_eq!(hits.len(), 3);
        assert!((distances[0] - 1.5).abs() < 1e-4);
        assert!((distances[1] - 4.5).abs() < 1e-4);
        assert!((distances[2] - 7.5).abs() < 1e-4);
        assert_eq!(hits[0].body, handles[1]);

        assert_eq!(world.ray_cast(Ray::new(Vec2::ZERO, Vec2::X), 3.0).len(), 1);
    }
}
