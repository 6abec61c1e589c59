//! Simulation settings.
//!
//! `Settings` is a plain value owned by the world. Every setter validates its
//! input, so a `Settings` value is always internally consistent. With the
//! `serde` feature, deserialized settings go through the same validation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};

/// Which bodies get time-of-impact checks after integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContinuousDetectionMode {
    /// Every dynamic body against static and kinematic bodies, bullets
    /// against dynamic bodies as well
    #[default]
    All,
    /// Only bodies flagged as bullets
    BulletsOnly,
    /// No continuous detection
    None,
}

/// Broad-phase strategy, chosen when the world is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BroadPhaseKind {
    /// O(n^2) reference implementation
    BruteForce,
    /// Sorted intervals on the x axis
    SweepAndPrune,
    /// Dynamic AABB tree
    #[default]
    DynamicTree,
}

/// Narrow-phase strategy, chosen when the world is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NarrowPhaseKind {
    /// GJK overlap test with EPA penetration
    #[default]
    Gjk,
    /// Separating axis test
    Sat,
}

/// Manifold strategy, chosen when the world is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ManifoldSolverKind {
    /// Reference/incident edge clipping
    #[default]
    Clipping,
}

/// Solver, sleeping and collision tuning.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "RawSettings", into = "RawSettings")
)]
pub struct Settings {
    step_frequency: f32,
    maximum_translation: f32,
    maximum_rotation: f32,
    maximum_linear_correction: f32,
    maximum_angular_correction: f32,
    velocity_iterations: usize,
    position_iterations: usize,
    baumgarte: f32,
    warm_start_distance: f32,
    linear_tolerance: f32,
    angular_tolerance: f32,
    restitution_velocity: f32,
    sleep_time: f32,
    sleep_linear_velocity: f32,
    sleep_angular_velocity: f32,
    auto_sleep: bool,
    warm_starting: bool,
    continuous_mode: ContinuousDetectionMode,
    broad_phase: BroadPhaseKind,
    narrow_phase: NarrowPhaseKind,
    manifold_solver: ManifoldSolverKind,
    gjk_max_iterations: usize,
    gjk_distance_epsilon: f32,
    epa_max_iterations: usize,
    epa_epsilon: f32,
    toi_max_iterations: usize,
    broad_phase_margin: f32,
    displacement_multiplier: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            step_frequency: 60.0,
            maximum_translation: 2.0,
            maximum_rotation: 0.5 * std::f32::consts::PI,
            maximum_linear_correction: 0.2,
            maximum_angular_correction: 8.0f32.to_radians(),
            velocity_iterations: 10,
            position_iterations: 10,
            baumgarte: 0.2,
            warm_start_distance: 0.01,
            linear_tolerance: 0.005,
            angular_tolerance: 2.0f32.to_radians(),
            restitution_velocity: 1.0,
            sleep_time: 0.5,
            sleep_linear_velocity: 0.01,
            sleep_angular_velocity: 2.0f32.to_radians(),
            auto_sleep: true,
            warm_starting: true,
            continuous_mode: ContinuousDetectionMode::All,
            broad_phase: BroadPhaseKind::DynamicTree,
            narrow_phase: NarrowPhaseKind::Gjk,
            manifold_solver: ManifoldSolverKind::Clipping,
            gjk_max_iterations: 100,
            gjk_distance_epsilon: 1e-6,
            epa_max_iterations: 100,
            epa_epsilon: 1e-4,
            toi_max_iterations: 30,
            broad_phase_margin: 0.1,
            displacement_multiplier: 2.0,
        }
    }
}

fn positive(name: &'static str, value: f32) -> Result<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidSetting {
            name,
            reason: "must be a positive finite number",
        })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<f32> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidSetting {
            name,
            reason: "must be a non-negative finite number",
        })
    }
}

fn at_least_one(name: &'static str, value: usize) -> Result<usize> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidSetting {
            name,
            reason: "must be at least 1",
        })
    }
}

impl Settings {
    /// Creates the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed steps per second used by `World::update`
    #[inline]
    pub fn step_frequency(&self) -> f32 {
        self.step_frequency
    }

    /// Duration of one fixed step
    #[inline]
    pub fn step_duration(&self) -> f32 {
        1.0 / self.step_frequency
    }

    pub fn set_step_frequency(&mut self, hz: f32) -> Result<()> {
        self.step_frequency = positive("step_frequency", hz)?;
        Ok(())
    }

    /// Maximum distance a body may travel in one step
    #[inline]
    pub fn maximum_translation(&self) -> f32 {
        self.maximum_translation
    }

    pub fn set_maximum_translation(&mut self, value: f32) -> Result<()> {
        self.maximum_translation = positive("maximum_translation", value)?;
        Ok(())
    }

    /// Maximum angle a body may turn in one step, in radians
    #[inline]
    pub fn maximum_rotation(&self) -> f32 {
        self.maximum_rotation
    }

    pub fn set_maximum_rotation(&mut self, value: f32) -> Result<()> {
        self.maximum_rotation = positive("maximum_rotation", value)?;
        Ok(())
    }

    #[inline]
    pub fn maximum_linear_correction(&self) -> f32 {
        self.maximum_linear_correction
    }

    pub fn set_maximum_linear_correction(&mut self, value: f32) -> Result<()> {
        self.maximum_linear_correction = positive("maximum_linear_correction", value)?;
        Ok(())
    }

    #[inline]
    pub fn maximum_angular_correction(&self) -> f32 {
        self.maximum_angular_correction
    }

    pub fn set_maximum_angular_correction(&mut self, value: f32) -> Result<()> {
        self.maximum_angular_correction = positive("maximum_angular_correction", value)?;
        Ok(())
    }

    #[inline]
    pub fn velocity_iterations(&self) -> usize {
        self.velocity_iterations
    }

    pub fn set_velocity_iterations(&mut self, iterations: usize) -> Result<()> {
        self.velocity_iterations = at_least_one("velocity_iterations", iterations)?;
        Ok(())
    }

    #[inline]
    pub fn position_iterations(&self) -> usize {
        self.position_iterations
    }

    pub fn set_position_iterations(&mut self, iterations: usize) -> Result<()> {
        self.position_iterations = at_least_one("position_iterations", iterations)?;
        Ok(())
    }

    /// Fraction of the position error corrected per position iteration
    #[inline]
    pub fn baumgarte(&self) -> f32 {
        self.baumgarte
    }

    pub fn set_baumgarte(&mut self, value: f32) -> Result<()> {
        let value = positive("baumgarte", value)?;
        if value > 1.0 {
            return Err(PhysicsError::InvalidSetting {
                name: "baumgarte",
                reason: "must not exceed 1",
            });
        }
        self.baumgarte = value;
        Ok(())
    }

    /// Distance within which a distance-matched contact point inherits the
    /// previous step's impulses
    #[inline]
    pub fn warm_start_distance(&self) -> f32 {
        self.warm_start_distance
    }

    pub fn set_warm_start_distance(&mut self, value: f32) -> Result<()> {
        self.warm_start_distance = non_negative("warm_start_distance", value)?;
        Ok(())
    }

    /// Allowed penetration
    #[inline]
    pub fn linear_tolerance(&self) -> f32 {
        self.linear_tolerance
    }

    pub fn set_linear_tolerance(&mut self, value: f32) -> Result<()> {
        self.linear_tolerance = positive("linear_tolerance", value)?;
        Ok(())
    }

    /// Allowed joint angle error, in radians
    #[inline]
    pub fn angular_tolerance(&self) -> f32 {
        self.angular_tolerance
    }

    pub fn set_angular_tolerance(&mut self, value: f32) -> Result<()> {
        self.angular_tolerance = positive("angular_tolerance", value)?;
        Ok(())
    }

    /// Approach speed below which contacts do not bounce
    #[inline]
    pub fn restitution_velocity(&self) -> f32 {
        self.restitution_velocity
    }

    pub fn set_restitution_velocity(&mut self, value: f32) -> Result<()> {
        self.restitution_velocity = non_negative("restitution_velocity", value)?;
        Ok(())
    }

    /// Seconds a body must stay slow before it sleeps
    #[inline]
    pub fn sleep_time(&self) -> f32 {
        self.sleep_time
    }

    pub fn set_sleep_time(&mut self, value: f32) -> Result<()> {
        self.sleep_time = non_negative("sleep_time", value)?;
        Ok(())
    }

    #[inline]
    pub fn sleep_linear_velocity(&self) -> f32 {
        self.sleep_linear_velocity
    }

    pub fn set_sleep_linear_velocity(&mut self, value: f32) -> Result<()> {
        self.sleep_linear_velocity = non_negative("sleep_linear_velocity", value)?;
        Ok(())
    }

    /// In radians per second
    #[inline]
    pub fn sleep_angular_velocity(&self) -> f32 {
        self.sleep_angular_velocity
    }

    pub fn set_sleep_angular_velocity(&mut self, value: f32) -> Result<()> {
        self.sleep_angular_velocity = non_negative("sleep_angular_velocity", value)?;
        Ok(())
    }

    #[inline]
    pub fn auto_sleep(&self) -> bool {
        self.auto_sleep
    }

    pub fn set_auto_sleep(&mut self, enabled: bool) {
        self.auto_sleep = enabled;
    }

    #[inline]
    pub fn warm_starting(&self) -> bool {
        self.warm_starting
    }

    pub fn set_warm_starting(&mut self, enabled: bool) {
        self.warm_starting = enabled;
    }

    #[inline]
    pub fn continuous_mode(&self) -> ContinuousDetectionMode {
        self.continuous_mode
    }

    pub fn set_continuous_mode(&mut self, mode: ContinuousDetectionMode) {
        self.continuous_mode = mode;
    }

    #[inline]
    pub fn broad_phase(&self) -> BroadPhaseKind {
        self.broad_phase
    }

    /// Only read when a world is created
    pub fn set_broad_phase(&mut self, kind: BroadPhaseKind) {
        self.broad_phase = kind;
    }

    #[inline]
    pub fn narrow_phase(&self) -> NarrowPhaseKind {
        self.narrow_phase
    }

    /// Only read when a world is created
    pub fn set_narrow_phase(&mut self, kind: NarrowPhaseKind) {
        self.narrow_phase = kind;
    }

    #[inline]
    pub fn manifold_solver(&self) -> ManifoldSolverKind {
        self.manifold_solver
    }

    /// Only read when a world is created
    pub fn set_manifold_solver(&mut self, kind: ManifoldSolverKind) {
        self.manifold_solver = kind;
    }

    #[inline]
    pub fn gjk_max_iterations(&self) -> usize {
        self.gjk_max_iterations
    }

    /// Values below 5 are raised to 5 by the detector
    pub fn set_gjk_max_iterations(&mut self, iterations: usize) -> Result<()> {
        self.gjk_max_iterations = at_least_one("gjk_max_iterations", iterations)?;
        Ok(())
    }

    #[inline]
    pub fn gjk_distance_epsilon(&self) -> f32 {
        self.gjk_distance_epsilon
    }

    pub fn set_gjk_distance_epsilon(&mut self, value: f32) -> Result<()> {
        self.gjk_distance_epsilon = positive("gjk_distance_epsilon", value)?;
        Ok(())
    }

    #[inline]
    pub fn epa_max_iterations(&self) -> usize {
        self.epa_max_iterations
    }

    pub fn set_epa_max_iterations(&mut self, iterations: usize) -> Result<()> {
        self.epa_max_iterations = at_least_one("epa_max_iterations", iterations)?;
        Ok(())
    }

    #[inline]
    pub fn epa_epsilon(&self) -> f32 {
        self.epa_epsilon
    }

    pub fn set_epa_epsilon(&mut self, value: f32) -> Result<()> {
        self.epa_epsilon = positive("epa_epsilon", value)?;
        Ok(())
    }

    #[inline]
    pub fn toi_max_iterations(&self) -> usize {
        self.toi_max_iterations
    }

    pub fn set_toi_max_iterations(&mut self, iterations: usize) -> Result<()> {
        self.toi_max_iterations = at_least_one("toi_max_iterations", iterations)?;
        Ok(())
    }

    /// Margin added around broad-phase boxes
    #[inline]
    pub fn broad_phase_margin(&self) -> f32 {
        self.broad_phase_margin
    }

    pub fn set_broad_phase_margin(&mut self, value: f32) -> Result<()> {
        self.broad_phase_margin = non_negative("broad_phase_margin", value)?;
        Ok(())
    }

    /// How far broad-phase boxes are stretched along the last displacement
    #[inline]
    pub fn displacement_multiplier(&self) -> f32 {
        self.displacement_multiplier
    }

    pub fn set_displacement_multiplier(&mut self, value: f32) -> Result<()> {
        self.displacement_multiplier = non_negative("displacement_multiplier", value)?;
        Ok(())
    }
}

/// Unvalidated mirror of [`Settings`] used at the serialization boundary
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawSettings {
    step_frequency: f32,
    maximum_translation: f32,
    maximum_rotation: f32,
    maximum_linear_correction: f32,
    maximum_angular_correction: f32,
    velocity_iterations: usize,
    position_iterations: usize,
    baumgarte: f32,
    warm_start_distance: f32,
    linear_tolerance: f32,
    angular_tolerance: f32,
    restitution_velocity: f32,
    sleep_time: f32,
    sleep_linear_velocity: f32,
    sleep_angular_velocity: f32,
    auto_sleep: bool,
    warm_starting: bool,
    continuous_mode: ContinuousDetectionMode,
    broad_phase: BroadPhaseKind,
    narrow_phase: NarrowPhaseKind,
    manifold_solver: ManifoldSolverKind,
    gjk_max_iterations: usize,
    gjk_distance_epsilon: f32,
    epa_max_iterations: usize,
    epa_epsilon: f32,
    toi_max_iterations: usize,
    broad_phase_margin: f32,
    displacement_multiplier: f32,
}

#[cfg(feature = "serde")]
impl Default for RawSettings {
    fn default() -> Self {
        Settings::default().into()
    }
}

#[cfg(feature = "serde")]
impl From<Settings> for RawSettings {
    fn from(s: Settings) -> Self {
        Self {
            step_frequency: s.step_frequency,
            maximum_translation: s.maximum_translation,
            maximum_rotation: s.maximum_rotation,
            maximum_linear_correction: s.maximum_linear_correction,
            maximum_angular_correction: s.maximum_angular_correction,
            velocity_iterations: s.velocity_iterations,
            position_iterations: s.position_iterations,
            baumgarte: s.baumgarte,
            warm_start_distance: s.warm_start_distance,
            linear_tolerance: s.linear_tolerance,
            angular_tolerance: s.angular_tolerance,
            restitution_velocity: s.restitution_velocity,
            sleep_time: s.sleep_time,
            sleep_linear_velocity: s.sleep_linear_velocity,
            sleep_angular_velocity: s.sleep_angular_velocity,
            auto_sleep: s.auto_sleep,
            warm_starting: s.warm_starting,
            continuous_mode: s.continuous_mode,
            broad_phase: s.broad_phase,
            narrow_phase: s.narrow_phase,
            manifold_solver: s.manifold_solver,
            gjk_max_iterations: s.gjk_max_iterations,
            gjk_distance_epsilon: s.gjk_distance_epsilon,
            epa_max_iterations: s.epa_max_iterations,
            epa_epsilon: s.epa_epsilon,
            toi_max_iterations: s.toi_max_iterations,
            broad_phase_margin: s.broad_phase_margin,
            displacement_multiplier: s.displacement_multiplier,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<RawSettings> for Settings {
    type Error = PhysicsError;

    fn try_from(raw: RawSettings) -> Result<Self> {
        let mut s = Settings::default();
        s.set_step_frequency(raw.step_frequency)?;
        s.set_maximum_translation(raw.maximum_translation)?;
        s.set_maximum_rotation(raw.maximum_rotation)?;
        s.set_maximum_linear_correction(raw.maximum_linear_correction)?;
        s.set_maximum_angular_correction(raw.maximum_angular_correction)?;
        s.set_velocity_iterations(raw.velocity_iterations)?;
        s.set_position_iterations(raw.position_iterations)?;
        s.set_baumgarte(raw.baumgarte)?;
        s.set_warm_start_distance(raw.warm_start_distance)?;
        s.set_linear_tolerance(raw.linear_tolerance)?;
        s.set_angular_tolerance(raw.angular_tolerance)?;
        s.set_restitution_velocity(raw.restitution_velocity)?;
        s.set_sleep_time(raw.sleep_time)?;
        s.set_sleep_linear_velocity(raw.sleep_linear_velocity)?;
        s.set_sleep_angular_velocity(raw.sleep_angular_velocity)?;
        s.set_auto_sleep(raw.auto_sleep);
        s.set_warm_starting(raw.warm_starting);
        s.set_continuous_mode(raw.continuous_mode);
        s.set_broad_phase(raw.broad_phase);
        s.set_narrow_phase(raw.narrow_phase);
        s.set_manifold_solver(raw.manifold_solver);
        s.set_gjk_max_iterations(raw.gjk_max_iterations)?;
        s.set_gjk_distance_epsilon(raw.gjk_distance_epsilon)?;
        s.set_epa_max_iterations(raw.epa_max_iterations)?;
        s.set_epa_epsilon(raw.epa_epsilon)?;
        s.set_toi_max_iterations(raw.toi_max_iterations)?;
        s.set_broad_phase_margin(raw.broad_phase_margin)?;
        s.set_displacement_multiplier(raw.displacement_multiplier)?;
        Ok(s)
    }
}
