//! Time of impact for fast moving shapes.
//!
//! Conservative advancement: at each iteration the shapes are separated by
//! `d`, and no point of either shape can close that gap faster than the
//! relative linear speed along the normal plus the rotation bound
//! `radius * |angular displacement|`. Advancing time by `d / bound` therefore
//! never steps past the first contact.

use crate::dynamics::Sweep;
use crate::geometry::Shape;
use crate::settings::Settings;

use super::narrow_phase::{DistanceDetector, Gjk, Separation};

/// First contact between two sweeps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeOfImpact {
    /// Fraction of the step, in `[0, 1]`
    pub time: f32,
    /// Separation at `time`; the distance is at most the solver tolerance
    pub separation: Separation,
}

/// Finds the first time two swept shapes come within tolerance
pub trait TimeOfImpactDetector {
    /// Searches `[t1, t2]` of the sweeps. Returns `None` if the shapes
    /// already overlap at `t1`, move apart, or don't meet before `t2`.
    fn time_of_impact(
        &self,
        shape_a: &Shape,
        sweep_a: &Sweep,
        shape_b: &Shape,
        sweep_b: &Sweep,
        t1: f32,
        t2: f32,
    ) -> Option<TimeOfImpact>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConservativeAdvancement {
    distance: Gjk,
    max_iterations: usize,
    tolerance: f32,
}

impl Default for ConservativeAdvancement {
    fn default() -> Self {
        Self::new(Gjk::default(), 30, 0.005)
    }
}

impl ConservativeAdvancement {
    /// `tolerance` is the separation at which the shapes count as touching
    pub fn new(distance: Gjk, max_iterations: usize, tolerance: f32) -> Self {
        Self {
            distance,
            max_iterations: max_iterations.max(1),
            tolerance: tolerance.max(f32::EPSILON),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Gjk::from_settings(settings),
            settings.toi_max_iterations(),
            settings.linear_tolerance(),
        )
    }

    #[inline]
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }
}

impl TimeOfImpactDetector for ConservativeAdvancement {
    fn time_of_impact(
        &self,
        shape_a: &Shape,
        sweep_a: &Sweep,
        shape_b: &Shape,
        sweep_b: &Sweep,
        t1: f32,
        t2: f32,
    ) -> Option<TimeOfImpact> {
        let relative_motion = sweep_b.linear_displacement() - sweep_a.linear_displacement();
        let angular_bound = shape_a.rotation_radius(sweep_a.local_center) * sweep_a.angular_displacement().abs()
            + shape_b.rotation_radius(sweep_b.local_center) * sweep_b.angular_displacement().abs();
        // aim below the tolerance so each iteration makes real progress
        let target = 0.5 * self.tolerance;

        let mut t = t1;
        for _ in 0..self.max_iterations {
            let separation = self.distance.distance(
                shape_a,
                sweep_a.transform_at(t),
                shape_b,
                sweep_b.transform_at(t),
            )?;

            if separation.distance <= self.tolerance {
                return Some(TimeOfImpact { time: t, separation });
            }

            let closing_speed = angular_bound - relative_motion.dot(separation.normal);
            if closing_speed <= 0.0 {
                return None;
            }

            t += (separation.distance - target) / closing_speed;
            if t >= t2 {
                return None;
            }
        }

        log::trace!("time of impact hit the iteration cap of {}", self.max_iterations);
        // every advance was conservative, so `t` is still before contact
        let separation = self.distance.distance(
            shape_a,
            sweep_a.transform_at(t),
            shape_b,
            sweep_b.transform_at(t),
        )?;
        Some(TimeOfImpact { time: t, separation })
    }
}
