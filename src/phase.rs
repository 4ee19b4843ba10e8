//! Global phase scalars and the slow step-parameter easing.
//!
//! Four blend weights progress independently, each by exponential smoothing
//! toward a goal derived from the host input:
//!
//! | Scalar | Goal | Used for |
//! |--------|------|----------|
//! | `line_to_circle` | step >= 2 | line layout to orbiting ring |
//! | `shape` | name non-empty | inner morphing shape |
//! | `final_sphere` | complete | completion sphere |
//! | `pulse` | impulse on progress | size and charge boost |
//!
//! With a rate in (0, 1] smoothing never overshoots its goal, so a goal held
//! at 0 or 1 keeps every scalar inside [0, 1].

use crate::config::{PhaseRates, StepConfig, StepTable};
use glam::Quat;

/// `value + (goal - value) * rate`.
#[inline]
pub fn smooth_toward(value: f32, goal: f32, rate: f32) -> f32 {
    value + (goal - value) * rate
}

/// Goals for one tick, read from the host input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseGoals {
    pub circle: bool,
    pub shape: bool,
    pub complete: bool,
    /// Clamped form progress.
    pub form_progress: f32,
}

/// Snapshot of the four blend weights.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseLevels {
    pub line_to_circle: f32,
    pub shape: f32,
    pub final_sphere: f32,
    pub pulse: f32,
}

/// Step parameters eased toward the active step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    pub radius: f32,
    pub breathe: f32,
    pub orbit_speed: f32,
}

/// Tracks the phase scalars across ticks.
#[derive(Debug, Clone)]
pub struct PhaseController {
    levels: PhaseLevels,
    params: StepParams,
    prev_progress: Option<f32>,
}

impl PhaseController {
    /// Start at rest on the first step.
    pub fn new(steps: &StepTable) -> Self {
        let (first, _) = steps.resolve(1);
        Self {
            levels: PhaseLevels::default(),
            params: StepParams {
                radius: first.radius,
                breathe: first.breathe,
                orbit_speed: first.orbit_speed_multiplier,
            },
            prev_progress: None,
        }
    }

    /// Current blend weights.
    pub fn levels(&self) -> PhaseLevels {
        self.levels
    }

    /// Current eased step parameters.
    pub fn params(&self) -> StepParams {
        self.params
    }

    /// Restart shape convergence from zero.
    pub fn reset_shape(&mut self) {
        self.levels.shape = 0.0;
    }

    /// Advance every scalar by one tick.
    pub fn update(&mut self, step: &StepConfig, goals: PhaseGoals, rates: &PhaseRates) {
        let progress = goals.form_progress;

        // Impulse on a rise since the last tick, then slow decay
        if let Some(prev) = self.prev_progress {
            if progress > prev + rates.pulse_threshold {
                self.levels.pulse = (self.levels.pulse + rates.pulse_impulse).min(1.0);
            }
        }
        self.prev_progress = Some(progress);
        self.levels.pulse *= rates.pulse_decay;

        let target_radius = step.radius + progress * 12.0;
        let target_orbit = step.orbit_speed_multiplier * (1.0 + progress * 0.2);
        self.params.radius = smooth_toward(self.params.radius, target_radius, rates.step_params);
        self.params.breathe = smooth_toward(self.params.breathe, step.breathe, rates.step_params);
        self.params.orbit_speed = smooth_toward(self.params.orbit_speed, target_orbit, rates.step_params);

        self.levels.shape = smooth_toward(self.levels.shape, goal(goals.shape), rates.shape);
        self.levels.final_sphere = smooth_toward(self.levels.final_sphere, goal(goals.complete), rates.final_sphere);
        self.levels.line_to_circle =
            smooth_toward(self.levels.line_to_circle, goal(goals.circle), rates.line_to_circle);
    }
}

#[inline]
fn goal(flag: bool) -> f32 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// Rotation applied to the morph shape and the completion sphere.
///
/// Yaw turns linearly with time; pitch rocks on a slow sine.
pub fn shape_rotation(elapsed: f32) -> Quat {
    let yaw = elapsed * 0.15;
    let pitch = (elapsed * 0.08).sin() * 0.3;
    Quat::from_rotation_x(pitch) * Quat::from_rotation_y(yaw)
}

/// Ease-out cubic.
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Ease-out quartic.
#[inline]
pub fn ease_out_quart(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(4)
}

/// Progress `global` as seen by a particle that starts `delay` late.
#[inline]
pub fn delayed_progress(global: f32, delay: f32) -> f32 {
    ((global - delay).max(0.0) / (1.0 - delay + 0.001)).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn goals(circle: bool, shape: bool, complete: bool, form_progress: f32) -> PhaseGoals {
        PhaseGoals {
            circle,
            shape,
            complete,
            form_progress,
        }
    }

    #[test]
    fn test_smoothing_converges_without_overshoot() {
        let steps = StepTable::default();
        let rates = PhaseRates::default();
        let mut phase = PhaseController::new(&steps);
        let (step, _) = steps.resolve(2);

        // 0.006 is the slowest rate: (1 - 0.006)^n <= 0.01 needs n ~ 766
        for _ in 0..800 {
            phase.update(step, goals(true, true, true, 0.0), &rates);
            let l = phase.levels();
            for v in [l.line_to_circle, l.shape, l.final_sphere] {
                assert!((0.0..=1.0).contains(&v));
            }
        }
        let l = phase.levels();
        assert!(l.line_to_circle >= 0.99);
        assert!(l.shape >= 0.99);
        assert!(l.final_sphere >= 0.99);
    }

    #[test]
    fn test_pulse_fires_on_progress_rise() {
        let steps = StepTable::default();
        let rates = PhaseRates::default();
        let mut phase = PhaseController::new(&steps);
        let (step, _) = steps.resolve(1);

        phase.update(step, goals(false, false, false, 0.0), &rates);
        assert_eq!(phase.levels().pulse, 0.0);

        phase.update(step, goals(false, false, false, 0.3), &rates);
        assert!((phase.levels().pulse - 0.4 * 0.985).abs() < 1e-6);

        // Unchanged progress only decays
        let before = phase.levels().pulse;
        phase.update(step, goals(false, false, false, 0.3), &rates);
        assert!(phase.levels().pulse < before);

        // Never exceeds 1
        for i in 0..10 {
            phase.update(step, goals(false, false, false, 0.3 + 0.05 * (i + 1) as f32), &rates);
            assert!(phase.levels().pulse <= 1.0);
        }
    }

    #[test]
    fn test_first_tick_has_no_pulse() {
        let steps = StepTable::default();
        let mut phase = PhaseController::new(&steps);
        let (step, _) = steps.resolve(1);
        phase.update(step, goals(false, false, false, 0.9), &PhaseRates::default());
        assert_eq!(phase.levels().pulse, 0.0);
    }

    #[test]
    fn test_reset_shape() {
        let steps = StepTable::default();
        let rates = PhaseRates::default();
        let mut phase = PhaseController::new(&steps);
        let (step, _) = steps.resolve(3);
        for _ in 0..100 {
            phase.update(step, goals(true, true, false, 0.0), &rates);
        }
        assert!(phase.levels().shape > 0.3);
        phase.reset_shape();
        assert_eq!(phase.levels().shape, 0.0);
    }

    #[test]
    fn test_step_radius_eases() {
        let steps = StepTable::default();
        let rates = PhaseRates::default();
        let mut phase = PhaseController::new(&steps);
        assert_eq!(phase.params().radius, 55.0);
        let (step, _) = steps.resolve(2);
        phase.update(step, goals(true, false, false, 0.0), &rates);
        let r = phase.params().radius;
        assert!(r > 55.0 && r < 120.0);
    }

    #[test]
    fn test_rotation_matches_yaw_then_pitch() {
        let t = 3.0;
        let q = shape_rotation(t);
        let v = Vec3::new(1.0, 2.0, 3.0);
        let (ry, rx) = (t * 0.15, (t * 0.08).sin() * 0.3);

        let x1 = v.x * ry.cos() + v.z * ry.sin();
        let z1 = -v.x * ry.sin() + v.z * ry.cos();
        let expected = Vec3::new(x1, v.y * rx.cos() - z1 * rx.sin(), v.y * rx.sin() + z1 * rx.cos());
        assert!((q * v - expected).length() < 1e-4);
    }

    #[test]
    fn test_delayed_progress() {
        assert_eq!(delayed_progress(0.2, 0.3), 0.0);
        assert_eq!(delayed_progress(1.0, 0.0), 1.0_f32.min(1.0 / 1.001));
        assert!(delayed_progress(1.0, 0.3) > 0.99);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_quart(0.0), 0.0);
    }
}
