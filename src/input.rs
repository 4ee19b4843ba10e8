//! Per-tick inputs from the host application.
//!
//! The host owns the wizard state and hands a [`FrameInput`] to the
//! simulation every frame. Transitions (a name appearing, processing
//! starting) are found by comparing against the previous tick's
//! [`InputSnapshot`] rather than by callbacks.
//!
//! ```ignore
//! let mut input = FrameInput::default();
//! input.onboarding_step = 2;
//! input.assistant_name = "Ada".into();
//! sim.tick(&input, elapsed);
//! ```

use crate::events::SpikeEvent;
use serde::{Deserialize, Serialize};

/// Everything the simulation reads from the host in one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameInput {
    /// Current wizard step (1-based). Unknown steps behave like step 1.
    pub onboarding_step: u32,
    /// A non-empty (after trimming) name starts shape convergence.
    pub assistant_name: String,
    /// Gates the processing size pulse.
    pub is_processing: bool,
    /// Drives convergence into the completion sphere.
    pub is_complete: bool,
    /// Cosmetic only.
    pub is_dark: bool,
    /// Overall form completion in [0, 1]; clamped.
    pub form_progress: f32,
    /// Append-only list of application events.
    pub spike_events: Vec<SpikeEvent>,
}

impl Default for FrameInput {
    fn default() -> Self {
        Self {
            onboarding_step: 1,
            assistant_name: String::new(),
            is_processing: false,
            is_complete: false,
            is_dark: false,
            form_progress: 0.0,
            spike_events: Vec::new(),
        }
    }
}

impl FrameInput {
    /// Whether the name is non-empty after trimming.
    pub fn has_name(&self) -> bool {
        !self.assistant_name.trim().is_empty()
    }

    /// `form_progress` clamped to [0, 1]; NaN reads as 0.
    pub fn clamped_progress(&self) -> f32 {
        if self.form_progress.is_nan() {
            0.0
        } else {
            self.form_progress.clamp(0.0, 1.0)
        }
    }
}

/// The boolean parts of an input, kept for edge detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub onboarding_step: u32,
    pub has_name: bool,
    pub is_processing: bool,
    pub is_complete: bool,
}

impl InputSnapshot {
    /// Capture the parts of `input` that edges are computed from.
    pub fn of(input: &FrameInput) -> Self {
        Self {
            onboarding_step: input.onboarding_step,
            has_name: input.has_name(),
            is_processing: input.is_processing,
            is_complete: input.is_complete,
        }
    }
}

/// Transitions between two consecutive snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Edges {
    pub name_set: bool,
    pub name_cleared: bool,
    pub processing_started: bool,
    pub completed: bool,
    pub uncompleted: bool,
    pub step_changed: bool,
}

impl Edges {
    /// Edges from `prev` to `cur`. With no previous tick every flag is
    /// compared against an all-false snapshot.
    pub fn between(prev: Option<&InputSnapshot>, cur: &InputSnapshot) -> Self {
        let prev = prev.copied().unwrap_or(InputSnapshot {
            onboarding_step: cur.onboarding_step,
            ..InputSnapshot::default()
        });
        Self {
            name_set: cur.has_name && !prev.has_name,
            name_cleared: !cur.has_name && prev.has_name,
            processing_started: cur.is_processing && !prev.is_processing,
            completed: cur.is_complete && !prev.is_complete,
            uncompleted: !cur.is_complete && prev.is_complete,
            step_changed: cur.onboarding_step != prev.onboarding_step,
        }
    }
}
