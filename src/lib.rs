//! # orbfield - orbital particle-field engine
//!
//! A living particle backdrop driven by application state. A fixed
//! population of particles orbits a ring, flares in stochastic spikes,
//! converges into morphing shapes and finally collapses into a beating
//! sphere, all in response to a handful of host inputs.
//!
//! The engine stops at per-frame buffers: positions, sizes, a glow layer
//! and label placements. Drawing them is up to the host.
//!
//! ## Quick Start
//!
//! ```ignore
//! use orbfield::prelude::*;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let mut sim = Simulation::builder()
//!         .with_particle_count(2000)
//!         .with_seed(42)
//!         .build()?;
//!     let mut clock = FrameClock::fixed(1.0 / 60.0);
//!
//!     let mut input = FrameInput::default();
//!     input.onboarding_step = 2;
//!     loop {
//!         let frame = sim.advance(&input, &mut clock);
//!         upload(frame.positions_flat(), frame.sizes());
//!     }
//! }
//! ```
//!
//! ## Layers
//!
//! | Layer | Driven by | Module |
//! |-------|-----------|--------|
//! | Line to ring | `onboarding_step >= 2` | [`frame`] |
//! | Spikes | charge, step presets | [`spike`] |
//! | Event markers | `spike_events` | [`spike`], [`events`] |
//! | Shape morph | `assistant_name` | [`shapes`], [`frame`] |
//! | Completion sphere | `is_complete` | [`shapes`], [`spike`] |
//! | Processing pulse | `is_processing` | [`frame`] |
//!
//! ## Logging
//!
//! The engine emits [`tracing`] events (`info` on creation, `debug` on input
//! transitions and triggered spikes, `warn` once per unknown step). Install
//! any subscriber to see them.

pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod input;
pub mod phase;
pub mod population;
pub mod shapes;
mod simulation;
pub mod spike;
pub mod time;
pub mod visuals;

pub use bytemuck;
pub use config::{FieldConfig, StepConfig, StepTable};
pub use error::ConfigError;
pub use events::{EventLedger, SpikeEvent};
pub use frame::{FrameOutput, LabelPlacement};
pub use glam::{Quat, Vec2, Vec3};
pub use input::FrameInput;
pub use simulation::{Simulation, SimulationBuilder};
pub use time::FrameClock;
pub use visuals::Appearance;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use orbfield::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{FieldConfig, StepConfig, StepTable};
    pub use crate::error::ConfigError;
    pub use crate::events::SpikeEvent;
    pub use crate::frame::{FrameOutput, LabelPlacement};
    pub use crate::input::FrameInput;
    pub use crate::simulation::{Simulation, SimulationBuilder};
    pub use crate::spike::{Spike, SpikeKind};
    pub use crate::time::{ClockMode, FrameClock};
    pub use crate::visuals::Appearance;
    pub use crate::{Vec2, Vec3};
}
