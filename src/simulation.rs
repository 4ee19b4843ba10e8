//! Simulation builder and tick loop.
//!
//! A [`Simulation`] owns the population, the phase scalars, every spike
//! channel and the output buffers. The host calls [`Simulation::tick`] once
//! per rendered frame; within a tick the order is fixed:
//!
//! 1. edge detection on the input and the resets it implies
//! 2. phase goals and smoothing
//! 3. new triggered events
//! 4. natural spike bookkeeping and ring displacement
//! 5. heartbeat bookkeeping
//! 6. morph targets and rotation
//! 7. per-particle integration into the output buffers

use crate::config::FieldConfig;
use crate::error::ConfigError;
use crate::events::EventLedger;
use crate::frame::{self, FrameOutput, FrameParams};
use crate::input::{Edges, FrameInput, InputSnapshot};
use crate::phase::{shape_rotation, PhaseController, PhaseGoals};
use crate::population::{Personality, Population, RuntimeState};
use crate::shapes::{generate_final_sphere, generate_shapes, ShapeSet};
use crate::spike::{SphereHeartbeat, SpikeField, SpikeTick};
use crate::time::FrameClock;
use crate::visuals::ThemeTracker;
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Configures and builds a [`Simulation`].
///
/// ```ignore
/// let mut sim = Simulation::builder()
///     .with_particle_count(1200)
///     .with_seed(7)
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimulationBuilder {
    config: FieldConfig,
    seed: Option<u64>,
}

impl SimulationBuilder {
    /// Builder with the default configuration and no seed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of particles.
    pub fn with_particle_count(mut self, count: usize) -> Self {
        self.config.particle_count = count;
        self
    }

    /// Fix the random seed. Without one every build draws a fresh field.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the configuration and draw the population.
    pub fn build(self) -> Result<Simulation, ConfigError> {
        self.config.validate()?;
        let seed = self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        });
        Ok(Simulation::from_parts(self.config, seed))
    }
}

/// The particle field.
pub struct Simulation {
    config: FieldConfig,
    seed: u64,
    rng: SmallRng,
    population: Population,
    shapes: ShapeSet,
    morph_targets: Vec<Vec3>,
    final_sphere: Vec<Vec3>,
    phase: PhaseController,
    spikes: SpikeField,
    heartbeat: SphereHeartbeat,
    ledger: EventLedger,
    theme: ThemeTracker,
    previous: Option<InputSnapshot>,
    warned_steps: HashSet<u32>,
    output: FrameOutput,
    ticks: u64,
}

impl Simulation {
    /// Start configuring a new simulation.
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }

    fn from_parts(config: FieldConfig, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let population = Population::create(&config, &mut rng);
        let points = config.shape_particle_count();
        let shapes = generate_shapes(points, config.shape_scale);
        let final_sphere = generate_final_sphere(config.particle_count, config.final_sphere_radius);
        let heartbeat = SphereHeartbeat::new(&final_sphere);

        info!(
            particles = config.particle_count,
            shape_particles = points,
            seed,
            "particle field created"
        );

        Self {
            phase: PhaseController::new(&config.steps),
            spikes: SpikeField::new(config.particle_count),
            output: FrameOutput::with_capacity(config.particle_count),
            morph_targets: vec![Vec3::ZERO; points],
            config,
            seed,
            rng,
            population,
            shapes,
            final_sphere,
            heartbeat,
            ledger: EventLedger::new(),
            theme: ThemeTracker::new(),
            previous: None,
            warned_steps: HashSet::new(),
            ticks: 0,
        }
    }

    /// Advance one frame at `elapsed` seconds and return the output.
    ///
    /// `elapsed` should not decrease between calls.
    pub fn tick(&mut self, input: &FrameInput, elapsed: f32) -> &FrameOutput {
        let snapshot = InputSnapshot::of(input);
        let edges = Edges::between(self.previous.as_ref(), &snapshot);

        let (step, known) = self.config.steps.resolve(input.onboarding_step);
        if !known && self.warned_steps.insert(input.onboarding_step) {
            warn!(step = input.onboarding_step, "unknown onboarding step, using step 1 parameters");
        }

        if edges.step_changed {
            debug!(step = input.onboarding_step, "onboarding step changed");
        }
        if edges.name_set {
            debug!("assistant named, shape convergence restarts");
            self.phase.reset_shape();
            self.population.reset_shape_convergence();
        }
        if edges.name_cleared {
            debug!("assistant name cleared, shape dissolving");
        }
        if edges.processing_started {
            debug!("processing started");
            self.spikes.cancel_triggered();
            self.heartbeat.clear();
        }
        if edges.completed {
            debug!("completion sphere forming");
        }
        if edges.uncompleted {
            debug!("completion withdrawn, sphere releasing");
        }

        // Unknown steps only fall back for the step parameters
        let goals = PhaseGoals {
            circle: input.onboarding_step >= 2,
            shape: snapshot.has_name,
            complete: input.is_complete,
            form_progress: input.clamped_progress(),
        };
        self.phase.update(step, goals, &self.config.rates);
        let levels = self.phase.levels();
        let params = self.phase.params();

        let count = self.population.len();
        for event in self.ledger.take_new(&input.spike_events) {
            let leader = self.rng.gen_range(0..count);
            self.spikes.trigger(event, leader, elapsed, &self.config.triggered);
        }

        let spike_tick = SpikeTick {
            elapsed,
            step,
            pulse: levels.pulse,
            radius_offset: params.radius - self.config.base_radius,
        };
        self.spikes.update(&spike_tick, &self.config, &mut self.population, &mut self.rng);
        self.heartbeat.update(
            elapsed,
            levels.final_sphere,
            &self.config.heartbeat,
            &mut self.population,
            &mut self.rng,
        );

        self.shapes.morph_at(elapsed, self.config.morph_period, &mut self.morph_targets);
        let frame_params = FrameParams {
            elapsed,
            config: &self.config,
            step,
            levels,
            params,
            rotation: shape_rotation(elapsed),
            size_pulse: input.is_processing && !input.is_complete,
            morph_targets: &self.morph_targets,
            final_sphere: &self.final_sphere,
        };
        frame::integrate(&frame_params, &mut self.population, &self.spikes, &self.heartbeat, &mut self.output);

        let appearance = self.theme.update(input.is_dark, self.config.rates.background);
        self.output.set_appearance(appearance);

        self.previous = Some(snapshot);
        self.ticks += 1;
        &self.output
    }

    /// Tick the clock, then the simulation.
    pub fn advance(&mut self, input: &FrameInput, clock: &mut FrameClock) -> &FrameOutput {
        let elapsed = clock.tick();
        self.tick(input, elapsed)
    }

    /// The validated configuration.
    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// Seed the random draws were made from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of particles.
    pub fn particle_count(&self) -> usize {
        self.population.len()
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Buffers from the last tick.
    pub fn output(&self) -> &FrameOutput {
        &self.output
    }

    /// Per-particle traits and state.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Traits of particle `i`.
    pub fn personality(&self, i: usize) -> Option<&Personality> {
        self.population.personalities().get(i)
    }

    /// Runtime state of particle `i`.
    pub fn state(&self, i: usize) -> Option<&RuntimeState> {
        self.population.states().get(i)
    }

    /// Global phase scalars.
    pub fn phase(&self) -> &PhaseController {
        &self.phase
    }

    /// Natural and triggered spikes on the ring.
    pub fn spikes(&self) -> &SpikeField {
        &self.spikes
    }

    /// Spikes on the completion sphere.
    pub fn heartbeat(&self) -> &SphereHeartbeat {
        &self.heartbeat
    }

    /// Morph shapes.
    pub fn shapes(&self) -> &ShapeSet {
        &self.shapes
    }

    /// Home points of the completion sphere.
    pub fn final_sphere(&self) -> &[Vec3] {
        &self.final_sphere
    }

    /// Eased ring radius the field is currently moving toward.
    pub fn step_radius(&self) -> f32 {
        self.phase.params().radius
    }

    /// Particle `i`'s current line-to-circle blend.
    pub fn line_blend(&self, i: usize) -> f32 {
        self.personality(i)
            .map(|p| frame::line_blend(self.phase.levels().line_to_circle, p.transition_delay))
            .unwrap_or(0.0)
    }

    /// Drop every triggered spike and heartbeat spike, as on teardown.
    pub fn cancel_pending(&mut self) {
        self.spikes.cancel_triggered();
        self.heartbeat.clear();
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("particles", &self.population.len())
            .field("seed", &self.seed)
            .field("ticks", &self.ticks)
            .field("natural_spikes", &self.spikes.natural().len())
            .field("triggered_spikes", &self.spikes.triggered().len())
            .finish()
    }
}
