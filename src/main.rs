//! Headless onboarding session.
//!
//! Drives a field through a scripted wizard run at a fixed 60 Hz and logs a
//! summary whenever the session moves to a new phase.
//!
//! ```text
//! orbfield-demo [frames] [seed] [config.json]
//! RUST_LOG=orbfield=debug orbfield-demo 3000 7
//! ```

use orbfield::phase::PhaseLevels;
use orbfield::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const FPS: f32 = 60.0;

/// Setup checklist shown after the last step.
///
/// Tasks tick off one by one; completion lands shortly after the last.
#[derive(Debug, Clone)]
struct ProcessingScript {
    tasks: Vec<&'static str>,
    first_task: f32,
    task_interval: f32,
    settle: f32,
}

impl Default for ProcessingScript {
    fn default() -> Self {
        Self {
            tasks: vec![
                "Creating your workspace",
                "Configuring permissions",
                "Training your assistant",
                "Finalizing setup",
            ],
            first_task: 0.6,
            task_interval: 0.6,
            settle: 0.4,
        }
    }
}

impl ProcessingScript {
    /// Seconds from start until completion.
    fn duration(&self) -> f32 {
        self.first_task + self.tasks.len() as f32 * self.task_interval + self.settle
    }

    /// Tasks finished `since` seconds after the checklist started.
    fn completed_tasks(&self, since: f32) -> usize {
        if since < self.first_task {
            return 0;
        }
        let done = ((since - self.first_task) / self.task_interval).floor() as usize + 1;
        done.min(self.tasks.len())
    }

    /// `(is_processing, is_complete)` at `since` seconds.
    fn flags(&self, since: f32) -> (bool, bool) {
        if since >= self.duration() {
            (false, true)
        } else {
            (true, false)
        }
    }
}

/// Where the scripted user is in the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    Profile,
    Invite,
    Workspace,
    Naming,
    Permissions,
    Processing,
    Complete,
}

/// Timeline of the scripted session, in seconds.
struct Session {
    script: ProcessingScript,
    processing_at: f32,
}

impl Session {
    fn new() -> Self {
        Self {
            script: ProcessingScript::default(),
            processing_at: 28.0,
        }
    }

    fn phase(&self, t: f32) -> SessionPhase {
        match t {
            t if t < 5.0 => SessionPhase::Profile,
            t if t < 12.0 => SessionPhase::Invite,
            t if t < 16.0 => SessionPhase::Workspace,
            t if t < 22.0 => SessionPhase::Naming,
            t if t < self.processing_at => SessionPhase::Permissions,
            t if t < self.processing_at + self.script.duration() => SessionPhase::Processing,
            _ => SessionPhase::Complete,
        }
    }

    /// Host input at `t`. `input` keeps the event list between calls.
    fn apply(&self, t: f32, input: &mut FrameInput) {
        let phase = self.phase(t);
        input.onboarding_step = match phase {
            SessionPhase::Profile => 1,
            SessionPhase::Invite => 2,
            SessionPhase::Workspace => 3,
            SessionPhase::Naming => 4,
            SessionPhase::Permissions => 5,
            SessionPhase::Processing | SessionPhase::Complete => 6,
        };

        // One field filled every few seconds, up to all seven
        input.form_progress = ((t / 4.0).floor() / 7.0).min(1.0);

        if t >= 8.0 && input.spike_events.is_empty() {
            input
                .spike_events
                .push(SpikeEvent::new("invite-1", "mail", "ada@example.com", t as f64));
        }
        if t >= 24.0 && input.spike_events.len() == 1 {
            input
                .spike_events
                .push(SpikeEvent::new("calendar", "calendar", "Calendar connected", t as f64));
        }

        // Typed one letter at a time
        let name = "Nova";
        let typed = if t >= 17.0 { ((t - 17.0) * 3.0) as usize + 1 } else { 0 };
        input.assistant_name = name.chars().take(typed).collect();

        let (processing, complete) = if t >= self.processing_at {
            self.script.flags(t - self.processing_at)
        } else {
            (false, false)
        };
        input.is_processing = processing;
        input.is_complete = complete;
        input.is_dark = t >= 16.0;
    }
}

fn summarize(phase: SessionPhase, sim: &Simulation, levels: PhaseLevels) {
    let frame = sim.output();
    let mean_size = frame.sizes().iter().sum::<f32>() / frame.len().max(1) as f32;
    info!(
        ?phase,
        tick = sim.ticks(),
        line_to_circle = levels.line_to_circle,
        shape = levels.shape,
        final_sphere = levels.final_sphere,
        pulse = levels.pulse,
        natural = sim.spikes().natural().len(),
        triggered = sim.spikes().triggered().len(),
        heartbeat = sim.heartbeat().spikes().len(),
        labels = frame.labels().len(),
        mean_size,
        "phase summary"
    );
}

fn run() -> Result<(), ConfigError> {
    let args: Vec<String> = std::env::args().collect();
    let frames: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(2400);
    let seed: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(42);
    let config = match args.get(3) {
        Some(path) => FieldConfig::load(path)?,
        None => FieldConfig::default(),
    };

    info!(frames, seed, particles = config.particle_count, "starting session");

    let mut sim = Simulation::builder().with_config(config).with_seed(seed).build()?;
    let mut clock = FrameClock::fixed(1.0 / FPS);
    let session = Session::new();
    let mut input = FrameInput::default();
    let mut current: Option<SessionPhase> = None;
    let mut tasks_logged = 0;

    for _ in 0..frames {
        let t = clock.elapsed();
        session.apply(t, &mut input);
        let phase = session.phase(t);

        if phase == SessionPhase::Processing {
            let done = session.script.completed_tasks(t - session.processing_at);
            while tasks_logged < done {
                info!(task = session.script.tasks[tasks_logged], "checklist");
                tasks_logged += 1;
            }
        }

        sim.advance(&input, &mut clock);

        if current != Some(phase) {
            if let Some(prev) = current {
                summarize(prev, &sim, sim.phase().levels());
            }
            current = Some(phase);
        }
    }
    if let Some(last) = current {
        summarize(last, &sim, sim.phase().levels());
    }

    for label in sim.output().labels() {
        info!(id = %label.id, text = %label.text, opacity = label.opacity, "label");
    }
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orbfield=info,orbfield_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run() {
        error!(%err, "session failed");
        std::process::exit(1);
    }
}
