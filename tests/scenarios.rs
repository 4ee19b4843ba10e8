//! End-to-end onboarding scenarios at a 60 Hz fixed step.

use orbfield::prelude::*;

const DT: f32 = 1.0 / 60.0;

fn field(seed: u64) -> Simulation {
    Simulation::builder().with_seed(seed).build().unwrap()
}

fn at_step(step: u32) -> FrameInput {
    FrameInput {
        onboarding_step: step,
        ..FrameInput::default()
    }
}

fn mail(id: &str) -> SpikeEvent {
    SpikeEvent::new(id, "mail", "Email", 0.0)
}

// ============================================================================
// Layout
// ============================================================================

#[test]
fn test_first_frame_is_the_line() {
    let mut sim = field(1);
    let out = sim.tick(&at_step(1), 0.0);

    assert_eq!(out.len(), 2000);
    for p in out.positions() {
        assert!(p.x.abs() <= 200.0, "x out of line bounds: {p:?}");
        assert!(p.y.abs() <= 80.0, "y out of line envelope: {p:?}");
    }
}

#[test]
fn test_step_two_crosses_to_circle() {
    let mut sim = field(2);
    sim.tick(&at_step(1), 0.0);

    let input = at_step(2);
    let mut t = 0.0;
    for _ in 0..200 {
        t += DT;
        sim.tick(&input, t);
    }

    let n = sim.particle_count();
    let crossed = (0..n).filter(|&i| sim.line_blend(i) >= 0.95).count();
    assert!(crossed * 100 >= n * 95, "only {crossed} of {n} crossed");

    let target = sim.step_radius();
    let on_ring = sim
        .output()
        .positions()
        .iter()
        .filter(|p| (p.truncate().length() - target).abs() < 35.0)
        .count();
    assert!(on_ring * 100 >= n * 95, "only {on_ring} of {n} near radius {target}");
}

#[test]
fn test_step_one_keeps_the_line() {
    let mut sim = field(3);
    let input = at_step(1);
    let mut t = 0.0;
    for _ in 0..300 {
        sim.tick(&input, t);
        t += DT;
    }
    assert_eq!(sim.phase().levels().line_to_circle, 0.0);
    assert!(sim.output().positions().iter().all(|p| p.x.abs() <= 200.0));
}

// ============================================================================
// Triggered events
// ============================================================================

#[test]
fn test_event_label_appears_and_persists() {
    let mut sim = field(4);
    let mut input = at_step(2);
    sim.tick(&input, 0.0);

    input.spike_events.push(mail("e1"));
    let mut t = DT;
    let out = sim.tick(&input, t);
    assert_eq!(out.labels().len(), 1);
    assert_eq!(out.labels()[0].id, "e1");
    assert_eq!(out.labels()[0].category, "mail");

    for _ in 0..120 {
        t += DT;
        let out = sim.tick(&input, t);
        assert_eq!(out.labels().len(), 1);
        assert_eq!(out.labels()[0].id, "e1");
    }
    let label = &sim.output().labels()[0];
    assert!(label.opacity > 0.9);
    assert!(label.world_position.is_finite());
}

#[test]
fn test_duplicate_delivery_is_idempotent() {
    let mut sim = field(5);
    let mut input = at_step(2);
    input.spike_events = vec![mail("e1"), mail("e1")];

    let mut t = 0.0;
    for _ in 0..60 {
        sim.tick(&input, t);
        t += DT;
    }
    assert_eq!(sim.spikes().triggered().len(), 1);
    assert_eq!(sim.output().labels().len(), 1);

    input.spike_events.push(mail("e2"));
    sim.tick(&input, t);
    assert_eq!(sim.spikes().triggered().len(), 2);
}

#[test]
fn test_label_sits_on_leader() {
    let mut sim = field(6);
    let mut input = at_step(3);
    input.spike_events.push(mail("e1"));
    sim.tick(&input, 0.0);

    let spike = &sim.spikes().triggered()[0];
    let state = sim.state(spike.leader).unwrap();
    let label = &sim.output().labels()[0];
    let expected = Vec3::new(state.angle.cos(), state.angle.sin(), 0.0) * state.radius;
    assert!((label.world_position - expected).length() < 1e-3);
}

// ============================================================================
// Spikes
// ============================================================================

#[test]
fn test_natural_spikes_respect_step_cap() {
    let mut sim = field(7);
    let input = at_step(4);
    let cap = sim.config().steps.resolve(4).0.max_spikes;

    let mut t = 0.0;
    let mut peak = 0;
    for _ in 0..3000 {
        sim.tick(&input, t);
        t += DT;
        let active = sim.spikes().natural().len();
        assert!(active <= cap);
        peak = peak.max(active);
    }
    assert!(peak > 0, "no natural spike ignited in 50 s");
}

#[test]
fn test_progress_pulse_boosts_activity() {
    let mut sim = field(8);
    let mut input = at_step(2);
    sim.tick(&input, 0.0);
    input.form_progress = 0.5;
    sim.tick(&input, DT);
    assert!(sim.phase().levels().pulse > 0.3);
}

// ============================================================================
// Shape and completion
// ============================================================================

#[test]
fn test_naming_draws_shape_particles_inward() {
    let mut sim = field(9);
    let mut input = at_step(4);
    input.assistant_name = "Nova".into();

    let mut t = 0.0;
    for _ in 0..900 {
        sim.tick(&input, t);
        t += DT;
    }

    let scale = sim.config().shape_scale;
    let mut inside = 0;
    let mut shape_particles = 0;
    for (i, p) in sim.output().positions().iter().enumerate() {
        if sim.personality(i).unwrap().is_shape_particle() {
            shape_particles += 1;
            if p.length() < scale {
                inside += 1;
            }
        }
    }
    assert_eq!(shape_particles, 300);
    assert!(inside * 10 >= shape_particles * 9, "{inside} of {shape_particles} inside");
}

#[test]
fn test_completion_collapses_to_sphere() {
    let mut sim = field(10);
    let mut input = at_step(6);
    input.is_complete = true;

    let mut t = 0.0;
    for _ in 0..1500 {
        sim.tick(&input, t);
        t += DT;
    }
    assert!(sim.phase().levels().final_sphere > 0.99);

    // Sphere radius 65, breathing 4% and heartbeat spikes on top
    let limit = sim.config().final_sphere_radius * 1.04 + 30.0;
    let near = sim
        .output()
        .positions()
        .iter()
        .filter(|p| p.length() < limit)
        .count();
    assert!(near * 100 >= sim.particle_count() * 95);
}

#[test]
fn test_processing_pulses_sizes() {
    let mut a = field(11);
    let mut b = field(11);
    let idle = at_step(6);
    let busy = FrameInput {
        is_processing: true,
        ..at_step(6)
    };

    a.tick(&idle, 0.3);
    b.tick(&busy, 0.3);
    assert_eq!(a.output().positions(), b.output().positions());
    assert_ne!(a.output().sizes(), b.output().sizes());
    // Glow sizes do not pulse
    assert_eq!(a.output().glow_sizes(), b.output().glow_sizes());
}

#[test]
fn test_theme_is_cosmetic() {
    let mut dark = field(12);
    let mut light = field(12);
    let d = FrameInput {
        is_dark: true,
        ..at_step(2)
    };
    let l = at_step(2);
    for k in 0..30 {
        dark.tick(&d, k as f32 * DT);
        light.tick(&l, k as f32 * DT);
    }
    assert_eq!(dark.output().positions(), light.output().positions());
    assert_ne!(dark.output().appearance(), light.output().appearance());
}
