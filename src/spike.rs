//! Spikes: transient radial disturbances led by one particle.
//!
//! Three channels share the [`Spike`] record:
//!
//! - **Natural** spikes grow from charge on potential anomalies, capped per
//!   step and kept apart by a minimum angular separation.
//! - **Triggered** spikes come from application events. One per event id,
//!   always outward, long-lived and uncapped. They carry the event so a
//!   label can be drawn at the leader.
//! - **Heartbeat** spikes run on the completion sphere and push along each
//!   particle's sphere normal instead of the ring radius.
//!
//! Ring displacement (`SpikeField`) is rebuilt every tick from the spikes
//! active at the start of the tick, then folded into each particle's
//! persistent radius: particles inside any spike's reach snap to
//! `rest + displacement`, the rest relax toward `rest`.
//!
//! ```ignore
//! spikes.update(&SpikeTick { elapsed, step, pulse, radius_offset }, &config, &mut population, &mut rng);
//! for spike in spikes.triggered() {
//!     println!("{} at particle {}", spike.event().unwrap().text, spike.leader);
//! }
//! ```

use crate::config::{sample, FieldConfig, HeartbeatConfig, StepConfig, TriggeredSpikeConfig};
use crate::events::SpikeEvent;
use crate::population::Population;
use crate::shapes::{safe_normal, smoothstep};
use glam::Vec3;
use rand::Rng;
use std::f32::consts::{PI, TAU};
use tracing::{debug, trace};

/// Smoothed trapezoid over a spike's normalized lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    /// Fraction of the lifetime spent ramping in.
    pub ramp_in: f32,
    /// Fraction of the lifetime at which ramp-out begins. `1.0` never decays.
    pub hold_until: f32,
}

impl Envelope {
    pub const NATURAL: Envelope = Envelope {
        ramp_in: 0.15,
        hold_until: 0.7,
    };
    pub const HEARTBEAT: Envelope = Envelope {
        ramp_in: 0.2,
        hold_until: 0.6,
    };

    /// Ramp in over `ramp_in`, then hold until expiry.
    pub fn sustained(ramp_in: f32) -> Self {
        Self {
            ramp_in,
            hold_until: 1.0,
        }
    }

    /// Strength in [0, 1] at lifetime fraction `progress`.
    pub fn at(&self, progress: f32) -> f32 {
        if progress < self.ramp_in {
            smoothstep(progress / self.ramp_in)
        } else if progress < self.hold_until {
            1.0
        } else if self.hold_until >= 1.0 {
            1.0
        } else {
            1.0 - smoothstep((progress - self.hold_until) / (1.0 - self.hold_until))
        }
    }
}

/// Which channel a spike belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum SpikeKind {
    Natural,
    Triggered(SpikeEvent),
    Heartbeat,
}

/// One active spike.
#[derive(Debug, Clone, PartialEq)]
pub struct Spike {
    pub leader: usize,
    /// `1.0` outward, `-1.0` inward.
    pub direction: f32,
    pub power: f32,
    pub start_time: f32,
    pub duration: f32,
    pub envelope: Envelope,
    pub kind: SpikeKind,
}

impl Spike {
    /// Lifetime fraction at `elapsed`.
    pub fn progress(&self, elapsed: f32) -> f32 {
        (elapsed - self.start_time) / self.duration
    }

    /// Whether the spike has run its full duration.
    pub fn is_expired(&self, elapsed: f32) -> bool {
        elapsed - self.start_time >= self.duration
    }

    /// Signed leader displacement at `elapsed`.
    pub fn leader_displacement(&self, elapsed: f32) -> f32 {
        self.power * self.envelope.at(self.progress(elapsed)) * self.direction
    }

    /// The event this spike acknowledges, if any.
    pub fn event(&self) -> Option<&SpikeEvent> {
        match &self.kind {
            SpikeKind::Triggered(event) => Some(event),
            _ => None,
        }
    }

    /// Label opacity: fades in after start and out before expiry.
    pub fn label_opacity(&self, elapsed: f32, fade_in: f32, fade_out: f32) -> f32 {
        let age = elapsed - self.start_time;
        let remaining = self.duration - age;
        fade(age, fade_in).min(fade(remaining, fade_out))
    }
}

fn fade(t: f32, width: f32) -> f32 {
    if width <= 0.0 {
        1.0
    } else {
        smoothstep(t / width)
    }
}

/// Shortest distance between two angles, in [0, PI].
pub fn angular_distance(a: f32, b: f32) -> f32 {
    let d = (a.rem_euclid(TAU) - b.rem_euclid(TAU)).abs();
    if d > PI {
        TAU - d
    } else {
        d
    }
}

/// Per-tick inputs to [`SpikeField::update`].
#[derive(Debug, Clone, Copy)]
pub struct SpikeTick<'a> {
    pub elapsed: f32,
    pub step: &'a StepConfig,
    pub pulse: f32,
    /// Eased step radius minus the base radius; added to every rest radius.
    pub radius_offset: f32,
}

/// Natural and triggered spikes on the orbit ring.
#[derive(Debug, Clone, Default)]
pub struct SpikeField {
    natural: Vec<Spike>,
    triggered: Vec<Spike>,
    displacement: Vec<f32>,
    near: Vec<bool>,
}

impl SpikeField {
    /// No active spikes, zero displacement.
    pub fn new(particle_count: usize) -> Self {
        Self {
            natural: Vec::new(),
            triggered: Vec::new(),
            displacement: vec![0.0; particle_count],
            near: vec![false; particle_count],
        }
    }

    /// Active natural spikes.
    pub fn natural(&self) -> &[Spike] {
        &self.natural
    }

    /// Active event spikes, oldest first.
    pub fn triggered(&self) -> &[Spike] {
        &self.triggered
    }

    /// Displacement applied to particle `i` this tick.
    pub fn displacement(&self, i: usize) -> f32 {
        self.displacement.get(i).copied().unwrap_or(0.0)
    }

    /// Start a triggered spike for `event` led by `leader`.
    pub fn trigger(&mut self, event: SpikeEvent, leader: usize, elapsed: f32, config: &TriggeredSpikeConfig) {
        debug!(id = %event.id, category = %event.category, leader, "triggered spike");
        self.triggered.push(Spike {
            leader,
            direction: 1.0,
            power: config.power,
            start_time: elapsed,
            duration: config.duration,
            envelope: Envelope::sustained(config.ramp_fraction),
            kind: SpikeKind::Triggered(event),
        });
    }

    /// Drop every triggered spike (and with them their labels).
    pub fn cancel_triggered(&mut self) {
        if !self.triggered.is_empty() {
            debug!(count = self.triggered.len(), "cancelling triggered spikes");
        }
        self.triggered.clear();
    }

    /// Charge, ignite, expire, then rebuild displacement and fold it into
    /// every particle's radius.
    pub fn update<R: Rng>(&mut self, tick: &SpikeTick<'_>, config: &FieldConfig, population: &mut Population, rng: &mut R) {
        let elapsed = tick.elapsed;
        self.ignite_natural(tick, config, population, rng);

        self.natural.retain(|s| !s.is_expired(elapsed));
        self.triggered.retain(|s| !s.is_expired(elapsed));

        let (personalities, states) = population.split_mut();
        self.displacement.resize(states.len(), 0.0);
        self.near.resize(states.len(), false);
        self.displacement.fill(0.0);
        self.near.fill(false);

        let natural_reach = config.spikes.max_angular_dist;
        let triggered_reach = natural_reach * config.triggered.influence_scale;
        let attraction = config.spikes.attraction_strength;

        let channels = [(&self.natural, natural_reach, 3), (&self.triggered, triggered_reach, 2)];
        for (spikes, reach, falloff) in channels {
            for spike in spikes.iter() {
                let leader_disp = spike.leader_displacement(elapsed);
                let leader_angle = states[spike.leader].angle;
                self.displacement[spike.leader] += leader_disp;

                for (j, (p, s)) in personalities.iter().zip(states.iter()).enumerate() {
                    let dist = angular_distance(s.angle, leader_angle);
                    if dist > reach {
                        continue;
                    }
                    self.near[j] = true;
                    if j == spike.leader || p.is_fixed_anchor {
                        continue;
                    }
                    let f = 1.0 - dist / reach;
                    self.displacement[j] += leader_disp * f.powi(falloff) * attraction;
                }
            }
        }

        let relax = config.spikes.relax_rate;
        for (i, (p, s)) in personalities.iter().zip(states.iter_mut()).enumerate() {
            let rest = p.rest_radius + tick.radius_offset;
            if self.near[i] {
                s.radius = rest + self.displacement[i];
            } else {
                s.radius += (rest - s.radius) * relax;
            }
        }
    }

    fn ignite_natural<R: Rng>(&mut self, tick: &SpikeTick<'_>, config: &FieldConfig, population: &mut Population, rng: &mut R) {
        let step = tick.step;
        let spikes = &config.spikes;
        let cooldown = spikes.base_cooldown * step.cooldown_multiplier;
        let gain = spikes.charge_rate * step.charge_rate_multiplier * (1.0 + tick.pulse * 1.5);

        let (personalities, states) = population.split_mut();
        for i in 0..personalities.len() {
            let p = &personalities[i];
            if !p.is_potential_anomaly || tick.elapsed - states[i].last_spike_time < cooldown {
                continue;
            }
            let charge = (states[i].charge + gain * p.charge_rate_multiplier).min(1.0);
            states[i].charge = charge;
            if charge < 1.0 || self.natural.len() >= step.max_spikes {
                continue;
            }

            let angle = states[i].angle;
            let crowded = self
                .natural
                .iter()
                .any(|s| angular_distance(angle, states[s.leader].angle) < spikes.min_separation);
            if crowded {
                states[i].charge = spikes.near_ready_charge;
                continue;
            }

            let direction = if rng.gen::<f32>() < step.inward_bias { -1.0 } else { 1.0 };
            let power = sample(rng, &spikes.power) * step.spike_power_multiplier * (1.0 + tick.pulse * 0.25);
            let duration = sample(rng, &spikes.duration);
            states[i].charge = 0.0;
            states[i].last_spike_time = tick.elapsed;

            trace!(leader = i, direction, power, duration, "natural spike");
            self.natural.push(Spike {
                leader: i,
                direction,
                power,
                start_time: tick.elapsed,
                duration,
                envelope: Envelope::NATURAL,
                kind: SpikeKind::Natural,
            });
        }
    }
}

/// Radial spikes on the completion sphere.
///
/// Runs only while the global final progress is above the activation
/// threshold; below it the spike list and all displacement are cleared.
#[derive(Debug, Clone)]
pub struct SphereHeartbeat {
    spikes: Vec<Spike>,
    normals: Vec<Vec3>,
    displacement: Vec<f32>,
}

impl SphereHeartbeat {
    /// `sphere` is the completion sphere, one point per particle.
    pub fn new(sphere: &[Vec3]) -> Self {
        Self {
            spikes: Vec::new(),
            normals: sphere.iter().map(|p| safe_normal(*p)).collect(),
            displacement: vec![0.0; sphere.len()],
        }
    }

    /// Active heartbeat spikes.
    pub fn spikes(&self) -> &[Spike] {
        &self.spikes
    }

    /// Unit normal of sphere point `i`.
    pub fn normal(&self, i: usize) -> Vec3 {
        self.normals.get(i).copied().unwrap_or(Vec3::ZERO)
    }

    /// Displacement along the normal for particle `i` this tick.
    pub fn displacement(&self, i: usize) -> f32 {
        self.displacement.get(i).copied().unwrap_or(0.0)
    }

    /// Drop every heartbeat spike.
    pub fn clear(&mut self) {
        self.spikes.clear();
        self.displacement.fill(0.0);
    }

    /// Charge, ignite, expire and displace for one tick.
    pub fn update<R: Rng>(
        &mut self,
        elapsed: f32,
        final_progress: f32,
        config: &HeartbeatConfig,
        population: &mut Population,
        rng: &mut R,
    ) {
        self.displacement.fill(0.0);
        if final_progress <= config.activation {
            self.spikes.clear();
            return;
        }
        let params = if final_progress >= config.settle_threshold {
            &config.settled
        } else {
            &config.calm
        };

        let (personalities, states) = population.split_mut();
        for (i, (p, s)) in personalities.iter().zip(states.iter_mut()).enumerate() {
            if !p.is_potential_anomaly || elapsed - s.sphere_last_spike_time < params.cooldown {
                continue;
            }
            s.sphere_charge = (s.sphere_charge + params.charge_rate * p.charge_rate_multiplier).min(1.0);
            if s.sphere_charge < 1.0 || self.spikes.len() >= params.max_spikes {
                continue;
            }
            s.sphere_charge = 0.0;
            s.sphere_last_spike_time = elapsed;
            self.spikes.push(Spike {
                leader: i,
                direction: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
                power: sample(rng, &params.power),
                start_time: elapsed,
                duration: sample(rng, &params.duration),
                envelope: Envelope::HEARTBEAT,
                kind: SpikeKind::Heartbeat,
            });
        }

        self.spikes.retain(|s| !s.is_expired(elapsed));

        let span = 1.0 - config.cone_dot;
        for spike in &self.spikes {
            let leader_disp = spike.leader_displacement(elapsed);
            self.displacement[spike.leader] += leader_disp;

            let leader_normal = self.normals[spike.leader];
            for (j, normal) in self.normals.iter().enumerate() {
                if j == spike.leader {
                    continue;
                }
                let dot = leader_normal.dot(*normal);
                if dot < config.cone_dot {
                    continue;
                }
                let proximity = (dot - config.cone_dot) / span;
                self.displacement[j] += leader_disp * proximity * proximity * config.neighbor_strength;
            }
        }
    }
}
