//! The fixed particle population.
//!
//! Each particle carries an immutable [`Personality`] drawn once at creation
//! and a mutable [`RuntimeState`] that the simulation rewrites every tick.
//! Shape particles and wanderers are spread evenly across the index range
//! (regular spacing plus bounded jitter) so neither clusters on the ring.

use crate::config::{sample, FieldConfig};
use rand::Rng;
use std::collections::BTreeSet;
use std::f32::consts::TAU;

/// Static per-particle character, fixed for the lifetime of the population.
#[derive(Debug, Clone, PartialEq)]
pub struct Personality {
    /// Baseline orbit radius (`base_radius + radius_jitter`).
    pub rest_radius: f32,
    pub radius_jitter: f32,
    /// Eligible to lead natural and heartbeat spikes.
    pub is_potential_anomaly: bool,
    /// Never displaced by a neighbour's spike.
    pub is_fixed_anchor: bool,
    /// Index into the shape point arrays, for shape particles.
    pub shape_index: Option<usize>,
    pub is_wanderer: bool,
    pub wander_amplitude: f32,
    pub wander_speed: f32,
    pub wander_phase: f32,
    /// `1.0` or `-1.0`.
    pub wander_direction: f32,
    /// Radians added per tick before the step multiplier.
    pub orbit_speed: f32,
    /// Phase seed for breathing, line waves and the transition stagger.
    pub breathe_offset: f32,
    /// Starting angle, evenly spaced by index.
    pub base_angle: f32,
    pub charge_rate_multiplier: f32,
    pub convergence_delay: f32,
    pub convergence_speed: f32,
    pub final_delay: f32,
    pub final_speed: f32,
    /// Delay in the line-to-circle cascade, derived from `breathe_offset`.
    pub transition_delay: f32,
}

impl Personality {
    #[inline]
    pub fn is_shape_particle(&self) -> bool {
        self.shape_index.is_some()
    }
}

/// Mutable per-particle simulation state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeState {
    /// Orbit angle; grows monotonically.
    pub angle: f32,
    /// Current ring radius including spike displacement.
    pub radius: f32,
    /// Natural spike accumulator in [0, 1].
    pub charge: f32,
    pub last_spike_time: f32,
    /// Heartbeat accumulator in [0, 1].
    pub sphere_charge: f32,
    pub sphere_last_spike_time: f32,
    /// Eased progress toward the morph shape, in [0, 1].
    pub shape_convergence: f32,
    /// Eased progress toward the completion sphere, in [0, 1].
    pub final_convergence: f32,
}

/// Personalities and runtime state for every particle.
#[derive(Debug, Clone)]
pub struct Population {
    personalities: Vec<Personality>,
    states: Vec<RuntimeState>,
}

impl Population {
    /// Draw a population of `config.particle_count` particles.
    pub fn create<R: Rng>(config: &FieldConfig, rng: &mut R) -> Self {
        let count = config.particle_count;
        let ranges = &config.personality;

        let shape_indices = spread_indices(count, config.shape_particle_count(), 0.4, rng);
        let wanderers = spread_indices(count, config.wanderer_count(), 0.6, rng);
        // Shape index is the rank among the sorted shape particles
        let mut shape_rank = vec![None; count];
        for (rank, &idx) in shape_indices.iter().enumerate() {
            shape_rank[idx] = Some(rank);
        }

        let mut personalities = Vec::with_capacity(count);
        let mut states = Vec::with_capacity(count);

        for (i, shape_index) in shape_rank.into_iter().enumerate() {
            let radius_jitter = (rng.gen::<f32>() - 0.5) * config.radius_jitter;
            let is_wanderer = wanderers.binary_search(&i).is_ok();
            let is_potential_anomaly = rng.gen::<f32>() < config.potential_anomaly_chance;
            let anchor_roll = rng.gen::<f32>();
            let is_fixed_anchor =
                !is_wanderer && shape_index.is_none() && anchor_roll < config.fixed_anchor_fraction;
            let breathe_offset = rng.gen_range(0.0..TAU);

            let personality = Personality {
                rest_radius: config.base_radius + radius_jitter,
                radius_jitter,
                is_potential_anomaly,
                is_fixed_anchor,
                shape_index,
                is_wanderer,
                wander_amplitude: sample(rng, &ranges.wander_amplitude),
                wander_speed: sample(rng, &ranges.wander_speed),
                wander_phase: rng.gen_range(0.0..TAU),
                wander_direction: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
                orbit_speed: sample(rng, &ranges.orbit_speed),
                breathe_offset,
                base_angle: i as f32 / count as f32 * TAU,
                charge_rate_multiplier: sample(rng, &ranges.charge_rate_multiplier),
                convergence_delay: sample(rng, &ranges.convergence_delay),
                convergence_speed: sample(rng, &ranges.convergence_speed),
                final_delay: sample(rng, &ranges.final_delay),
                final_speed: sample(rng, &ranges.final_speed),
                transition_delay: stagger_from_phase(breathe_offset) * ranges.line_stagger,
            };

            let state = RuntimeState {
                angle: personality.base_angle,
                radius: personality.rest_radius,
                charge: sample(rng, &ranges.initial_charge),
                last_spike_time: -config.spikes.base_cooldown * rng.gen::<f32>(),
                sphere_charge: sample(rng, &ranges.initial_charge),
                sphere_last_spike_time: -15.0 * rng.gen::<f32>(),
                shape_convergence: 0.0,
                final_convergence: 0.0,
            };

            personalities.push(personality);
            states.push(state);
        }

        Self {
            personalities,
            states,
        }
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.personalities.len()
    }

    /// Whether the population has no particles.
    pub fn is_empty(&self) -> bool {
        self.personalities.is_empty()
    }

    /// Immutable per-particle traits, in index order.
    pub fn personalities(&self) -> &[Personality] {
        &self.personalities
    }

    /// Mutable per-particle state, in index order.
    pub fn states(&self) -> &[RuntimeState] {
        &self.states
    }

    /// Mutable access to the runtime state.
    pub fn states_mut(&mut self) -> &mut [RuntimeState] {
        &mut self.states
    }

    /// Split borrow: read personalities while mutating state.
    pub fn split_mut(&mut self) -> (&[Personality], &mut [RuntimeState]) {
        (&self.personalities, &mut self.states)
    }

    /// Zero every particle's shape convergence.
    pub fn reset_shape_convergence(&mut self) {
        for state in &mut self.states {
            state.shape_convergence = 0.0;
        }
    }
}

/// Pick `wanted` distinct indices in `0..total`, evenly spread.
///
/// Slot `s` lands near `s * total / wanted`, offset by up to `jitter` of a
/// slot width. Collisions from the jitter are backfilled by scanning upward
/// from index 0 for unused indices. Returned sorted.
pub fn spread_indices<R: Rng>(total: usize, wanted: usize, jitter: f32, rng: &mut R) -> Vec<usize> {
    let wanted = wanted.min(total);
    if wanted == 0 {
        return Vec::new();
    }

    let spacing = total as f32 / wanted as f32;
    let mut chosen = BTreeSet::new();
    for slot in 0..wanted {
        let offset = (rng.gen::<f32>() - 0.5) * spacing * jitter;
        let idx = (slot as f32 * spacing + offset).floor().max(0.0) as usize;
        chosen.insert(idx.min(total - 1));
    }

    let mut fill = 0;
    while chosen.len() < wanted {
        chosen.insert(fill);
        fill += 1;
    }
    chosen.into_iter().collect()
}

/// Stable pseudo-random value in [0, 1] from a particle's phase seed.
fn stagger_from_phase(phase: f32) -> f32 {
    let h = (phase * 12.9898).sin() * 43_758.547;
    h - h.floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn population(seed: u64) -> (FieldConfig, Population) {
        let config = FieldConfig::default();
        let mut rng = SmallRng::seed_from_u64(seed);
        let pop = Population::create(&config, &mut rng);
        (config, pop)
    }

    #[test]
    fn test_population_counts() {
        let (config, pop) = population(7);
        assert_eq!(pop.len(), config.particle_count);

        let shape = pop.personalities().iter().filter(|p| p.is_shape_particle()).count();
        assert_eq!(shape, config.shape_particle_count());

        let wanderers = pop.personalities().iter().filter(|p| p.is_wanderer).count();
        assert_eq!(wanderers, config.wanderer_count());
    }

    #[test]
    fn test_shape_indices_are_ranked() {
        let (config, pop) = population(3);
        let ranks: Vec<usize> = pop.personalities().iter().filter_map(|p| p.shape_index).collect();
        let expected: Vec<usize> = (0..config.shape_particle_count()).collect();
        assert_eq!(ranks, expected);
    }

    #[test]
    fn test_anchors_exclude_shape_and_wanderers() {
        let (_, pop) = population(11);
        for p in pop.personalities() {
            if p.is_fixed_anchor {
                assert!(!p.is_wanderer);
                assert!(!p.is_shape_particle());
            }
        }
        assert!(pop.personalities().iter().any(|p| p.is_fixed_anchor));
    }

    #[test]
    fn test_personality_ranges() {
        let (config, pop) = population(5);
        let r = &config.personality;
        for (p, s) in pop.personalities().iter().zip(pop.states()) {
            assert!(r.orbit_speed.contains(&p.orbit_speed));
            assert!(r.convergence_delay.contains(&p.convergence_delay));
            assert!(r.final_speed.contains(&p.final_speed));
            assert!((0.0..=r.line_stagger).contains(&p.transition_delay));
            assert!((p.rest_radius - config.base_radius).abs() <= config.radius_jitter / 2.0);
            assert!(p.wander_direction == 1.0 || p.wander_direction == -1.0);
            assert!(r.initial_charge.contains(&s.charge));
            assert!(s.last_spike_time <= 0.0);
            assert_eq!(s.angle, p.base_angle);
        }
    }

    #[test]
    fn test_same_seed_same_population() {
        let (_, a) = population(99);
        let (_, b) = population(99);
        assert_eq!(a.personalities(), b.personalities());
    }

    #[test]
    fn test_spread_indices_even_and_unique() {
        let mut rng = SmallRng::seed_from_u64(1);
        let picked = spread_indices(2000, 300, 0.4, &mut rng);
        assert_eq!(picked.len(), 300);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));

        // No large gaps: every slot-width window holds a pick
        let spacing = 2000 / 300 + 2;
        assert!(picked.windows(2).all(|w| w[1] - w[0] <= spacing * 2));
    }

    #[test]
    fn test_spread_indices_backfills() {
        let mut rng = SmallRng::seed_from_u64(2);
        // Every index wanted: jitter collisions must be filled
        let picked = spread_indices(10, 10, 1.0, &mut rng);
        assert_eq!(picked, (0..10).collect::<Vec<_>>());

        assert!(spread_indices(10, 0, 0.4, &mut rng).is_empty());
        assert_eq!(spread_indices(3, 10, 0.4, &mut rng).len(), 3);
    }
}
