//! Tunable constants for the particle field.
//!
//! Every number the engine uses lives in [`FieldConfig`]. The defaults
//! reproduce the shipped onboarding backdrop; partial JSON files override
//! only the fields they name.
//!
//! # Example
//!
//! ```ignore
//! let mut config = FieldConfig::default();
//! config.particle_count = 500;
//! config.spikes.power = 10.0..20.0;
//! config.validate()?;
//!
//! config.save("field.json")?;
//! let back = FieldConfig::load("field.json")?;
//! ```

use crate::error::ConfigError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::Range;
use std::path::Path;

/// Per-onboarding-step visual parameters.
///
/// The active step selects one of these every tick. Radius, breathing and
/// orbit speed are eased toward the new values; the spike parameters apply
/// immediately.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StepConfig {
    /// Target ring radius.
    pub radius: f32,
    /// Amplitude of the slow global breathing.
    pub breathe: f32,
    /// Multiplier on every particle's orbit speed.
    pub orbit_speed_multiplier: f32,
    /// Multiplier on the natural spike charge rate.
    pub charge_rate_multiplier: f32,
    /// Maximum concurrently active natural spikes.
    pub max_spikes: usize,
    /// Multiplier on natural spike power.
    pub spike_power_multiplier: f32,
    /// Multiplier on the post-spike cooldown.
    pub cooldown_multiplier: f32,
    /// Probability (0-1) that a natural spike points inward.
    pub inward_bias: f32,
    /// Multiplier on wanderer drift amplitude.
    pub wander_amplitude_multiplier: f32,
}

/// Ordered step presets. Step `n` (1-based) is entry `n - 1`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct StepTable(pub Vec<StepConfig>);

impl StepTable {
    /// Look up a step, falling back to step 1 for unknown values.
    ///
    /// Returns the resolved config and whether `step` was known.
    pub fn resolve(&self, step: u32) -> (&StepConfig, bool) {
        match step.checked_sub(1).and_then(|i| self.0.get(i as usize)) {
            Some(cfg) => (cfg, true),
            None => (&self.0[0], false),
        }
    }

    /// Number of defined steps.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no steps.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest `max_spikes` across all steps.
    pub fn max_spikes_any(&self) -> usize {
        self.0.iter().map(|s| s.max_spikes).max().unwrap_or(0)
    }
}

impl Default for StepTable {
    fn default() -> Self {
        let step = |radius: f32,
                    breathe: f32,
                    orbit: f32,
                    charge: f32,
                    max_spikes: usize,
                    power: f32,
                    cooldown: f32,
                    inward: f32,
                    wander: f32| {
            StepConfig {
                radius,
                breathe,
                orbit_speed_multiplier: orbit,
                charge_rate_multiplier: charge,
                max_spikes,
                spike_power_multiplier: power,
                cooldown_multiplier: cooldown,
                inward_bias: inward,
                wander_amplitude_multiplier: wander,
            }
        };
        StepTable(vec![
            // Profile: a loose line, rare soft spikes
            step(55.0, 1.2, 0.3, 0.5, 1, 0.4, 2.0, 0.4, 0.6),
            step(120.0, 3.0, 0.7, 1.2, 2, 0.7, 1.2, 0.35, 1.0),
            step(180.0, 4.5, 1.3, 2.5, 3, 1.0, 0.5, 0.4, 1.4),
            // Assistant naming: fast orbit, constant activity
            step(200.0, 4.0, 1.8, 4.0, 5, 1.2, 0.25, 0.3, 1.8),
            step(120.0, 3.5, 1.0, 1.5, 3, 0.6, 1.0, 0.35, 1.2),
            step(140.0, 3.0, 0.8, 1.0, 2, 0.5, 1.5, 0.4, 1.0),
        ])
    }
}

/// Natural (stochastic) spike channel.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpikeConfig {
    /// Charge gained per tick before step and personality multipliers.
    pub charge_rate: f32,
    /// Seconds a leader must wait before charging again.
    pub base_cooldown: f32,
    /// Minimum angle (radians) between a new leader and any active leader.
    pub min_separation: f32,
    /// Charge a blocked candidate is clamped to.
    pub near_ready_charge: f32,
    /// Leader displacement range before multipliers.
    pub power: Range<f32>,
    /// Lifetime range in seconds.
    pub duration: Range<f32>,
    /// Share of the leader displacement passed to neighbors.
    pub attraction_strength: f32,
    /// Angular influence radius (radians).
    pub max_angular_dist: f32,
    /// Fraction of the remaining gap closed per tick by particles outside any spike.
    pub relax_rate: f32,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            charge_rate: 0.003,
            base_cooldown: 10.0,
            min_separation: 0.9,
            near_ready_charge: 0.7,
            power: 25.0..55.0,
            duration: 4.0..8.0,
            attraction_strength: 0.85,
            max_angular_dist: 0.2,
            relax_rate: 0.1,
        }
    }
}

/// Event-triggered spike channel.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TriggeredSpikeConfig {
    /// Fixed outward leader displacement.
    pub power: f32,
    /// Lifetime in seconds.
    pub duration: f32,
    /// Influence radius as a multiple of the natural `max_angular_dist`.
    pub influence_scale: f32,
    /// Fraction of the lifetime spent ramping in.
    pub ramp_fraction: f32,
    /// Seconds for a label to fade in.
    pub label_fade_in: f32,
    /// Seconds before expiry at which a label starts fading out.
    pub label_fade_out: f32,
}

impl Default for TriggeredSpikeConfig {
    fn default() -> Self {
        Self {
            power: 18.0,
            duration: 120.0,
            influence_scale: 1.75,
            ramp_fraction: 0.02,
            label_fade_in: 1.2,
            label_fade_out: 2.0,
        }
    }
}

/// One parameter set for the final-sphere heartbeat.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HeartbeatParams {
    /// Seconds before a leader may charge again.
    pub cooldown: f32,
    /// Charge gained per tick before the personality multiplier.
    pub charge_rate: f32,
    /// Maximum concurrent heartbeat spikes.
    pub max_spikes: usize,
    /// Radial displacement range.
    pub power: Range<f32>,
    /// Lifetime range in seconds.
    pub duration: Range<f32>,
}

/// Final-sphere heartbeat channel.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Global final progress above which the heartbeat runs.
    pub activation: f32,
    /// Global final progress at which the `settled` parameters take over.
    pub settle_threshold: f32,
    /// Minimum normal dot product for a neighbor to follow a leader.
    pub cone_dot: f32,
    /// Share of the leader displacement passed to neighbors.
    pub neighbor_strength: f32,
    /// Parameters while the sphere is still forming.
    pub calm: HeartbeatParams,
    /// Parameters once the sphere has settled.
    pub settled: HeartbeatParams,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            activation: 0.5,
            settle_threshold: 0.98,
            cone_dot: 0.85,
            neighbor_strength: 0.7,
            calm: HeartbeatParams {
                cooldown: 8.0,
                charge_rate: 0.004,
                max_spikes: 3,
                power: 8.0..22.0,
                duration: 5.0..9.0,
            },
            settled: HeartbeatParams {
                cooldown: 4.5,
                charge_rate: 0.007,
                max_spikes: 5,
                power: 12.0..28.0,
                duration: 4.0..7.0,
            },
        }
    }
}

/// Exponential smoothing rates, all per tick.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhaseRates {
    pub line_to_circle: f32,
    pub shape: f32,
    pub final_sphere: f32,
    /// Rate at which radius, breathing and orbit speed follow the step.
    pub step_params: f32,
    pub pulse_decay: f32,
    pub pulse_impulse: f32,
    /// Minimum per-tick rise in form progress that fires a pulse.
    pub pulse_threshold: f32,
    /// Background colour easing (cosmetic).
    pub background: f32,
}

impl Default for PhaseRates {
    fn default() -> Self {
        Self {
            line_to_circle: 0.02,
            shape: 0.006,
            final_sphere: 0.008,
            step_params: 0.006,
            pulse_decay: 0.985,
            pulse_impulse: 0.4,
            pulse_threshold: 0.01,
            background: 0.05,
        }
    }
}

/// Ranges for the per-particle personality draws.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersonalityRanges {
    pub orbit_speed: Range<f32>,
    pub wander_amplitude: Range<f32>,
    pub wander_speed: Range<f32>,
    pub convergence_delay: Range<f32>,
    pub convergence_speed: Range<f32>,
    pub final_delay: Range<f32>,
    pub final_speed: Range<f32>,
    pub charge_rate_multiplier: Range<f32>,
    pub initial_charge: Range<f32>,
    /// Largest per-particle delay in the line-to-circle cascade.
    pub line_stagger: f32,
}

impl Default for PersonalityRanges {
    fn default() -> Self {
        Self {
            orbit_speed: 0.0003..0.0018,
            wander_amplitude: 8.0..25.0,
            wander_speed: 0.3..0.8,
            convergence_delay: 0.0..0.35,
            convergence_speed: 0.008..0.025,
            final_delay: 0.0..0.5,
            final_speed: 0.006..0.024,
            charge_rate_multiplier: 0.5..1.5,
            initial_charge: 0.0..0.3,
            line_stagger: 0.25,
        }
    }
}

/// Layout of the step-1 "line" of strands.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LineConfig {
    pub strands: usize,
    /// Total horizontal extent.
    pub width: f32,
    /// Vertical gap between neighbouring strands at the centre.
    pub strand_spread: f32,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            strands: 5,
            width: 400.0,
            strand_spread: 20.0,
        }
    }
}

/// Complete configuration for a particle field.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldConfig {
    pub particle_count: usize,
    pub base_radius: f32,
    /// Total width of the per-particle rest radius jitter (centred on zero).
    pub radius_jitter: f32,
    pub potential_anomaly_chance: f32,
    /// Fraction of ordinary particles pinned against spike displacement.
    pub fixed_anchor_fraction: f32,
    pub wanderer_fraction: f32,
    pub shape_fraction: f32,
    pub shape_scale: f32,
    pub final_sphere_radius: f32,
    /// Outward push applied to non-shape particles while a shape forms.
    pub convergence_outward_push: f32,
    /// Seconds per shape-to-shape morph.
    pub morph_period: f32,
    pub line: LineConfig,
    pub spikes: SpikeConfig,
    pub triggered: TriggeredSpikeConfig,
    pub heartbeat: HeartbeatConfig,
    pub rates: PhaseRates,
    pub personality: PersonalityRanges,
    pub steps: StepTable,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            particle_count: 2000,
            base_radius: 100.0,
            radius_jitter: 6.0,
            potential_anomaly_chance: 0.08,
            fixed_anchor_fraction: 0.12,
            wanderer_fraction: 0.06,
            shape_fraction: 0.15,
            shape_scale: 55.0,
            final_sphere_radius: 65.0,
            convergence_outward_push: 10.0,
            morph_period: 8.0,
            line: LineConfig::default(),
            spikes: SpikeConfig::default(),
            triggered: TriggeredSpikeConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            rates: PhaseRates::default(),
            personality: PersonalityRanges::default(),
            steps: StepTable::default(),
        }
    }
}

impl FieldConfig {
    /// Number of particles that take part in shape convergence.
    pub fn shape_particle_count(&self) -> usize {
        (self.particle_count as f32 * self.shape_fraction).floor() as usize
    }

    /// Number of wanderers.
    pub fn wanderer_count(&self) -> usize {
        (self.particle_count as f32 * self.wanderer_fraction).floor() as usize
    }

    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: FieldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a JSON config and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Check every constraint the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::invalid("particle_count", "must be at least 1"));
        }
        if self.line.strands == 0 {
            return Err(ConfigError::invalid("line.strands", "must be at least 1"));
        }
        if self.steps.is_empty() {
            return Err(ConfigError::invalid("steps", "at least one step is required"));
        }
        if !(self.morph_period > 0.0) {
            return Err(ConfigError::invalid("morph_period", "must be positive"));
        }

        let fractions = [
            ("potential_anomaly_chance", self.potential_anomaly_chance),
            ("fixed_anchor_fraction", self.fixed_anchor_fraction),
            ("wanderer_fraction", self.wanderer_fraction),
            ("shape_fraction", self.shape_fraction),
            ("spikes.relax_rate", self.spikes.relax_rate),
            ("spikes.near_ready_charge", self.spikes.near_ready_charge),
            ("triggered.ramp_fraction", self.triggered.ramp_fraction),
            ("heartbeat.activation", self.heartbeat.activation),
            ("heartbeat.settle_threshold", self.heartbeat.settle_threshold),
            ("personality.line_stagger", self.personality.line_stagger),
            ("rates.line_to_circle", self.rates.line_to_circle),
            ("rates.shape", self.rates.shape),
            ("rates.final_sphere", self.rates.final_sphere),
            ("rates.step_params", self.rates.step_params),
            ("rates.pulse_decay", self.rates.pulse_decay),
            ("rates.background", self.rates.background),
        ];
        for (field, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(field, format!("{value} is outside [0, 1]")));
            }
        }
        if self.heartbeat.cone_dot >= 1.0 || self.heartbeat.cone_dot < -1.0 {
            return Err(ConfigError::invalid("heartbeat.cone_dot", "must be in [-1, 1)"));
        }

        let ranges = [
            ("spikes.power", &self.spikes.power),
            ("spikes.duration", &self.spikes.duration),
            ("heartbeat.calm.power", &self.heartbeat.calm.power),
            ("heartbeat.calm.duration", &self.heartbeat.calm.duration),
            ("heartbeat.settled.power", &self.heartbeat.settled.power),
            ("heartbeat.settled.duration", &self.heartbeat.settled.duration),
            ("personality.orbit_speed", &self.personality.orbit_speed),
            ("personality.wander_amplitude", &self.personality.wander_amplitude),
            ("personality.wander_speed", &self.personality.wander_speed),
            ("personality.convergence_delay", &self.personality.convergence_delay),
            ("personality.convergence_speed", &self.personality.convergence_speed),
            ("personality.final_delay", &self.personality.final_delay),
            ("personality.final_speed", &self.personality.final_speed),
            ("personality.charge_rate_multiplier", &self.personality.charge_rate_multiplier),
            ("personality.initial_charge", &self.personality.initial_charge),
        ];
        for (field, range) in ranges {
            if range.start > range.end {
                return Err(ConfigError::invalid(
                    field,
                    format!("start {} exceeds end {}", range.start, range.end),
                ));
            }
        }
        // Delays are divided by (1 - delay)
        for (field, range) in [
            ("personality.convergence_delay", &self.personality.convergence_delay),
            ("personality.final_delay", &self.personality.final_delay),
        ] {
            if range.start < 0.0 || range.end >= 1.0 {
                return Err(ConfigError::invalid(field, "delays must lie in [0, 1)"));
            }
        }

        let durations = [
            ("spikes.duration", self.spikes.duration.start),
            ("heartbeat.calm.duration", self.heartbeat.calm.duration.start),
            ("heartbeat.settled.duration", self.heartbeat.settled.duration.start),
            ("triggered.duration", self.triggered.duration),
        ];
        for (field, value) in durations {
            if !(value > 0.0) {
                return Err(ConfigError::invalid(field, "durations must be positive"));
            }
        }
        if !(self.spikes.max_angular_dist > 0.0) {
            return Err(ConfigError::invalid("spikes.max_angular_dist", "must be positive"));
        }
        if !(self.triggered.influence_scale > 0.0) {
            return Err(ConfigError::invalid("triggered.influence_scale", "must be positive"));
        }

        for step in &self.steps.0 {
            if !(0.0..=1.0).contains(&step.inward_bias) {
                return Err(ConfigError::invalid("steps.inward_bias", "must lie in [0, 1]"));
            }
            if step.cooldown_multiplier < 0.0 || step.charge_rate_multiplier < 0.0 {
                return Err(ConfigError::invalid(
                    "steps",
                    "cooldown and charge multipliers must not be negative",
                ));
            }
        }
        Ok(())
    }
}

/// Uniform draw from `range`, tolerating empty ranges.
pub(crate) fn sample<R: Rng>(rng: &mut R, range: &Range<f32>) -> f32 {
    if range.start < range.end {
        rng.gen_range(range.clone())
    } else {
        range.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_validates() {
        FieldConfig::default().validate().unwrap();
    }

    #[test]
    fn test_unknown_step_falls_back_to_first() {
        let table = StepTable::default();
        let (cfg, known) = table.resolve(42);
        assert!(!known);
        assert_eq!(cfg, &table.0[0]);

        let (cfg, known) = table.resolve(0);
        assert!(!known);
        assert_eq!(cfg.radius, 55.0);

        let (cfg, known) = table.resolve(4);
        assert!(known);
        assert_eq!(cfg.max_spikes, 5);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = FieldConfig::from_json(r#"{ "particle_count": 300, "spikes": { "charge_rate": 0.01 } }"#)
            .unwrap();
        assert_eq!(config.particle_count, 300);
        assert_eq!(config.spikes.charge_rate, 0.01);
        assert_eq!(config.spikes.min_separation, 0.9);
        assert_eq!(config.steps.len(), 6);
    }

    #[test]
    fn test_json_round_trip() {
        let config = FieldConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(FieldConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = FieldConfig::default();
        config.particle_count = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "particle_count", .. })
        ));

        let mut config = FieldConfig::default();
        config.spikes.power = 60.0..10.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "spikes.power", .. })
        ));

        let mut config = FieldConfig::default();
        config.shape_fraction = 1.5;
        assert!(config.validate().is_err());

        let mut config = FieldConfig::default();
        config.steps = StepTable(Vec::new());
        assert!(config.validate().is_err());

        let mut config = FieldConfig::default();
        config.personality.final_delay = 0.0..1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = FieldConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_sample_empty_range() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(sample(&mut rng, &(3.0..3.0)), 3.0);
        let v = sample(&mut rng, &(1.0..2.0));
        assert!((1.0..2.0).contains(&v));
    }

    #[test]
    fn test_derived_counts() {
        let config = FieldConfig::default();
        assert_eq!(config.shape_particle_count(), 300);
        assert_eq!(config.wanderer_count(), 120);
    }
}
