//! Per-tick integration of every layer into the output buffers.
//!
//! For each particle, in order:
//!
//! 1. advance the orbit angle
//! 2. wander offset (wanderers only)
//! 3. line and circle positions
//! 4. staggered line-to-circle blend
//! 5. shape convergence, or the outward push for non-shape particles
//! 6. completion sphere convergence
//! 7. processing size pulse
//! 8. point and glow size
//!
//! Buffers are reused between ticks. Positions are plain `Vec3`, so the
//! flat `[f32; 3N]` view the renderer uploads is a zero-copy cast.

use crate::config::{FieldConfig, LineConfig, StepConfig};
use crate::phase::{delayed_progress, ease_out_cubic, ease_out_quart, smooth_toward, PhaseLevels, StepParams};
use crate::population::{Personality, Population};
use crate::spike::{SphereHeartbeat, SpikeField};
use crate::visuals::Appearance;
use glam::{Quat, Vec2, Vec3};
use serde::Serialize;
use std::f32::consts::PI;

/// Global progress below which a convergence layer is skipped.
const ACTIVE_EPSILON: f32 = 0.003;
/// Per-tick decay of convergence while its layer is inactive.
const CONVERGENCE_DECAY: f32 = 0.97;
const BASE_POINT_SIZE: f32 = 3.5;
const BASE_GLOW_SIZE: f32 = 18.0;
/// Glow sprites sit this far behind their point.
const GLOW_DEPTH_OFFSET: f32 = 1.0;

/// A label the overlay should draw for a triggered spike.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelPlacement {
    pub id: String,
    pub category: String,
    pub text: String,
    pub world_position: Vec3,
    pub opacity: f32,
}

/// Everything the renderer reads after a tick.
#[derive(Debug, Clone, Default)]
pub struct FrameOutput {
    positions: Vec<Vec3>,
    sizes: Vec<f32>,
    glow_positions: Vec<Vec3>,
    glow_sizes: Vec<f32>,
    labels: Vec<LabelPlacement>,
    appearance: Appearance,
}

impl FrameOutput {
    /// Zeroed buffers for `count` particles.
    pub fn with_capacity(count: usize) -> Self {
        Self {
            positions: vec![Vec3::ZERO; count],
            sizes: vec![0.0; count],
            glow_positions: vec![Vec3::ZERO; count],
            glow_sizes: vec![0.0; count],
            labels: Vec::new(),
            appearance: Appearance::default(),
        }
    }

    /// Number of particles in each buffer.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the buffers are empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Point positions, one per particle.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Positions as `x, y, z` triples.
    pub fn positions_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Point sizes in pixels.
    pub fn sizes(&self) -> &[f32] {
        &self.sizes
    }

    /// Glow sprite positions, just behind each point.
    pub fn glow_positions(&self) -> &[Vec3] {
        &self.glow_positions
    }

    /// Glow positions as `x, y, z` triples.
    pub fn glow_positions_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.glow_positions)
    }

    /// Glow sprite sizes in pixels.
    pub fn glow_sizes(&self) -> &[f32] {
        &self.glow_sizes
    }

    /// Raw bytes of the position buffer, ready for upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// One label per active triggered spike.
    pub fn labels(&self) -> &[LabelPlacement] {
        &self.labels
    }

    /// Colours for the current theme.
    pub fn appearance(&self) -> Appearance {
        self.appearance
    }

    pub(crate) fn set_appearance(&mut self, appearance: Appearance) {
        self.appearance = appearance;
    }

    fn resize(&mut self, count: usize) {
        self.positions.resize(count, Vec3::ZERO);
        self.sizes.resize(count, 0.0);
        self.glow_positions.resize(count, Vec3::ZERO);
        self.glow_sizes.resize(count, 0.0);
    }
}

/// Read-only inputs to one integration pass.
#[derive(Debug, Clone, Copy)]
pub struct FrameParams<'a> {
    pub elapsed: f32,
    pub config: &'a FieldConfig,
    pub step: &'a StepConfig,
    pub levels: PhaseLevels,
    pub params: StepParams,
    pub rotation: Quat,
    /// Processing and not yet complete.
    pub size_pulse: bool,
    pub morph_targets: &'a [Vec3],
    pub final_sphere: &'a [Vec3],
}

/// Eased per-particle line-to-circle blend.
pub fn line_blend(global: f32, transition_delay: f32) -> f32 {
    let local = ((global - transition_delay) / (1.0 - transition_delay)).clamp(0.0, 1.0);
    ease_out_cubic(local)
}

/// Vertical offset of `strand` at full envelope, centred on zero.
pub fn strand_offset(strand: usize, strands: usize, spread: f32) -> f32 {
    (strand as f32 - (strands.max(1) as f32 - 1.0) / 2.0) * spread
}

/// Position of particle `index` in the organic step-1 line.
pub fn line_position(index: usize, count: usize, p: &Personality, elapsed: f32, line: &LineConfig) -> Vec3 {
    let strands = line.strands.max(1);
    let strand = (index % strands) as f32;
    let per_strand = (count / strands).max(1) as f32;
    let strand_t = (index / strands) as f32 / per_strand;
    let x = (strand_t - 0.5) * line.width;

    // Strands pinch together at both ends
    let envelope = (PI * strand_t).sin().powi(2);
    let offset = strand_offset(index % strands, strands, line.strand_spread) * envelope;

    let seed = strand * 137.5;
    let waves = (strand_t * PI * 4.0 + elapsed * (0.7 + strand * 0.2) + seed).sin() * 10.0
        + (strand_t * PI * 7.0 + elapsed * (1.1 + strand * 0.15) + seed * 0.7).sin() * 5.0
        + (strand_t * PI * 11.0 + elapsed * (0.5 + strand * 0.25) + p.breathe_offset).sin() * 3.0;
    let base_y = offset + waves * envelope;

    let escape_phase = p.breathe_offset + elapsed * p.wander_speed * 2.0;
    let escape = escape_phase.sin() * (escape_phase * 0.37).sin();
    let escape_dist = p.wander_amplitude * 0.8 * escape * envelope;
    let escape_angle = p.breathe_offset * 3.0 + elapsed * 0.3;

    let y = base_y + escape_angle.sin() * escape_dist;
    let z = escape_angle.cos() * escape_dist + (p.breathe_offset + elapsed * 0.3 + strand).sin() * 3.0 * envelope;
    Vec3::new(x, y, z)
}

/// Wander offset on the ring radius, zero for non-wanderers.
pub fn wander_offset(p: &Personality, elapsed: f32, step: &StepConfig) -> f32 {
    if !p.is_wanderer {
        return 0.0;
    }
    (elapsed * p.wander_speed + p.wander_phase).sin() * p.wander_amplitude * step.wander_amplitude_multiplier * p.wander_direction
}

/// Multiplicative size pulse keyed to the particle's azimuth.
pub fn processing_pulse(position: Vec3, elapsed: f32) -> f32 {
    let theta = position.y.atan2(position.x);
    1.0 + (elapsed * 4.0 + theta * 3.0).sin() * 0.4 + (elapsed * 7.0 + theta * 5.0).sin() * 0.15
}

/// Blend every layer and write the output buffers.
pub fn integrate(
    frame: &FrameParams<'_>,
    population: &mut Population,
    spikes: &SpikeField,
    heartbeat: &SphereHeartbeat,
    out: &mut FrameOutput,
) {
    let elapsed = frame.elapsed;
    let config = frame.config;
    let levels = frame.levels;
    let radius_offset = frame.params.radius - config.base_radius;
    let breathe = (elapsed * 0.5).sin() * frame.params.breathe;
    let pulse_kick = levels.pulse * 3.0;

    let count = population.len();
    out.resize(count);
    let (personalities, states) = population.split_mut();

    for (i, (p, state)) in personalities.iter().zip(states.iter_mut()).enumerate() {
        state.angle += p.orbit_speed * frame.params.orbit_speed;
        let angle = state.angle;
        let (sin, cos) = angle.sin_cos();

        let wander = wander_offset(p, elapsed, frame.step);
        let ring = state.radius + breathe + wander + pulse_kick;
        let circle = Vec3::new(cos * ring, sin * ring, 0.0);
        let line = line_position(i, count, p, elapsed, &config.line);
        let mut pos = line.lerp(circle, line_blend(levels.line_to_circle, p.transition_delay));

        if levels.shape > ACTIVE_EPSILON {
            match p.shape_index.and_then(|si| frame.morph_targets.get(si).map(|t| (si, *t))) {
                Some((si, target)) => {
                    let goal = delayed_progress(levels.shape, p.convergence_delay);
                    state.shape_convergence = smooth_toward(state.shape_convergence, goal, p.convergence_speed);
                    let eased = ease_out_quart(state.shape_convergence);

                    let si = si as f32;
                    let wobble = (elapsed * 0.6 + si * 0.04).sin() * 3.0 + (elapsed * 1.1 + si * 0.07).sin() * 1.2;
                    let local = target + Vec3::new(cos * wobble, sin * wobble, 0.0);
                    let target = frame.rotation * local;
                    pos = Vec3::new(
                        circle.x + (target.x - circle.x) * eased,
                        circle.y + (target.y - circle.y) * eased,
                        target.z * eased,
                    );
                }
                None => {
                    let push = levels.shape.min(1.0) * config.convergence_outward_push;
                    let dir = Vec2::new(circle.x, circle.y).try_normalize().unwrap_or(Vec2::X);
                    pos.x = circle.x + dir.x * push;
                    pos.y = circle.y + dir.y * push;
                    state.shape_convergence *= CONVERGENCE_DECAY;
                }
            }
        } else {
            state.shape_convergence *= CONVERGENCE_DECAY;
        }

        if levels.final_sphere > ACTIVE_EPSILON {
            let goal = delayed_progress(levels.final_sphere, p.final_delay);
            state.final_convergence = smooth_toward(state.final_convergence, goal, p.final_speed);
            let eased = ease_out_cubic(state.final_convergence);

            let home = frame.final_sphere.get(i).copied().unwrap_or(Vec3::ZERO);
            let swell = 1.0 + (elapsed * 0.4 + i as f32 * 0.003).sin() * 0.04;
            let local = home * swell + heartbeat.normal(i) * heartbeat.displacement(i);
            pos = pos.lerp(frame.rotation * local, eased);
        } else {
            state.final_convergence *= CONVERGENCE_DECAY;
        }

        let size_mul = if frame.size_pulse {
            processing_pulse(pos, elapsed)
        } else {
            1.0
        };

        let rest = p.rest_radius + radius_offset;
        let disp = (state.radius - rest).abs() + wander.abs() * 0.3;

        out.positions[i] = pos;
        out.sizes[i] = BASE_POINT_SIZE * (1.0 + (disp * 0.04).min(2.0)) * size_mul;
        out.glow_positions[i] = pos - Vec3::Z * GLOW_DEPTH_OFFSET;
        out.glow_sizes[i] = BASE_GLOW_SIZE * (1.0 + (disp * 0.06).min(3.0));
    }

    out.labels.clear();
    for spike in spikes.triggered() {
        let Some(event) = spike.event() else { continue };
        let Some(state) = states.get(spike.leader) else { continue };
        let (sin, cos) = state.angle.sin_cos();
        out.labels.push(LabelPlacement {
            id: event.id.clone(),
            category: event.category.clone(),
            text: event.text.clone(),
            world_position: Vec3::new(cos * state.radius, sin * state.radius, 0.0),
            opacity: spike.label_opacity(elapsed, config.triggered.label_fade_in, config.triggered.label_fade_out),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StepTable;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn personality() -> Personality {
        let config = FieldConfig {
            particle_count: 10,
            ..FieldConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(1);
        Population::create(&config, &mut rng).personalities()[0].clone()
    }

    #[test]
    fn test_line_spans_width() {
        let p = personality();
        let line = LineConfig::default();
        let first = line_position(0, 2000, &p, 0.0, &line);
        let last = line_position(1999, 2000, &p, 0.0, &line);
        assert!((first.x + 200.0).abs() < 1e-3);
        assert!(last.x > 190.0 && last.x < 200.0);
        // Envelope is zero at the ends, so only the escape term is left there
        assert!(first.y.abs() < 1e-3 && first.z.abs() < 1e-3);
    }

    #[test]
    fn test_strand_offsets_centred() {
        let three: Vec<f32> = (0..3).map(|s| strand_offset(s, 3, 20.0)).collect();
        assert_eq!(three, vec![-20.0, 0.0, 20.0]);
        let five: Vec<f32> = (0..5).map(|s| strand_offset(s, 5, 20.0)).collect();
        assert_eq!(five, vec![-40.0, -20.0, 0.0, 20.0, 40.0]);
        assert_eq!((0..4).map(|s| strand_offset(s, 4, 10.0)).sum::<f32>(), 0.0);
        assert_eq!(strand_offset(0, 1, 20.0), 0.0);
    }

    #[test]
    fn test_line_uses_centred_spread() {
        let p = personality();
        let spread = LineConfig {
            strands: 3,
            ..LineConfig::default()
        };
        let flat = LineConfig {
            strand_spread: 0.0,
            ..spread.clone()
        };
        // Indices 150..153 of 300 sit mid-line, where the envelope is 1
        for (i, expected) in (150..153).zip([-20.0, 0.0, 20.0]) {
            let dy = line_position(i, 300, &p, 0.7, &spread).y - line_position(i, 300, &p, 0.7, &flat).y;
            assert!((dy - expected).abs() < 1e-3, "index {i}: {dy}");
        }
    }

    #[test]
    fn test_line_tolerates_tiny_population() {
        let p = personality();
        let line = LineConfig::default();
        for i in 0..3 {
            assert!(line_position(i, 3, &p, 1.0, &line).is_finite());
        }
    }

    #[test]
    fn test_line_blend_staggered() {
        assert_eq!(line_blend(0.0, 0.1), 0.0);
        assert_eq!(line_blend(1.0, 0.2), 1.0);
        assert!(line_blend(0.5, 0.0) > line_blend(0.5, 0.25));
    }

    #[test]
    fn test_wander_only_for_wanderers() {
        let mut p = personality();
        let steps = StepTable::default();
        let (step, _) = steps.resolve(2);
        p.is_wanderer = false;
        assert_eq!(wander_offset(&p, 3.0, step), 0.0);
        p.is_wanderer = true;
        assert!(wander_offset(&p, 3.0, step).abs() <= p.wander_amplitude * step.wander_amplitude_multiplier);
    }

    #[test]
    fn test_processing_pulse_positive() {
        for k in 0..64 {
            let a = k as f32 * 0.1;
            let m = processing_pulse(Vec3::new(a.cos(), a.sin(), 0.0), a * 3.0);
            assert!(m >= 0.45 - 1e-5 && m <= 1.55 + 1e-5);
        }
        // Azimuth of the origin is zero, still finite
        assert!(processing_pulse(Vec3::ZERO, 1.0).is_finite());
    }

    #[test]
    fn test_flat_views() {
        let out = FrameOutput::with_capacity(4);
        assert_eq!(out.positions_flat().len(), 12);
        assert_eq!(out.position_bytes().len(), 48);
        assert_eq!(out.glow_sizes().len(), 4);
    }
}
