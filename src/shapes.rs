//! Target geometries for shape convergence and the completion sphere.
//!
//! Shapes share one point count and a stable index order, so point `i` of
//! one shape can be interpolated straight into point `i` of the next. The
//! cycle order is sphere, eye, infinity, then back to the sphere.
//!
//! # Example
//!
//! ```ignore
//! let set = generate_shapes(300, 55.0);
//! let mut targets = vec![Vec3::ZERO; set.points_per_shape()];
//! set.morph_at(elapsed, 8.0, &mut targets);
//! ```

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{PI, TAU};

/// Share of each shape's points laid on the closed-form outline.
const OUTLINE_SHARE: f32 = 0.9;

/// Golden angle in radians, for Fibonacci distributions.
fn golden_angle() -> f32 {
    PI * (3.0 - 5f32.sqrt())
}

/// Named target geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Fibonacci sphere shell.
    Sphere,
    /// Almond outline with an iris ring, bulging toward the viewer.
    Eye,
    /// Lemniscate with a gentle depth twist.
    Infinity,
}

impl ShapeKind {
    /// All shapes in morph order.
    pub const CYCLE: [ShapeKind; 3] = [ShapeKind::Sphere, ShapeKind::Eye, ShapeKind::Infinity];

    fn scatter(self) -> f32 {
        match self {
            ShapeKind::Sphere => 0.05,
            ShapeKind::Eye | ShapeKind::Infinity => 0.06,
        }
    }

    /// Unit-scale outline with exactly `count` points.
    fn outline(self, count: usize) -> Vec<Vec3> {
        match self {
            ShapeKind::Sphere => sphere_outline(count),
            ShapeKind::Eye => eye_outline(count),
            ShapeKind::Infinity => infinity_outline(count),
        }
    }
}

/// One named shape at its final scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub points: Vec<Vec3>,
}

/// An ordered list of equally sized shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSet {
    shapes: Vec<Shape>,
    points_per_shape: usize,
}

impl ShapeSet {
    /// Shapes in cycle order.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Number of shapes in the cycle.
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Points in every shape.
    pub fn points_per_shape(&self) -> usize {
        self.points_per_shape
    }

    /// Blend shape `from` into shape `to` at `t`, writing into `out`.
    ///
    /// Computed as `a * (1 - t) + b * t` so that `t = 0` and `t = 1`
    /// reproduce the endpoints exactly.
    pub fn interpolate(&self, from: usize, to: usize, t: f32, out: &mut [Vec3]) {
        let a = &self.shapes[from].points;
        let b = &self.shapes[to].points;
        for ((dst, pa), pb) in out.iter_mut().zip(a).zip(b) {
            *dst = *pa * (1.0 - t) + *pb * t;
        }
    }

    /// Fill `out` with the morph target at `elapsed` seconds.
    ///
    /// Each `period` seconds advances one shape along the cycle, eased with
    /// smoothstep.
    pub fn morph_at(&self, elapsed: f32, period: f32, out: &mut [Vec3]) {
        let n = self.shapes.len();
        if n == 0 {
            return;
        }
        let cycle = (elapsed / period).max(0.0);
        let whole = cycle.floor();
        let from = (whole as usize) % n;
        let to = (from + 1) % n;
        self.interpolate(from, to, smoothstep(cycle - whole), out);
    }
}

/// Generate the morph shapes, each with exactly `points_per_shape` points.
///
/// Deterministic: the padding scatter is seeded from `points_per_shape`.
pub fn generate_shapes(points_per_shape: usize, scale: f32) -> ShapeSet {
    let outline_count = if points_per_shape == 0 {
        0
    } else {
        ((points_per_shape as f32 * OUTLINE_SHARE).floor() as usize).max(1)
    };
    let mut rng = SmallRng::seed_from_u64(0x5eed_0000 ^ points_per_shape as u64);

    let shapes = ShapeKind::CYCLE
        .iter()
        .map(|&kind| Shape {
            kind,
            points: pad_outline(
                &kind.outline(outline_count),
                points_per_shape,
                scale,
                kind.scatter(),
                &mut rng,
            ),
        })
        .collect();

    ShapeSet {
        shapes,
        points_per_shape,
    }
}

/// Scale the outline and pad it with points scattered near random outline points.
fn pad_outline(outline: &[Vec3], count: usize, scale: f32, scatter: f32, rng: &mut SmallRng) -> Vec<Vec3> {
    let mut points: Vec<Vec3> = outline.iter().take(count).map(|p| *p * scale).collect();
    let base_count = points.len();
    if base_count == 0 {
        return points;
    }

    let spread = scatter * scale;
    while points.len() < count {
        let base = points[rng.gen_range(0..base_count)];
        points.push(base + Vec3::new(
            (rng.gen::<f32>() - 0.5) * spread,
            (rng.gen::<f32>() - 0.5) * spread,
            (rng.gen::<f32>() - 0.5) * spread * 0.5,
        ));
    }
    points
}

/// Parameter step `i / (count - 1)` that tolerates a single point.
fn unit_step(i: usize, count: usize) -> f32 {
    i as f32 / (count.max(2) - 1) as f32
}

fn sphere_outline(count: usize) -> Vec<Vec3> {
    let golden = golden_angle();
    (0..count)
        .map(|i| {
            let y = 1.0 - unit_step(i, count) * 2.0;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden * i as f32;
            Vec3::new(theta.cos() * ring, y, theta.sin() * ring) * 0.5
        })
        .collect()
}

fn eye_outline(count: usize) -> Vec<Vec3> {
    let outer = (count as f32 * 0.55).floor() as usize;
    let iris = count - outer;
    let mut points = Vec::with_capacity(count);

    for i in 0..outer {
        let t = i as f32 / outer as f32 * TAU;
        let x = t.cos() * 0.75;
        let y = t.sin() * 0.32 * (1.0 - 0.3 * t.cos() * t.cos());
        // Bulges toward the viewer in the middle, flat at the corners
        let centre_dist = (x * x + y * y).sqrt();
        let z = (0.18 - centre_dist * 0.2).max(0.0) * (t * 0.5 + 0.5).sin();
        points.push(Vec3::new(x, y, z));
    }

    for i in 0..iris {
        let a = i as f32 / iris as f32 * TAU;
        points.push(Vec3::new(a.cos() * 0.18, a.sin() * 0.18, 0.08));
    }
    points
}

fn infinity_outline(count: usize) -> Vec<Vec3> {
    (0..count)
        .map(|i| {
            let t = i as f32 / count as f32 * TAU;
            let denom = 1.0 + t.sin() * t.sin();
            Vec3::new(
                t.cos() / denom * 0.7,
                t.sin() * t.cos() / denom * 0.45,
                // One loop tilts forward, the other back
                t.sin() * 0.15,
            )
        })
        .collect()
}

/// Volumetric completion sphere, one point per particle.
///
/// Radii grow with the index (cube-root spacing from 15% to 100% of
/// `radius`) over a Fibonacci angular spread, so nearby indices are nearby
/// in space.
pub fn generate_final_sphere(count: usize, radius: f32) -> Vec<Vec3> {
    let golden = golden_angle();
    (0..count)
        .map(|i| {
            let t = unit_step(i, count);
            let r = (0.15 + t * 0.85).cbrt() * radius;
            let y = 1.0 - t * 2.0;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden * i as f32;
            Vec3::new(theta.cos() * ring * r, y * r, theta.sin() * ring * r)
        })
        .collect()
}

/// Unit vector along `v`; a zero-length `v` is divided by 1 instead.
#[inline]
pub fn safe_normal(v: Vec3) -> Vec3 {
    let len = v.length();
    if len > 0.0 && len.is_finite() {
        v / len
    } else {
        v
    }
}

/// Hermite smoothstep on [0, 1].
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
