//! Theme-dependent material settings for the renderer.
//!
//! None of this feeds back into the simulation. Point and glow materials
//! switch instantly with the theme; the background eases toward the new
//! theme colour.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// `0xRRGGBB` to linear 0-1 RGB.
pub fn hex_rgb(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

/// Colours and opacities the renderer should use this frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub point_color: Vec3,
    pub point_opacity: f32,
    pub glow_color: Vec3,
    pub glow_opacity: f32,
    pub background: Vec3,
}

impl Appearance {
    /// Target appearance for a theme.
    pub fn for_theme(is_dark: bool) -> Self {
        if is_dark {
            Self {
                point_color: hex_rgb(0xffffff),
                point_opacity: 0.6,
                glow_color: hex_rgb(0x333333),
                glow_opacity: 0.12,
                background: hex_rgb(0x0a0a0a),
            }
        } else {
            Self {
                point_color: hex_rgb(0x1a1a1a),
                point_opacity: 0.45,
                glow_color: hex_rgb(0x4a4a4a),
                glow_opacity: 0.12,
                background: hex_rgb(0xffffff),
            }
        }
    }
}

impl Default for Appearance {
    fn default() -> Self {
        Self::for_theme(true)
    }
}

/// Tracks the eased background across ticks.
#[derive(Debug, Clone, Default)]
pub struct ThemeTracker {
    current: Option<Appearance>,
}

impl ThemeTracker {
    /// A tracker that snaps on its first update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appearance for this tick. The first call snaps to the theme.
    pub fn update(&mut self, is_dark: bool, rate: f32) -> Appearance {
        let target = Appearance::for_theme(is_dark);
        let next = match self.current {
            None => target,
            Some(prev) => Appearance {
                background: prev.background.lerp(target.background, rate),
                ..target
            },
        };
        self.current = Some(next);
        next
    }
}
