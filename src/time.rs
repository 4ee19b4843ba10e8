//! Frame clock driving the simulation.
//!
//! The simulation is a pure function of elapsed seconds and tick order, so
//! the clock only has to produce a monotone `elapsed` per frame. Real-time
//! mode follows the wall clock; fixed-step mode advances by a constant delta
//! regardless of how long a frame took, which makes runs reproducible.
//!
//! # Example
//!
//! ```ignore
//! use orbfield::time::FrameClock;
//!
//! let mut clock = FrameClock::fixed(1.0 / 60.0);
//! for _ in 0..600 {
//!     let elapsed = clock.tick();
//!     sim.tick(&input, elapsed);
//! }
//! println!("{} frames, {:.2}s", clock.frame(), clock.elapsed());
//! ```

use std::time::{Duration, Instant};

/// How a [`FrameClock`] measures each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockMode {
    /// Delta is the wall-clock time since the previous tick.
    RealTime,
    /// Delta is always this many seconds.
    Fixed(f32),
}

/// Elapsed time, delta and frame count for a tick loop.
///
/// Elapsed time accumulates scaled deltas, so pausing and time scaling
/// never make it jump backwards.
#[derive(Debug, Clone)]
pub struct FrameClock {
    mode: ClockMode,
    last_frame: Instant,
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    /// Measured frames per second (real-time mode only).
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    paused: bool,
    time_scale: f32,
}

impl FrameClock {
    /// A clock at zero in `mode`.
    pub fn new(mode: ClockMode) -> Self {
        let now = Instant::now();
        Self {
            mode,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            time_scale: 1.0,
        }
    }

    /// Wall-clock driven.
    pub fn real_time() -> Self {
        Self::new(ClockMode::RealTime)
    }

    /// Constant step of `delta` seconds. Negative steps are treated as zero.
    pub fn fixed(delta: f32) -> Self {
        Self::new(ClockMode::Fixed(delta.max(0.0)))
    }

    /// Advance one frame and return the new elapsed time.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let raw_delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if self.paused {
            self.delta_secs = 0.0;
            return self.elapsed_secs;
        }

        let delta = match self.mode {
            ClockMode::RealTime => raw_delta,
            ClockMode::Fixed(step) => step,
        };
        self.delta_secs = delta * self.time_scale;
        self.elapsed_secs += self.delta_secs;
        self.frame_count += 1;

        if let ClockMode::RealTime = self.mode {
            let since = now.duration_since(self.fps_update_time);
            if since >= self.fps_update_interval {
                let frames = self.frame_count - self.fps_frame_count;
                self.fps = frames as f32 / since.as_secs_f32();
                self.fps_frame_count = self.frame_count;
                self.fps_update_time = now;
            }
        }

        self.elapsed_secs
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Frames advanced so far (paused ticks excluded).
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Measured frames per second; in fixed mode the nominal rate.
    pub fn fps(&self) -> f32 {
        match self.mode {
            ClockMode::RealTime => self.fps,
            ClockMode::Fixed(step) if step > 0.0 => 1.0 / step,
            ClockMode::Fixed(_) => 0.0,
        }
    }

    /// How deltas are produced.
    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop accumulating time.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Continue accumulating time.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Flip between paused and running.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Set the time scale multiplier. Negative values clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Back to frame zero, keeping mode and scale.
    pub fn reset(&mut self) {
        *self = Self {
            time_scale: self.time_scale,
            ..Self::new(self.mode)
        };
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::real_time()
    }
}
