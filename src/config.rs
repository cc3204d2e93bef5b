// config.rs — Run configuration.
//
// One immutable value, built once and passed by reference to every
// component constructor. Defaults suit handheld 480p-720p footage
// sampled at every other frame.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Keep every n-th decoded frame (`index % frame_step == 0`).
    pub frame_step: usize,
    /// Stop after this many sampled frames.
    pub max_frames: usize,

    // Shi-Tomasi detection.
    /// 0 means no limit.
    pub max_corners: usize,
    pub quality_level: f32,
    pub min_distance: f32,
    pub block_size: usize,

    // Pyramidal Lucas-Kanade.
    /// Full window width in pixels (odd).
    pub lk_win_size: usize,
    /// Index of the coarsest pyramid level; `lk_max_level + 1` levels are used.
    pub lk_max_level: usize,
    pub lk_max_iterations: usize,
    pub lk_epsilon: f32,

    // Canny.
    pub canny_low: f32,
    pub canny_high: f32,

    // Map accumulation.
    pub canvas_size: usize,
    /// Canvas pixels per step, applied as `-d * pixels_per_step / 10`.
    pub pixels_per_step: f64,
    /// Path units: `-d / path_divisor`.
    pub path_divisor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            frame_step: 2,
            max_frames: 2000,
            max_corners: 300,
            quality_level: 0.01,
            min_distance: 8.0,
            block_size: 7,
            lk_win_size: 21,
            lk_max_level: 3,
            lk_max_iterations: 30,
            lk_epsilon: 0.01,
            canny_low: 60.0,
            canny_high: 160.0,
            canvas_size: 900,
            pixels_per_step: 2.5,
            path_divisor: 50.0,
        }
    }
}

impl Config {
    /// Apply command-line overrides. `None` keeps the current value.
    pub fn with_overrides(mut self, frame_step: Option<usize>, max_frames: Option<usize>) -> Self {
        if let Some(step) = frame_step {
            self.frame_step = step;
        }
        if let Some(max) = max_frames {
            self.max_frames = max;
        }
        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::InvalidConfig(msg));

        if self.frame_step == 0 {
            return fail("frame_step must be at least 1".into());
        }
        if self.max_frames == 0 {
            return fail("max_frames must be at least 1".into());
        }
        if self.canvas_size == 0 {
            return fail("canvas_size must be at least 1".into());
        }
        if self.block_size == 0 || self.block_size % 2 == 0 {
            return fail(format!("block_size must be odd, got {}", self.block_size));
        }
        if self.lk_win_size < 3 || self.lk_win_size % 2 == 0 {
            return fail(format!("lk_win_size must be odd and >= 3, got {}", self.lk_win_size));
        }
        if self.lk_max_iterations == 0 {
            return fail("lk_max_iterations must be at least 1".into());
        }
        if !(self.lk_epsilon > 0.0) {
            return fail(format!("lk_epsilon must be positive, got {}", self.lk_epsilon));
        }
        if !(self.quality_level > 0.0 && self.quality_level <= 1.0) {
            return fail(format!("quality_level must be in (0, 1], got {}", self.quality_level));
        }
        if !(self.min_distance >= 0.0) {
            return fail(format!("min_distance must be >= 0, got {}", self.min_distance));
        }
        if !(self.canny_low >= 0.0 && self.canny_low <= self.canny_high) {
            return fail(format!(
                "canny thresholds must satisfy 0 <= low <= high, got {} / {}",
                self.canny_low, self.canny_high
            ));
        }
        if !(self.path_divisor > 0.0) {
            return fail(format!("path_divisor must be positive, got {}", self.path_divisor));
        }
        if !self.pixels_per_step.is_finite() {
            return fail(format!("pixels_per_step must be finite, got {}", self.pixels_per_step));
        }
        Ok(())
    }
}
