//! Frame timing utilities

use std::time::{Duration, Instant};

/// Seconds elapsed since the current level (scene) was loaded.
///
/// This is the clock the grass kernel animates wind against. Reloading the
/// level means starting a new clock.
#[derive(Clone, Copy, Debug)]
pub struct LevelClock {
    loaded_at: Instant,
}

impl LevelClock {
    /// Start a clock at the current instant
    pub fn start() -> Self {
        Self { loaded_at: Instant::now() }
    }

    /// Seconds since level load
    pub fn time_since_level_load(&self) -> f32 {
        self.loaded_at.elapsed().as_secs_f32()
    }
}

impl Default for LevelClock {
    fn default() -> Self {
        Self::start()
    }
}

/// Tracks frame timing and calculates FPS
pub struct FrameTimer {
    frame_count: u64,
    fps_timer: Instant,
    fps: f32,
    fps_frame_count: u32,
}

impl FrameTimer {
    /// Create a new frame timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            frame_count: 0,
            fps_timer: now,
            fps: 0.0,
            fps_frame_count: 0,
        }
    }

    /// Call once per frame to update timing
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.frame_count += 1;
        self.fps_frame_count += 1;

        // Update FPS every second
        let fps_elapsed = now - self.fps_timer;
        if fps_elapsed >= Duration::from_secs(1) {
            self.fps = self.fps_frame_count as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = 0;
            self.fps_timer = now;
        }
    }

    /// Get current FPS (updated every second)
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Get total frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}
