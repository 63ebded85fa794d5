//! Frame timing utilities

use std::time::{Duration, Instant};

/// Accumulated frame statistics
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct FrameStats {
    /// Total frames rendered
    pub frames: u64,
    /// Cumulative render time in seconds
    pub total_secs: f64,
    /// Longest single frame in seconds
    pub max_frame_secs: f64,
}

impl FrameStats {
    /// Average frames per second over the whole run
    pub fn average_fps(&self) -> f64 {
        if self.total_secs > 0.0 {
            self.frames as f64 / self.total_secs
        } else {
            0.0
        }
    }

    /// FPS of the slowest frame
    pub fn min_fps(&self) -> f64 {
        if self.max_frame_secs > 0.0 {
            1.0 / self.max_frame_secs
        } else {
            0.0
        }
    }
}

/// Tracks per-frame render time
///
/// Call [`begin`](FrameTimer::begin) before rendering a frame and
/// [`end`](FrameTimer::end) after presenting it. An `end` without a matching
/// `begin` is ignored.
pub struct FrameTimer {
    frame_start: Option<Instant>,
    frames: u64,
    total: Duration,
    max_frame: Duration,
}

impl FrameTimer {
    /// Create a new frame timer
    pub fn new() -> Self {
        Self {
            frame_start: None,
            frames: 0,
            total: Duration::ZERO,
            max_frame: Duration::ZERO,
        }
    }

    /// Mark the start of a frame
    pub fn begin(&mut self) {
        self.frame_start = Some(Instant::now());
    }

    /// Mark the end of a frame and fold its duration into the totals
    pub fn end(&mut self) {
        if let Some(start) = self.frame_start.take() {
            let elapsed = start.elapsed();
            self.frames += 1;
            self.total += elapsed;
            self.max_frame = self.max_frame.max(elapsed);
        }
    }

    /// Get total frame count
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Get accumulated statistics
    pub fn stats(&self) -> FrameStats {
        FrameStats {
            frames: self.frames,
            total_secs: self.total.as_secs_f64(),
            max_frame_secs: self.max_frame.as_secs_f64(),
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}
