//! Output clock and frame timing.
//!
//! Composited frames are stamped relative to a monotonic epoch taken when
//! the compositor is constructed, so consumers of the output stream see a
//! continuous timeline even when the render loop stops and restarts.

use std::time::{Duration, Instant};

/// Interval between two frames at the given rate. A rate of zero is
/// treated as one frame per second.
pub fn frame_period(fps: u32) -> Duration {
    Duration::from_millis(1000 / fps.max(1) as u64)
}

/// Monotonic clock anchoring output frame timestamps.
#[derive(Debug, Clone)]
pub struct OutputClock {
    /// The instant the output stream was created.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl OutputClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Nanoseconds elapsed since the epoch.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Seconds elapsed since the epoch.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at the epoch.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Convert a nanosecond value to seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }
}
