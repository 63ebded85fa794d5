//! Cache event counters and the shutdown report
//!
//! Workers and the accessor bump relaxed atomic counters; nothing at runtime
//! reads them back. The formatted report is produced once, on demand, for a
//! caller-supplied sink.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::core::time::FrameStats;

/// Running cache event counters
pub struct GridMetrics {
    decoded: AtomicU64,
    evicted: AtomicU64,
    decode_failures: AtomicU64,
    waits: AtomicU64,
    wait_nanos: AtomicU64,
}

impl GridMetrics {
    pub(crate) fn new() -> Self {
        Self {
            decoded: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            waits: AtomicU64::new(0),
            wait_nanos: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_decode(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wait(&self, waited: Duration) {
        self.waits.fetch_add(1, Ordering::Relaxed);
        self.wait_nanos
            .fetch_add(waited.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Copy the counters into a plain value
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            decoded: self.decoded.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            waits: self.waits.load(Ordering::Relaxed),
            wait_secs: Duration::from_nanos(self.wait_nanos.load(Ordering::Relaxed))
                .as_secs_f64(),
        }
    }
}

/// Point-in-time copy of the cache counters
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    /// Images decoded by workers
    pub decoded: u64,
    /// Images evicted by workers
    pub evicted: u64,
    /// Decodes that failed and left a point errored
    pub decode_failures: u64,
    /// Times the accessor had to block for an image
    pub waits: u64,
    /// Total time spent blocked, in seconds
    pub wait_secs: f64,
}

impl MetricsSnapshot {
    /// Mean blocked time per wait event, zero when nothing ever waited
    pub fn average_wait_secs(&self) -> f64 {
        if self.waits > 0 {
            self.wait_secs / self.waits as f64
        } else {
            0.0
        }
    }
}

/// Write the combined frame + cache report to `sink`
pub fn write_report<W: Write>(
    sink: &mut W,
    frames: &FrameStats,
    cache: &MetricsSnapshot,
) -> io::Result<()> {
    writeln!(sink, "Frames rendered: {}", frames.frames)?;
    writeln!(sink, "Average FPS: {:.2}", frames.average_fps())?;
    writeln!(sink, "Min FPS: {:.2}", frames.min_fps())?;
    writeln!(sink)?;
    writeln!(sink, "Wait events: {}", cache.waits)?;
    writeln!(sink, "Average wait time: {:.6} s", cache.average_wait_secs())?;
    writeln!(sink)?;
    writeln!(sink, "Total decoded: {}", cache.decoded)?;
    writeln!(sink, "Total evicted: {}", cache.evicted)?;
    if cache.decode_failures > 0 {
        writeln!(sink, "Decode failures: {}", cache.decode_failures)?;
    }
    Ok(())
}
