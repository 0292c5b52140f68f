//! Mixer counters.
//!
//! Frame delivery never reports failure to producers; these counters are
//! the only place dropped and failed renders become visible.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters, updated from producer threads.
#[derive(Debug, Default)]
pub struct MixerStats {
    frames_received: AtomicU64,
    frames_published: AtomicU64,
    frames_skipped: AtomicU64,
    frames_failed: AtomicU64,
    sink_restarts: AtomicU64,
    sink_start_failures: AtomicU64,
}

impl MixerStats {
    pub fn inc_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_published(&self) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.frames_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sink_restarts(&self) {
        self.sink_restarts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sink_start_failures(&self) {
        self.sink_start_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MixerStatsSnapshot {
        MixerStatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_published: self.frames_published.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            frames_failed: self.frames_failed.load(Ordering::Relaxed),
            sink_restarts: self.sink_restarts.load(Ordering::Relaxed),
            sink_start_failures: self.sink_start_failures.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`MixerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MixerStatsSnapshot {
    /// Frames delivered by any source.
    pub frames_received: u64,
    /// Composites published downstream.
    pub frames_published: u64,
    /// Frames dropped because the canvas was unconfigured or no source was attached.
    pub frames_skipped: u64,
    /// Frames dropped because allocation or resampling failed.
    pub frames_failed: u64,
    /// Sink restarts triggered by geometry changes.
    pub sink_restarts: u64,
    /// Sink starts that failed.
    pub sink_start_failures: u64,
}

impl MixerStatsSnapshot {
    /// Share of received frames that were not published, as a percentage.
    pub fn drop_rate(&self) -> f64 {
        if self.frames_received == 0 {
            return 0.0;
        }
        (self.frames_skipped + self.frames_failed) as f64 / self.frames_received as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_rate_counts_skips_and_failures() {
        let stats = MixerStats::default();
        for _ in 0..8 {
            stats.inc_received();
        }
        for _ in 0..6 {
            stats.inc_published();
        }
        stats.inc_skipped();
        stats.inc_failed();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_published, 6);
        assert!((snapshot.drop_rate() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_stats_have_zero_drop_rate() {
        assert_eq!(MixerStatsSnapshot::default().drop_rate(), 0.0);
    }
}
