//! Ingest and reporting counters.
//!
//! Tracks how many readings arrived and what became of each reporting
//! cycle, so an operator can tell a quiet gauge from a sampling outage.

use crate::core::RainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current process.
#[derive(Debug)]
pub struct ReportStats {
    /// Readings appended to the window
    readings_received: AtomicU64,
    /// Reports encoded (and transmitted, when an uplink is configured)
    reports_sent: AtomicU64,
    /// Cycles skipped because no 24-hour-old reading exists yet
    skipped_insufficient: AtomicU64,
    /// Cycles skipped because the baseline was older than the tolerance
    skipped_stale: AtomicU64,
    /// Cycles whose transmission failed
    uplink_failures: AtomicU64,
    /// Process start time
    started_at: DateTime<Utc>,
}

impl ReportStats {
    pub fn new() -> Self {
        Self {
            readings_received: AtomicU64::new(0),
            reports_sent: AtomicU64::new(0),
            skipped_insufficient: AtomicU64::new(0),
            skipped_stale: AtomicU64::new(0),
            uplink_failures: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_reading(&self) {
        self.readings_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_report_sent(&self) {
        self.reports_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cycle skipped for lack of a usable baseline.
    pub fn record_skipped(&self, reason: &RainError) {
        let counter = match reason {
            RainError::InsufficientData => &self.skipped_insufficient,
            RainError::StaleBaseline { .. } => &self.skipped_stale,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_uplink_failure(&self) {
        self.uplink_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            readings_received: self.readings_received.load(Ordering::Relaxed),
            reports_sent: self.reports_sent.load(Ordering::Relaxed),
            skipped_insufficient: self.skipped_insufficient.load(Ordering::Relaxed),
            skipped_stale: self.skipped_stale.load(Ordering::Relaxed),
            uplink_failures: self.uplink_failures.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Report Statistics:\n\
             - Readings received: {}\n\
             - Reports sent: {}\n\
             - Skipped (insufficient data): {}\n\
             - Skipped (stale baseline): {}\n\
             - Uplink failures: {}\n\
             - Uptime: {} seconds",
            stats.readings_received,
            stats.reports_sent,
            stats.skipped_insufficient,
            stats.skipped_stale,
            stats.uplink_failures,
            stats.uptime_secs
        )
    }
}

impl Default for ReportStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub readings_received: u64,
    pub reports_sent: u64,
    pub skipped_insufficient: u64,
    pub skipped_stale: u64,
    pub uplink_failures: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared counters.
pub type SharedStats = Arc<ReportStats>;

pub fn create_shared_stats() -> SharedStats {
    Arc::new(ReportStats::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_counters() {
        let stats = ReportStats::new();

        stats.record_reading();
        stats.record_reading();
        stats.record_report_sent();
        stats.record_skipped(&RainError::InsufficientData);
        stats.record_skipped(&RainError::StaleBaseline {
            age: Duration::hours(30),
        });
        stats.record_skipped(&RainError::StaleBaseline {
            age: Duration::hours(26),
        });
        stats.record_uplink_failure();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.readings_received, 2);
        assert_eq!(snapshot.reports_sent, 1);
        assert_eq!(snapshot.skipped_insufficient, 1);
        assert_eq!(snapshot.skipped_stale, 2);
        assert_eq!(snapshot.uplink_failures, 1);
    }

    #[test]
    fn test_summary() {
        let stats = create_shared_stats();
        stats.record_reading();

        let summary = stats.summary();
        assert!(summary.contains("Readings received: 1"));
        assert!(summary.contains("Skipped (stale baseline): 0"));
    }
}
