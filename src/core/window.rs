//! Trailing 24-hour rainfall window.
//!
//! Stations report a cumulative rain counter. The window keeps the series of
//! counter readings in time order and answers how much fell in the 24 hours
//! ending at a given reading:
//!
//! ```text
//! rain_24h = boundary_mark.amount - baseline.amount + current.amount
//! ```
//!
//! where `baseline` is the newest reading at least 24 hours old and
//! `boundary_mark` is the last reading seen before the most recent day
//! transition. History older than the baseline is compacted away lazily on
//! each query.

use super::period::{DayBoundary, PeriodPolicy};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the trailing window.
pub const WINDOW_HOURS: i64 = 24;

/// A timestamped cumulative counter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub amount: f64,
}

/// Why a 24-hour figure could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RainError {
    /// Every stored reading is newer than 24 hours.
    #[error("insufficient data: no reading is at least 24 hours old")]
    InsufficientData,
    /// The newest eligible baseline is older than 24h plus the allowed gap.
    #[error("stale baseline: nearest reading is {} minutes old", .age.num_minutes())]
    StaleBaseline { age: Duration },
}

/// In-memory series of rain counter readings.
///
/// Not synchronized. Share it behind a mutex or own it from a single task.
#[derive(Debug, Clone)]
pub struct RainfallWindow<P = DayBoundary> {
    /// Readings in append order, expected non-decreasing by timestamp
    readings: Vec<Reading>,
    /// Last reading before the most recent day transition
    boundary_mark: Option<Reading>,
    /// Day-transition predicate
    policy: P,
}

impl Default for RainfallWindow {
    fn default() -> Self {
        Self::new(DayBoundary::default())
    }
}

impl<P: PeriodPolicy> RainfallWindow<P> {
    /// Create an empty window using `policy` to detect day transitions.
    pub fn new(policy: P) -> Self {
        Self {
            readings: Vec::new(),
            boundary_mark: None,
            policy,
        }
    }

    /// Append a reading.
    ///
    /// `timestamp` must not precede the previous reading; this is not checked.
    /// Once two or more readings are stored, a day transition between the
    /// current tail and `timestamp` records the tail as the boundary mark.
    pub fn append(&mut self, amount: f64, timestamp: DateTime<Utc>) {
        if self.readings.len() > 1 {
            if let Some(last) = self.readings.last() {
                if self.policy.is_new_period(last.timestamp, timestamp) {
                    self.boundary_mark = Some(*last);
                }
            }
        }

        self.readings.push(Reading { timestamp, amount });
    }

    /// Rainfall over the 24 hours ending at `timestamp`, given the counter
    /// value `amount` observed then.
    ///
    /// Compacts stored history as a side effect whenever a baseline exists,
    /// even if it turns out to be stale.
    pub fn rain_last_24h(
        &mut self,
        amount: f64,
        timestamp: DateTime<Utc>,
        stale_threshold_minutes: u32,
    ) -> Result<f64, RainError> {
        let baseline = self.baseline(timestamp, stale_threshold_minutes)?;
        Ok(self.boundary_amount() - baseline + amount)
    }

    /// Index of the newest reading at least 24 hours older than `query_time`.
    pub fn find_baseline(&self, query_time: DateTime<Utc>) -> Option<usize> {
        let span = Duration::hours(WINDOW_HOURS);
        self.readings
            .partition_point(|r| query_time - r.timestamp >= span)
            .checked_sub(1)
    }

    /// Drop history that precedes `baseline_idx` by more than half its index,
    /// if the baseline sits past the first quarter of the series.
    ///
    /// Survivors are copied into fresh storage so the old allocation is freed.
    /// Returns whether anything was dropped.
    pub fn compact(&mut self, baseline_idx: usize) -> bool {
        if baseline_idx >= self.readings.len() || baseline_idx <= self.readings.len() / 4 {
            return false;
        }

        let keep_from = baseline_idx / 2;
        self.readings = self.readings[keep_from..].to_vec();

        tracing::debug!(
            dropped = keep_from,
            retained = self.readings.len(),
            "compacted rainfall history"
        );
        true
    }

    /// Number of stored readings.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Stored readings, oldest first.
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Most recently appended reading.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.last()
    }

    pub fn boundary_mark(&self) -> Option<&Reading> {
        self.boundary_mark.as_ref()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    fn boundary_amount(&self) -> f64 {
        self.boundary_mark.map_or(0.0, |r| r.amount)
    }

    fn baseline(
        &mut self,
        query_time: DateTime<Utc>,
        stale_threshold_minutes: u32,
    ) -> Result<f64, RainError> {
        let idx = self
            .find_baseline(query_time)
            .ok_or(RainError::InsufficientData)?;
        let baseline = self.readings[idx];
        let age = query_time - baseline.timestamp;

        self.compact(idx);

        let limit =
            Duration::hours(WINDOW_HOURS) + Duration::minutes(i64::from(stale_threshold_minutes));
        if age > limit {
            return Err(RainError::StaleBaseline { age });
        }

        Ok(baseline.amount)
    }
}
