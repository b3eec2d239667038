//! Day-transition detection for the boundary marker.
//!
//! A [`PeriodPolicy`] decides whether two consecutive readings belong to
//! different accounting days. The window only ever asks about adjacent
//! readings, so a policy sees `previous <= current` whenever callers append
//! in order.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Decides whether `current` starts a new accounting period relative to `previous`.
pub trait PeriodPolicy {
    fn is_new_period(&self, previous: DateTime<Utc>, current: DateTime<Utc>) -> bool;
}

impl<F> PeriodPolicy for F
where
    F: Fn(DateTime<Utc>, DateTime<Utc>) -> bool,
{
    fn is_new_period(&self, previous: DateTime<Utc>, current: DateTime<Utc>) -> bool {
        self(previous, current)
    }
}

/// Which day identity to compare, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayBoundaryKind {
    /// Unique calendar date (year + ordinal day).
    #[default]
    CalendarDay,
    /// Day of week only. Two readings exactly a week apart compare equal.
    Weekday,
}

impl std::str::FromStr for DayBoundaryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "calendar_day" | "calendar" => Ok(DayBoundaryKind::CalendarDay),
            "weekday" => Ok(DayBoundaryKind::Weekday),
            other => Err(format!(
                "unknown day boundary '{other}' (expected calendar-day or weekday)"
            )),
        }
    }
}

/// Built-in day policies, evaluated in the station's local time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBoundary {
    CalendarDay(Tz),
    /// Matches stations that historically rolled over on weekday change.
    /// Misses a transition when consecutive readings are a whole number of
    /// weeks apart.
    Weekday(Tz),
}

impl DayBoundary {
    pub fn new(kind: DayBoundaryKind, tz: Tz) -> Self {
        match kind {
            DayBoundaryKind::CalendarDay => DayBoundary::CalendarDay(tz),
            DayBoundaryKind::Weekday => DayBoundary::Weekday(tz),
        }
    }

    pub fn kind(&self) -> DayBoundaryKind {
        match self {
            DayBoundary::CalendarDay(_) => DayBoundaryKind::CalendarDay,
            DayBoundary::Weekday(_) => DayBoundaryKind::Weekday,
        }
    }

    pub fn timezone(&self) -> Tz {
        match *self {
            DayBoundary::CalendarDay(tz) | DayBoundary::Weekday(tz) => tz,
        }
    }
}

impl Default for DayBoundary {
    fn default() -> Self {
        DayBoundary::CalendarDay(Tz::UTC)
    }
}

impl PeriodPolicy for DayBoundary {
    fn is_new_period(&self, previous: DateTime<Utc>, current: DateTime<Utc>) -> bool {
        match *self {
            DayBoundary::CalendarDay(tz) => {
                let prev = previous.with_timezone(&tz);
                let cur = current.with_timezone(&tz);
                (prev.year(), prev.ordinal()) != (cur.year(), cur.ordinal())
            }
            DayBoundary::Weekday(tz) => {
                previous.with_timezone(&tz).weekday() != current.with_timezone(&tz).weekday()
            }
        }
    }
}
