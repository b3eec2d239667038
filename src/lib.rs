//! rainwx - trailing 24-hour rainfall reporter for APRS weather stations.
//!
//! A rain gauge reports an ever-increasing counter. This crate keeps a short
//! history of those counter readings and turns it into the "rain in the last
//! 24 hours" figure carried by APRS weather reports.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           rainwx                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Server    │──▶│  Rainfall   │──▶│  Reporter   │        │
//! │  │ (/readings) │   │   Window    │   │ (interval)  │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                                             │               │
//! │                                             ▼               │
//! │                    ┌─────────────┐   ┌─────────────┐        │
//! │                    │    Stats    │   │ APRS packet │──▶ APRS-IS
//! │                    └─────────────┘   └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use rainwx::core::RainfallWindow;
//!
//! let mut window: RainfallWindow = RainfallWindow::default();
//! window.append(0.0, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
//! window.append(5.0, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
//!
//! let now = Utc.with_ymd_and_hms(2024, 5, 2, 1, 0, 0).unwrap();
//! window.append(12.0, now);
//!
//! assert_eq!(window.rain_last_24h(12.0, now, 90), Ok(17.0));
//! ```

pub mod aprs;
pub mod config;
pub mod core;
pub mod reporter;
pub mod server;
pub mod stats;
pub mod uplink;

// Re-export key types at crate root for convenience
pub use aprs::{AprsError, WeatherReport};
pub use config::{Config, ConfigError};
pub use self::core::{
    DayBoundary, DayBoundaryKind, PeriodPolicy, RainError, RainfallWindow, Reading,
};
pub use reporter::{ReportError, Reporter};
pub use stats::{ReportStats, SharedStats, StatsSnapshot};
pub use uplink::{AprsIsClient, UplinkError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
