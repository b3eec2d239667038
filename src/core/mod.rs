//! Core rainfall accounting.
//!
//! This module contains:
//! - The trailing 24-hour rainfall window over cumulative counter readings
//! - Day-transition policies used to place the boundary marker

pub mod period;
pub mod window;

// Re-export commonly used types
pub use period::{DayBoundary, DayBoundaryKind, PeriodPolicy};
pub use window::{RainError, RainfallWindow, Reading, WINDOW_HOURS};
