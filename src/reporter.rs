//! Periodic weather report transmission.
//!
//! On every tick the reporter asks the shared window for the 24-hour rain at
//! the latest reading, encodes an APRS packet and hands it to the uplink.
//! A cycle without a usable baseline is skipped rather than reported as zero.

use crate::aprs::AprsError;
use crate::core::RainError;
use crate::server::ServerState;
use crate::uplink::{AprsIsClient, UplinkError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Why a reporting cycle produced no transmission.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no readings received yet")]
    NoReadings,
    #[error(transparent)]
    Rain(#[from] RainError),
    #[error(transparent)]
    Aprs(#[from] AprsError),
    #[error(transparent)]
    Uplink(#[from] UplinkError),
}

/// Drives one report per interval.
pub struct Reporter {
    state: Arc<ServerState>,
    uplink: Option<AprsIsClient>,
    interval: Duration,
}

impl Reporter {
    pub fn new(state: Arc<ServerState>, uplink: Option<AprsIsClient>, interval: Duration) -> Self {
        Self {
            state,
            uplink,
            interval,
        }
    }

    /// Run one reporting cycle and return the packet that was produced.
    pub async fn tick(&self) -> Result<String, ReportError> {
        let stats = self.state.stats();

        let report = match self.state.weather_report().await {
            Ok(report) => report,
            Err(ReportError::Rain(reason)) => {
                stats.record_skipped(&reason);
                return Err(reason.into());
            }
            Err(e) => return Err(e),
        };
        let packet = report.encode()?;

        if let Some(uplink) = &self.uplink {
            if let Err(e) = uplink.send(&packet).await {
                stats.record_uplink_failure();
                return Err(e.into());
            }
        }

        stats.record_report_sent();
        Ok(packet)
    }

    /// Report every interval until `stop` flips or its sender is dropped.
    ///
    /// The first report goes out one interval after start. A cycle still in
    /// progress when `stop` flips is abandoned.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        if self.interval.is_zero() {
            tracing::error!("Report interval is zero; reporter not started");
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stopped(&mut stop) => break,
            }
            tokio::select! {
                _ = self.log_tick() => {}
                _ = stopped(&mut stop) => {
                    tracing::info!("Report cycle abandoned at shutdown");
                    break;
                }
            }
        }

        tracing::info!("Reporter stopped");
    }

    async fn log_tick(&self) {
        match self.tick().await {
            Ok(packet) => tracing::info!(%packet, "weather report sent"),
            Err(ReportError::NoReadings) => tracing::info!("no readings yet, skipping report"),
            Err(ReportError::Rain(e @ RainError::InsufficientData)) => {
                tracing::info!("skipping report: {}", e)
            }
            Err(ReportError::Rain(e @ RainError::StaleBaseline { .. })) => {
                tracing::warn!("skipping report: {}", e)
            }
            Err(e) => tracing::error!("report failed: {}", e),
        }
    }
}

/// Resolves once `stop` reads `true` or its sender is gone.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    while !*stop.borrow_and_update() {
        if stop.changed().await.is_err() {
            return;
        }
    }
}
