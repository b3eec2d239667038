//! HTTP server for receiving rain gauge readings.
//!
//! This module provides an HTTP server that:
//! - Accepts cumulative rain counter readings via POST /readings
//! - Answers the trailing 24-hour rainfall via GET /rain
//! - Runs the periodic reporter that transmits APRS weather packets
//!
//! # Architecture
//!
//! ```text
//! Station ──→ POST /readings ──→ RainfallWindow ──→ Reporter ──→ APRS-IS
//!                                      ↑
//!                               GET /rain, /report
//! ```

use crate::aprs::WeatherReport;
use crate::config::{Config, ConfigError, StationConfig};
use crate::core::{RainError, RainfallWindow, Reading};
use crate::reporter::{ReportError, Reporter};
use crate::stats::{create_shared_stats, SharedStats, StatsSnapshot};
use crate::uplink::AprsIsClient;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

/// Shared server state.
///
/// The window is only touched while holding `window`, so every append and
/// every query runs to completion before the next one starts.
pub struct ServerState {
    pub(crate) window: Mutex<RainfallWindow>,
    station: StationConfig,
    stale_threshold_minutes: u32,
    stats: SharedStats,
}

impl ServerState {
    /// Create state for a validated configuration.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            window: Mutex::new(RainfallWindow::new(config.day_boundary()?)),
            station: config.station.clone(),
            stale_threshold_minutes: config.report.stale_threshold_minutes,
            stats: create_shared_stats(),
        })
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }

    pub fn stale_threshold_minutes(&self) -> u32 {
        self.stale_threshold_minutes
    }

    /// Append a reading and return the number of stored readings.
    pub async fn ingest(&self, amount: f64, timestamp: DateTime<Utc>) -> usize {
        let mut window = self.window.lock().await;
        window.append(amount, timestamp);
        self.stats.record_reading();

        tracing::debug!(amount, %timestamp, stored = window.len(), "reading appended");
        window.len()
    }

    /// Rainfall over the 24 hours ending at the latest reading.
    pub async fn rain_24h(
        &self,
        stale_threshold_minutes: u32,
    ) -> Result<(f64, Reading), ReportError> {
        let mut window = self.window.lock().await;
        let latest = *window.latest().ok_or(ReportError::NoReadings)?;
        let rain =
            window.rain_last_24h(latest.amount, latest.timestamp, stale_threshold_minutes)?;
        Ok((rain, latest))
    }

    /// Weather report for the latest reading, using the configured tolerance.
    pub async fn weather_report(&self) -> Result<WeatherReport, ReportError> {
        let (rain, _) = self.rain_24h(self.stale_threshold_minutes).await?;
        Ok(WeatherReport::for_station(&self.station, Some(rain)))
    }
}

/// Reading posted by a station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingRequest {
    /// Cumulative counter value
    pub amount: f64,
    /// Observation time; the server clock is used when omitted
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Response from the readings endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub readings: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RainQuery {
    pub stale_threshold_minutes: Option<u32>,
}

/// Response from the rain endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RainResponse {
    pub rain_24h: f64,
    pub as_of: DateTime<Utc>,
    pub stale_threshold_minutes: u32,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            code: code.to_string(),
        }),
    )
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match &err {
            ReportError::NoReadings => api_error(StatusCode::NOT_FOUND, "NO_READINGS", &err),
            ReportError::Rain(RainError::InsufficientData) => {
                api_error(StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_DATA", &err)
            }
            ReportError::Rain(RainError::StaleBaseline { .. }) => {
                api_error(StatusCode::UNPROCESSABLE_ENTITY, "STALE_BASELINE", &err)
            }
            ReportError::Aprs(_) => {
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "ENCODING_ERROR", &err)
            }
            ReportError::Uplink(_) => api_error(StatusCode::BAD_GATEWAY, "UPLINK_ERROR", &err),
        }
    }
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /readings
///
/// JSON numbers are always finite, so a body that parses carries a usable
/// amount.
async fn post_reading(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<ReadingRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(reading) = payload
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_READING", e.body_text()))?;

    let timestamp = reading.timestamp.unwrap_or_else(Utc::now);
    let readings = state.ingest(reading.amount, timestamp).await;

    Ok(Json(IngestResponse {
        status: "ok".to_string(),
        readings,
    }))
}

/// GET /rain
async fn get_rain(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RainQuery>,
) -> Result<Json<RainResponse>, ApiError> {
    let threshold = query
        .stale_threshold_minutes
        .unwrap_or(state.stale_threshold_minutes);
    let (rain_24h, latest) = state.rain_24h(threshold).await?;

    Ok(Json(RainResponse {
        rain_24h,
        as_of: latest.timestamp,
        stale_threshold_minutes: threshold,
    }))
}

/// GET /report
///
/// The packet the reporter would transmit right now.
async fn get_report(State(state): State<Arc<ServerState>>) -> Result<String, ApiError> {
    let report = state.weather_report().await?;
    report.encode().map_err(|e| ReportError::from(e).into())
}

/// GET /stats
async fn get_stats(State(state): State<Arc<ServerState>>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

/// Build the HTTP routes around `state`.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/readings", post(post_reading))
        .route("/rain", get(get_rain))
        .route("/report", get(get_report))
        .route("/stats", get(get_stats))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Handles for a running server.
pub struct ServerHandle {
    /// Address the listener is bound to
    pub addr: SocketAddr,
    /// Send to stop the server and the reporter
    pub shutdown: oneshot::Sender<()>,
    /// Completes once both have wound down
    pub task: JoinHandle<()>,
}

/// Run the HTTP server and the periodic reporter.
///
/// `config` must already be validated.
pub async fn run(config: Config) -> anyhow::Result<ServerHandle> {
    let state = Arc::new(ServerState::new(&config)?);

    let uplink = config
        .uplink
        .as_ref()
        .map(|uplink| AprsIsClient::new(uplink, &config.station));
    match &uplink {
        Some(client) => tracing::info!("Reporting to APRS-IS server {}", client.server()),
        None => tracing::info!("No uplink configured; reports will only be logged"),
    }
    let reporter = Reporter::new(state.clone(), uplink, config.report.interval);

    let listener = TcpListener::bind(config.listen.socket_addr()).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Rainfall server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let (stop_tx, stop_rx) = watch::channel(false);

    let reporter_task = tokio::spawn(reporter.run(stop_rx));

    let app = router(state);
    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }

        let _ = stop_tx.send(true);
        if let Err(e) = reporter_task.await {
            tracing::error!("Reporter task failed: {}", e);
        }
    });

    Ok(ServerHandle {
        addr: actual_addr,
        shutdown: shutdown_tx,
        task,
    })
}
