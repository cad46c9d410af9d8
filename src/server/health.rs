//! HTTP endpoints for scraping and Kubernetes probes
//!
//! - `/metrics` - Prometheus metrics in text format
//! - `/healthz` - Liveness: Is the process alive?
//! - `/readyz` - Readiness: Was there a successful poll cycle recently?

use crate::server::metrics::SharedMetrics;
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// Missed cycles after which the exporter reports itself not ready
pub const STALE_AFTER_CYCLES: u32 = 3;

/// Why `/readyz` answers the way it does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// No poll cycle has succeeded yet
    NotPolled,
    /// The last successful cycle is older than the allowed age
    Stale { age_ms: i64 },
    ShuttingDown,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Readiness derived from poll freshness
///
/// The poll loop records every successful cycle. The exporter is ready while
/// the last one is younger than `max_age`, so a loop stuck on a hung API call
/// drops the pod out of the service instead of serving frozen gauges.
#[derive(Debug, Clone)]
pub struct ReadinessState {
    /// Unix millis of the last successful cycle, 0 before the first one
    last_poll_ms: Arc<AtomicI64>,
    stopping: Arc<AtomicBool>,
    max_age: Duration,
}

impl ReadinessState {
    pub fn new(max_age: Duration) -> Self {
        Self {
            last_poll_ms: Arc::new(AtomicI64::new(0)),
            stopping: Arc::new(AtomicBool::new(false)),
            max_age,
        }
    }

    /// Allow [`STALE_AFTER_CYCLES`] poll intervals between successful cycles
    pub fn for_check_rate(check_rate: Duration) -> Self {
        Self::new(check_rate.saturating_mul(STALE_AFTER_CYCLES))
    }

    pub fn record_poll(&self) {
        self.record_poll_at(Utc::now());
    }

    pub fn record_poll_at(&self, at: DateTime<Utc>) {
        self.last_poll_ms.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn has_polled(&self) -> bool {
        self.last_poll_ms.load(Ordering::SeqCst) != 0
    }

    /// Mark the exporter as not ready (during shutdown)
    pub fn set_not_ready(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    pub fn check_at(&self, now: DateTime<Utc>) -> Readiness {
        if self.stopping.load(Ordering::SeqCst) {
            return Readiness::ShuttingDown;
        }

        let last = self.last_poll_ms.load(Ordering::SeqCst);
        if last == 0 {
            return Readiness::NotPolled;
        }

        let age_ms = now.timestamp_millis() - last;
        let max_age_ms = i64::try_from(self.max_age.as_millis()).unwrap_or(i64::MAX);
        if age_ms > max_age_ms {
            Readiness::Stale { age_ms }
        } else {
            Readiness::Ready
        }
    }

    pub fn check(&self) -> Readiness {
        self.check_at(Utc::now())
    }

    pub fn is_ready(&self) -> bool {
        self.check().is_ready()
    }
}

/// Combined server state for health and metrics endpoints
#[derive(Clone)]
pub struct ServerState {
    readiness: ReadinessState,
    metrics: SharedMetrics,
}

impl ServerState {
    pub fn new(readiness: ReadinessState, metrics: SharedMetrics) -> Self {
        Self { readiness, metrics }
    }
}

/// Liveness probe handler
async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe handler
///
/// 200 while polls are fresh, 503 with the reason otherwise.
async fn readyz(State(state): State<ServerState>) -> (StatusCode, String) {
    match state.readiness.check() {
        Readiness::Ready => (StatusCode::OK, "ok".to_string()),
        Readiness::NotPolled => (
            StatusCode::SERVICE_UNAVAILABLE,
            "no successful poll yet".to_string(),
        ),
        Readiness::Stale { age_ms } => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("last successful poll {}s ago", age_ms / 1000),
        ),
        Readiness::ShuttingDown => (
            StatusCode::SERVICE_UNAVAILABLE,
            "shutting down".to_string(),
        ),
    }
}

/// Prometheus metrics handler
async fn metrics(State(state): State<ServerState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Build the router for metrics and probe endpoints
pub fn build_router(readiness: ReadinessState, metrics: SharedMetrics) -> Router {
    let state = ServerState::new(readiness, metrics);

    Router::new()
        .route("/metrics", get(self::metrics))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state)
}

/// Run the metrics server on the specified port
///
/// Binds `0.0.0.0:<port>` and serves until the task is aborted or the
/// listener fails.
pub async fn run_metrics_server(
    port: u16,
    readiness: ReadinessState,
    metrics: SharedMetrics,
) -> Result<(), std::io::Error> {
    let app = build_router(readiness, metrics);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(port = %port, "Metrics server listening");

    axum::serve(listener, app)
        .await
        .map_err(std::io::Error::other)
}
