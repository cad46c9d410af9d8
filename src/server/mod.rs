//! HTTP server for metrics and probe endpoints
//!
//! - `/metrics` - Prometheus scrape endpoint
//! - `/healthz` - Liveness probe
//! - `/readyz` - Readiness probe (a poll cycle succeeded recently)
//!
//! Also provides termination signal handling for SIGTERM/SIGINT.

mod health;
pub mod metrics;
pub mod shutdown;

pub use health::{build_router, run_metrics_server, Readiness, ReadinessState, STALE_AFTER_CYCLES};
pub use metrics::{create_metrics, ExporterMetrics, MetricsError, SharedMetrics};
pub use shutdown::{shutdown_channel, ShutdownController, ShutdownSignal, SignalListener};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
