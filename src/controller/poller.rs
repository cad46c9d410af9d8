//! Component status poll loop
//!
//! Each cycle lists component statuses, classifies the first condition of
//! every component and publishes the verdict as a gauge. Cycles run strictly
//! one after another with a fixed sleep in between.
//!
//! Any failure to list statuses ends the loop with an error. There is no
//! retry: the process exits and the orchestrator restarts it, which keeps
//! stale data from being served as if it were fresh.

use crate::controller::classifier::{Classifier, Verdict};
use crate::controller::source::{SourceError, StatusSource};
use crate::server::metrics::{Publish, SharedMetrics};
use crate::server::{ReadinessState, ShutdownSignal};
use k8s_openapi::api::core::v1::ComponentStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Failed to list component statuses: {0}")]
    Source(#[from] SourceError),

    #[error("Component status at index {0} has no name")]
    MissingName(usize),
}

/// Summary of one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Components returned by the API
    pub components: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    /// Gauge set operations performed
    pub published: usize,
    /// Components with no gauge in table reporting
    pub unmapped: Vec<String>,
}

pub struct Poller {
    source: Arc<dyn StatusSource>,
    metrics: SharedMetrics,
    classifier: Classifier,
    interval: Duration,
    readiness: Option<ReadinessState>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn StatusSource>,
        metrics: SharedMetrics,
        classifier: Classifier,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            metrics,
            classifier,
            interval,
            readiness: None,
        }
    }

    /// Record every successful cycle in `readiness`
    pub fn with_readiness(mut self, readiness: ReadinessState) -> Self {
        self.readiness = Some(readiness);
        self
    }

    /// Run a single fetch, classify, publish cycle
    pub async fn poll_once(&self) -> Result<CycleReport, PollError> {
        let started = Instant::now();
        let statuses = self.source.list().await?;

        let mut report = CycleReport {
            components: statuses.len(),
            ..Default::default()
        };

        let mut verdicts = Vec::with_capacity(statuses.len());
        for (index, status) in statuses.iter().enumerate() {
            let name = status
                .metadata
                .name
                .as_deref()
                .ok_or(PollError::MissingName(index))?;

            let verdict = self.report_component(name, status);
            match verdict {
                Verdict::Healthy => report.healthy += 1,
                Verdict::Unhealthy => report.unhealthy += 1,
            }
            verdicts.push((name, verdict));
        }

        let outcomes = self.metrics.publish_cycle(&verdicts);
        for (&(name, _), outcome) in verdicts.iter().zip(outcomes) {
            match outcome {
                Publish::Set => report.published += 1,
                Publish::Unmapped => {
                    warn!(
                        component = %name,
                        "No metric mapping for component, health not exported"
                    );
                    report.unmapped.push(name.to_string());
                }
            }
        }

        self.metrics
            .record_poll_cycle(started.elapsed().as_secs_f64());
        debug!(
            components = report.components,
            healthy = report.healthy,
            unhealthy = report.unhealthy,
            published = report.published,
            unmapped = report.unmapped.len(),
            "Poll cycle complete"
        );

        Ok(report)
    }

    /// Classify one component and log its health
    fn report_component(&self, name: &str, status: &ComponentStatus) -> Verdict {
        let condition = status
            .conditions
            .as_ref()
            .and_then(|conditions| conditions.first());
        let verdict = self.classifier.classify(condition);

        let message = condition
            .and_then(|c| c.message.as_deref())
            .unwrap_or_default();
        let flag = condition.map(|c| c.status.as_str()).unwrap_or_default();

        if verdict.is_healthy() {
            info!(component = %name, status = %flag, "{}: {}", name, message);
        } else if condition.is_none() {
            error!(component = %name, "{}: no conditions reported", name);
        } else {
            error!(component = %name, status = %flag, "{}: {}", name, message);
        }

        verdict
    }

    /// Poll until shutdown is signaled or a cycle fails
    ///
    /// Shutdown is observed while sleeping; a cycle in progress is not
    /// interrupted by this loop. A dropped [`ShutdownController`] counts as
    /// shutdown.
    ///
    /// [`ShutdownController`]: crate::server::ShutdownController
    pub async fn run(self, mut shutdown: ShutdownSignal) -> Result<(), PollError> {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            signal = self.classifier.signal().as_str(),
            "Starting component status poll loop"
        );

        while !shutdown.is_shutdown() {
            // Failures are logged by the caller
            self.poll_once().await?;

            if let Some(ref readiness) = self.readiness {
                if !readiness.has_polled() {
                    info!("First poll cycle succeeded, exporter ready");
                }
                readiness.record_poll();
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.wait() => break,
            }
        }

        info!("Poll loop stopped");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "poller_test.rs"]
mod tests;
