//! Prometheus registry for the exporter
//!
//! One explicitly-owned registry is created at startup and shared through
//! [`SharedMetrics`]. The poll loop is the only writer of the health gauges,
//! the `/metrics` handler only reads.

use crate::controller::classifier::{HealthSignal, Verdict};
use crate::controller::reporting::{self, ReportingMode, REPORTING_TABLE};
use prometheus::{
    Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use thiserror::Error;

/// Registry handle shared between the poll loop and the HTTP server
pub type SharedMetrics = Arc<ExporterMetrics>;

/// Label carrying the component name in `component` reporting
pub const COMPONENT_LABEL: &str = "component";

/// Static label attached to every gauge in `table` reporting
pub const JOB_LABEL: &str = "job";

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metrics output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Result of publishing one verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// A gauge was set
    Set,
    /// No gauge exists for this component in table reporting
    Unmapped,
}

enum HealthGauges {
    /// One family labeled by component name
    Component(GaugeVec),
    /// One gauge per [`REPORTING_TABLE`] entry, same order
    Table(Vec<Gauge>),
}

pub struct ExporterMetrics {
    registry: Registry,
    health: HealthGauges,
    poll_cycles_total: IntCounter,
    poll_duration_seconds: Histogram,
    last_poll_timestamp_seconds: IntGauge,
}

impl ExporterMetrics {
    /// Create the registry and register every gauge up front
    pub fn new(
        signal: HealthSignal,
        reporting: ReportingMode,
        job_label: &str,
    ) -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let health = match reporting {
            ReportingMode::Component => {
                let gauges = GaugeVec::new(
                    Opts::new(signal.metric_name(), "Kubernetes component status health"),
                    &[COMPONENT_LABEL],
                )?;
                registry.register(Box::new(gauges.clone()))?;
                HealthGauges::Component(gauges)
            }
            ReportingMode::Table => {
                let mut gauges = Vec::with_capacity(REPORTING_TABLE.len());
                for entry in REPORTING_TABLE {
                    let gauge = Gauge::with_opts(
                        Opts::new(entry.metric, entry.help).const_label(JOB_LABEL, job_label),
                    )?;
                    registry.register(Box::new(gauge.clone()))?;
                    gauges.push(gauge);
                }
                HealthGauges::Table(gauges)
            }
        };

        let poll_cycles_total = IntCounter::new(
            "componentstatus_poll_cycles_total",
            "Completed component status poll cycles",
        )?;
        registry.register(Box::new(poll_cycles_total.clone()))?;

        let poll_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "componentstatus_poll_duration_seconds",
            "Duration of a component status poll cycle",
        ))?;
        registry.register(Box::new(poll_duration_seconds.clone()))?;

        let last_poll_timestamp_seconds = IntGauge::new(
            "componentstatus_last_poll_timestamp_seconds",
            "Unix time of the last successful poll cycle",
        )?;
        registry.register(Box::new(last_poll_timestamp_seconds.clone()))?;

        Ok(Self {
            registry,
            health,
            poll_cycles_total,
            poll_duration_seconds,
            last_poll_timestamp_seconds,
        })
    }

    /// Set the health gauge for a single component
    pub fn publish_health(&self, component: &str, verdict: Verdict) -> Publish {
        self.publish_cycle(&[(component, verdict)])
            .first()
            .copied()
            .unwrap_or(Publish::Unmapped)
    }

    /// Publish every verdict of one poll cycle
    ///
    /// Returns one [`Publish`] per input, in order. In table reporting several
    /// components can map to the same gauge (all `etcd-*` members share
    /// `kube_etcd_healthy`); such a gauge is healthy only if every member
    /// reported in this cycle is healthy.
    pub fn publish_cycle(&self, verdicts: &[(&str, Verdict)]) -> Vec<Publish> {
        match &self.health {
            HealthGauges::Component(gauges) => verdicts
                .iter()
                .map(|&(component, verdict)| {
                    gauges
                        .with_label_values(&[component])
                        .set(verdict.gauge_value());
                    Publish::Set
                })
                .collect(),
            HealthGauges::Table(gauges) => {
                let mut combined: Vec<Option<Verdict>> = vec![None; gauges.len()];
                let outcomes: Vec<Publish> = verdicts
                    .iter()
                    .map(|&(component, verdict)| match reporting::lookup(component) {
                        Some(index) => {
                            combined[index] = Some(match combined[index] {
                                Some(Verdict::Unhealthy) => Verdict::Unhealthy,
                                _ => verdict,
                            });
                            Publish::Set
                        }
                        None => Publish::Unmapped,
                    })
                    .collect();

                for (gauge, verdict) in gauges.iter().zip(combined) {
                    if let Some(verdict) = verdict {
                        gauge.set(verdict.gauge_value());
                    }
                }
                outcomes
            }
        }
    }

    /// Record a successful poll cycle
    pub fn record_poll_cycle(&self, duration_secs: f64) {
        self.poll_cycles_total.inc();
        self.poll_duration_seconds.observe(duration_secs);
        self.last_poll_timestamp_seconds
            .set(chrono::Utc::now().timestamp());
    }

    pub fn poll_cycles(&self) -> u64 {
        self.poll_cycles_total.get()
    }

    /// Current value of a gauge, looked up by name and one label pair
    ///
    /// Reads through `gather()` so a missing series is not created.
    pub fn gauge_value(&self, metric: &str, label: &str, value: &str) -> Option<f64> {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == metric)
            .flat_map(|family| family.get_metric().iter())
            .find(|m| {
                m.get_label()
                    .iter()
                    .any(|pair| pair.get_name() == label && pair.get_value() == value)
            })
            .map(|m| m.get_gauge().get_value())
    }

    /// Encode all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Create the shared registry for the configured signal and layout
pub fn create_metrics(
    signal: HealthSignal,
    reporting: ReportingMode,
    job_label: &str,
) -> Result<SharedMetrics, MetricsError> {
    Ok(Arc::new(ExporterMetrics::new(signal, reporting, job_label)?))
}
