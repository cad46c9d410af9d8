//! Health classification of component conditions
//!
//! Control-plane components report health in one of two shapes: a free-text
//! message (`ok`, or a small JSON fragment from etcd) or a `status` flag set to
//! `True`/`False`/`Unknown`. Which one the exporter trusts is selected by
//! [`HealthSignal`]. Anything not listed in [`RECOGNIZED_SIGNALS`] is unhealthy.
//!
//! Messages are matched exactly, never parsed: `{"health":"true"}` without the
//! space is unhealthy.

use k8s_openapi::api::core::v1::ComponentCondition;

/// Which field of a condition carries the health signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthSignal {
    /// `message` must be one of [`RecognizedSignals::messages`]
    Message,
    /// `status` must equal [`RecognizedSignals::status`]
    Status,
}

impl HealthSignal {
    /// Name of the gauge exported per component for this signal
    pub fn metric_name(&self) -> &'static str {
        match self {
            HealthSignal::Message => "kube_componentstatuses",
            HealthSignal::Status => "kube_componentstatus_healthy",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthSignal::Message => "message",
            HealthSignal::Status => "status",
        }
    }
}

/// Table of values that mean "healthy"
#[derive(Debug)]
pub struct RecognizedSignals {
    pub messages: &'static [&'static str],
    pub status: &'static str,
}

/// Healthy signals as reported by kube-apiserver for its components
///
/// `ok` comes from the scheduler and controller-manager `/healthz`; the JSON
/// fragment is the etcd health response, byte for byte.
pub static RECOGNIZED_SIGNALS: RecognizedSignals = RecognizedSignals {
    messages: &["ok", r#"{"health": "true"}"#],
    status: "True",
};

/// Outcome of classifying one component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Healthy,
    Unhealthy,
}

impl Verdict {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Verdict::Healthy)
    }

    /// Value published to the gauge
    pub fn gauge_value(&self) -> f64 {
        match self {
            Verdict::Healthy => 1.0,
            Verdict::Unhealthy => 0.0,
        }
    }
}

impl From<bool> for Verdict {
    fn from(healthy: bool) -> Self {
        if healthy {
            Verdict::Healthy
        } else {
            Verdict::Unhealthy
        }
    }
}

/// Classifies conditions against a signal table
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    signal: HealthSignal,
    table: &'static RecognizedSignals,
}

impl Classifier {
    pub fn new(signal: HealthSignal) -> Self {
        Self {
            signal,
            table: &RECOGNIZED_SIGNALS,
        }
    }

    pub fn signal(&self) -> HealthSignal {
        self.signal
    }

    /// Classify a component's first condition
    ///
    /// A component that reports no condition at all is unhealthy.
    pub fn classify(&self, condition: Option<&ComponentCondition>) -> Verdict {
        let Some(condition) = condition else {
            return Verdict::Unhealthy;
        };

        let healthy = match self.signal {
            HealthSignal::Message => {
                self.is_healthy_message(condition.message.as_deref().unwrap_or_default())
            }
            HealthSignal::Status => self.is_healthy_status(&condition.status),
        };
        healthy.into()
    }

    pub fn is_healthy_message(&self, message: &str) -> bool {
        self.table.messages.iter().any(|healthy| *healthy == message)
    }

    pub fn is_healthy_status(&self, status: &str) -> bool {
        status == self.table.status
    }
}
