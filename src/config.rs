//! Exporter configuration from environment variables
//!
//! Read once at startup. Every value has a default; a value that is present
//! but unparseable is fatal, the process never starts polling with a
//! half-understood configuration.

use crate::controller::classifier::HealthSignal;
use crate::controller::reporting::ReportingMode;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

/// Default poll interval in seconds
pub const DEFAULT_CHECK_RATE_SECS: u64 = 10;

/// Default port for the metrics and health server
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default value of the static `job` label used by table reporting
pub const DEFAULT_JOB_LABEL: &str = "kube-componentstatuses";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "invalid LOG_LEVEL {0:?}: expected one of trace, debug, info, warn, warning, error, fatal, panic, off"
    )]
    InvalidLogLevel(String),

    #[error("invalid LOG_FORMAT {0:?}: expected json or text")]
    InvalidLogFormat(String),

    #[error("invalid COMPONENTSTATUSES_CHECK_RATE {0:?}: expected a positive integer number of seconds")]
    InvalidCheckRate(String),

    #[error("invalid COMPONENTSTATUSES_HEALTH_SIGNAL {0:?}: expected message or status")]
    InvalidHealthSignal(String),

    #[error("invalid COMPONENTSTATUSES_REPORTING {0:?}: expected component or table")]
    InvalidReporting(String),

    #[error("COMPONENTSTATUSES_JOB_LABEL must not be empty")]
    EmptyJobLabel,

    #[error("invalid METRICS_PORT {0:?}: expected a port number")]
    InvalidMetricsPort(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Effective exporter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: LevelFilter,
    pub log_format: LogFormat,
    /// Sleep between poll cycles
    pub check_rate: Duration,
    pub health_signal: HealthSignal,
    pub reporting: ReportingMode,
    pub job_label: String,
    pub metrics_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::INFO,
            log_format: LogFormat::Json,
            check_rate: Duration::from_secs(DEFAULT_CHECK_RATE_SECS),
            health_signal: HealthSignal::Message,
            reporting: ReportingMode::Component,
            job_label: DEFAULT_JOB_LABEL.to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Tests pass a map here instead of mutating process env, which races
    /// between parallel tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let log_level = match lookup("LOG_LEVEL") {
            Some(raw) => parse_log_level(&raw)?,
            None => defaults.log_level,
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "plain" => LogFormat::Text,
                _ => return Err(ConfigError::InvalidLogFormat(raw)),
            },
            None => defaults.log_format,
        };

        let check_rate = match lookup("COMPONENTSTATUSES_CHECK_RATE") {
            Some(raw) => parse_check_rate(&raw)?,
            None => defaults.check_rate,
        };

        let health_signal = match lookup("COMPONENTSTATUSES_HEALTH_SIGNAL") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "message" => HealthSignal::Message,
                "status" => HealthSignal::Status,
                _ => return Err(ConfigError::InvalidHealthSignal(raw)),
            },
            None => defaults.health_signal,
        };

        let reporting = match lookup("COMPONENTSTATUSES_REPORTING") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "component" => ReportingMode::Component,
                "table" => ReportingMode::Table,
                _ => return Err(ConfigError::InvalidReporting(raw)),
            },
            None => defaults.reporting,
        };

        let job_label = match lookup("COMPONENTSTATUSES_JOB_LABEL") {
            Some(raw) if raw.trim().is_empty() => return Err(ConfigError::EmptyJobLabel),
            Some(raw) => raw.trim().to_string(),
            None => defaults.job_label,
        };

        let metrics_port = match lookup("METRICS_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidMetricsPort(raw))?,
            None => defaults.metrics_port,
        };

        Ok(Self {
            log_level,
            log_format,
            check_rate,
            health_signal,
            reporting,
            job_label,
            metrics_port,
        })
    }
}

/// Parse a log level, also accepting the logrus names `warning`, `fatal` and
/// `panic`
fn parse_log_level(raw: &str) -> Result<LevelFilter, ConfigError> {
    let level = raw.trim();
    match level.to_ascii_lowercase().as_str() {
        "warning" => Ok(LevelFilter::WARN),
        // tracing has nothing above error
        "fatal" | "panic" => Ok(LevelFilter::ERROR),
        _ => LevelFilter::from_str(level)
            .map_err(|_| ConfigError::InvalidLogLevel(raw.to_string())),
    }
}

/// Parse the poll interval in whole seconds
///
/// Zero is rejected: it would turn the loop into a busy poll of the API server.
fn parse_check_rate(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidCheckRate(raw.to_string())),
    }
}
