//! Tracing subscriber setup
//!
//! Logs go to stdout. JSON is the default so log shippers can index the
//! per-component fields; `LOG_FORMAT=text` gives the human-readable format.

use crate::config::{Config, LogFormat};
use tracing_subscriber::EnvFilter;

/// Build the env filter for the configured level
pub fn build_filter(config: &Config) -> EnvFilter {
    EnvFilter::new(config.log_level.to_string())
}

/// Install the global tracing subscriber
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &Config) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(config))
        .with_writer(std::io::stdout);

    match config.log_format {
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e)),
        LogFormat::Text => builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_filter_follows_configured_level() {
        let config = Config {
            log_level: LevelFilter::WARN,
            ..Config::default()
        };

        assert_eq!(build_filter(&config).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_off_disables_logging() {
        let config = Config {
            log_level: LevelFilter::OFF,
            ..Config::default()
        };

        assert_eq!(build_filter(&config).max_level_hint(), Some(LevelFilter::OFF));
    }
}
