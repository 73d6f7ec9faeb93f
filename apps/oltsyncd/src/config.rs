//! Daemon configuration loaded from environment variables.
//!
//! Fail-fast loading with validation: required variables must be present
//! and valid, or startup stops with a clear error.

use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable holds an unusable value.
    #[error("invalid value for {variable}: {message}")]
    Invalid {
        variable: &'static str,
        message: String,
    },
}

/// Runtime configuration for the reconciliation daemon.
#[derive(Debug, Clone)]
pub struct Config {
    /// Technology-profile KV store endpoint.
    pub profile_kv_url: String,

    /// Service graph seed file (JSON array of access services). Optional:
    /// without one the daemon starts with an empty store and waits for
    /// records to arrive by other means.
    pub service_graph_path: Option<String>,

    /// How often the inventory pull cycle runs.
    pub pull_interval: Duration,

    /// How often the sync worker scans for dirty records.
    pub sync_interval: Duration,

    /// Activation poll ceiling for access devices.
    pub poll_max_attempts: u32,

    /// Delay between activation poll reads.
    pub poll_interval: Duration,

    /// Lookup retry ceiling for endpoint activation events.
    pub retry_attempts: u32,

    /// Delay between lookup retries.
    pub retry_delay: Duration,

    /// Tracing filter directive (e.g. "info,oltsync=debug").
    pub rust_log: String,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// # Required Variables
    ///
    /// - `OLTSYNC_PROFILE_KV_URL` - technology-profile KV store endpoint
    ///
    /// # Optional Variables
    ///
    /// - `OLTSYNC_SERVICE_GRAPH` - path to a service graph seed file
    /// - `OLTSYNC_PULL_INTERVAL_SECS` - pull cycle period (default: 60)
    /// - `OLTSYNC_SYNC_INTERVAL_SECS` - worker pass period (default: 10)
    /// - `OLTSYNC_POLL_MAX_ATTEMPTS` - activation poll ceiling (default: 120)
    /// - `OLTSYNC_POLL_INTERVAL_SECS` - activation poll delay (default: 5)
    /// - `OLTSYNC_RETRY_ATTEMPTS` - event lookup retry ceiling (default: 5)
    /// - `OLTSYNC_RETRY_DELAY_SECS` - event lookup retry delay (default: 2)
    /// - `RUST_LOG` - log filter (default: "info")
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile_kv_url = env::var("OLTSYNC_PROFILE_KV_URL")
            .map_err(|_| ConfigError::Missing("OLTSYNC_PROFILE_KV_URL"))?;

        Ok(Self {
            profile_kv_url,
            service_graph_path: env::var("OLTSYNC_SERVICE_GRAPH").ok(),
            pull_interval: interval_from_env("OLTSYNC_PULL_INTERVAL_SECS", 60)?,
            sync_interval: interval_from_env("OLTSYNC_SYNC_INTERVAL_SECS", 10)?,
            poll_max_attempts: count_from_env("OLTSYNC_POLL_MAX_ATTEMPTS", 120)?,
            poll_interval: interval_from_env("OLTSYNC_POLL_INTERVAL_SECS", 5)?,
            retry_attempts: count_from_env("OLTSYNC_RETRY_ATTEMPTS", 5)?,
            retry_delay: interval_from_env("OLTSYNC_RETRY_DELAY_SECS", 2)?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn count_from_env(variable: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(variable) {
        Err(_) => Ok(default),
        Ok(raw) => {
            let count: u32 = raw.parse().map_err(|_| ConfigError::Invalid {
                variable,
                message: format!("{raw:?} is not a count"),
            })?;
            if count == 0 {
                return Err(ConfigError::Invalid {
                    variable,
                    message: "at least one attempt is required".into(),
                });
            }
            Ok(count)
        }
    }
}

fn interval_from_env(variable: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    match env::var(variable) {
        Err(_) => Ok(Duration::from_secs(default_secs)),
        Ok(raw) => {
            let secs: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                variable,
                message: format!("{raw:?} is not a number of seconds"),
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    variable,
                    message: "interval must be at least one second".into(),
                });
            }
            Ok(Duration::from_secs(secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_default_applies_when_unset() {
        let parsed = interval_from_env("OLTSYNC_TEST_UNSET_INTERVAL", 60).unwrap();
        assert_eq!(parsed, Duration::from_secs(60));
    }
}
