//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CARTSYNC_REMOTE_URL` - Base URL of the remote cart service
//! - `CARTSYNC_SNAPSHOT_PATH` - Filesystem path for the local cart snapshot
//!
//! ## Optional
//! - `CARTSYNC_REQUEST_TIMEOUT_SECS` - Per-request HTTP timeout (default: 10)
//! - `CARTSYNC_MAX_RETRIES` - Retries after the initial attempt (default: 2)
//! - `CARTSYNC_RETRY_BASE_DELAY_MS` - First retry delay, doubling per attempt (default: 1000)
//! - `CARTSYNC_ROLLBACK_ON_FAILURE` - Restore the pre-mutation cart when a push fails (default: false)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::retry::RetryPolicy;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Remote cart service configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the remote cart service
    pub base_url: Url,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
}

/// Cart synchronization engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote cart service configuration
    pub remote: RemoteConfig,
    /// Filesystem path for the local cart snapshot
    pub snapshot_path: PathBuf,
    /// Retry policy for remote calls
    pub retry: RetryPolicy,
    /// Whether a failed remote push restores the pre-mutation cart
    pub rollback_on_failure: bool,
}

impl SyncConfig {
    /// Create a configuration with default knobs.
    ///
    /// Defaults: 10 second request timeout, two retries with a one second
    /// base delay, and no rollback on push failure.
    #[must_use]
    pub fn new(base_url: Url, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            remote: RemoteConfig {
                base_url,
                request_timeout: Duration::from_secs(10),
            },
            snapshot_path: snapshot_path.into(),
            retry: RetryPolicy::default(),
            rollback_on_failure: false,
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the per-request HTTP timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.remote.request_timeout = timeout;
        self
    }

    /// Opt in to restoring the pre-mutation cart when a push fails.
    #[must_use]
    pub fn with_rollback_on_failure(mut self, rollback: bool) -> Self {
        self.rollback_on_failure = rollback;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_required_env("CARTSYNC_REMOTE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CARTSYNC_REMOTE_URL".to_string(), e.to_string())
            })?;
        let snapshot_path = PathBuf::from(get_required_env("CARTSYNC_SNAPSHOT_PATH")?);
        let request_timeout_secs = get_env_or_default("CARTSYNC_REQUEST_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "CARTSYNC_REQUEST_TIMEOUT_SECS".to_string(),
                    e.to_string(),
                )
            })?;
        let max_retries = get_env_or_default("CARTSYNC_MAX_RETRIES", "2")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CARTSYNC_MAX_RETRIES".to_string(), e.to_string())
            })?;
        let base_delay_ms = get_env_or_default("CARTSYNC_RETRY_BASE_DELAY_MS", "1000")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "CARTSYNC_RETRY_BASE_DELAY_MS".to_string(),
                    e.to_string(),
                )
            })?;
        let rollback_on_failure = parse_bool(
            "CARTSYNC_ROLLBACK_ON_FAILURE",
            &get_env_or_default("CARTSYNC_ROLLBACK_ON_FAILURE", "false"),
        )?;

        Ok(Self {
            remote: RemoteConfig {
                base_url,
                request_timeout: Duration::from_secs(request_timeout_secs),
            },
            snapshot_path,
            retry: RetryPolicy {
                max_retries,
                base_delay: Duration::from_millis(base_delay_ms),
            },
            rollback_on_failure,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a boolean environment variable, accepting `true`/`false`/`1`/`0`.
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected true/false/1/0, got {other}"),
        )),
    }
}
