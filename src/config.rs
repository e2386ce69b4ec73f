//! # Server Configuration
//!
//! Environment-driven configuration for the dispatch and execution engine.
//! Invalid values fail construction; a process that cannot build its
//! configuration must not start.

use crate::constants;
use crate::error::{ApiError, ApiResult};
use std::time::Duration;

/// Tunable knobs for the worker pool, async pollers and queue interaction.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Number of synchronous executor routines.
    pub worker_count: usize,
    /// Per-tier dispatch channel depth.
    pub channel_capacity: usize,
    /// Default per-task execution timeout.
    pub default_timeout: Duration,
    /// Visibility window applied on queue reserve.
    pub visibility_timeout: Duration,
    /// Number of async poll loops.
    pub poller_count: usize,
    /// Backoff applied when the queue is empty or unreachable.
    pub empty_backoff: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            worker_count: constants::DEFAULT_WORKER_COUNT,
            channel_capacity: constants::DEFAULT_CHANNEL_CAPACITY,
            default_timeout: Duration::from_secs(constants::DEFAULT_TASK_TIMEOUT_SECONDS),
            visibility_timeout: Duration::from_secs(constants::DEFAULT_VISIBILITY_TIMEOUT_SECONDS),
            poller_count: constants::DEFAULT_POLLER_COUNT,
            empty_backoff: Duration::from_millis(constants::EMPTY_QUEUE_BACKOFF_MS),
        }
    }
}

impl ServerConfig {
    /// Build a configuration from `FNSERVE_*` environment variables layered
    /// over the defaults.
    pub fn from_env() -> ApiResult<Self> {
        let mut config = Self::default();

        if let Ok(workers) = std::env::var("FNSERVE_WORKER_COUNT") {
            config.worker_count = parse_nonzero("FNSERVE_WORKER_COUNT", &workers)?;
        }

        if let Ok(capacity) = std::env::var("FNSERVE_CHANNEL_CAPACITY") {
            config.channel_capacity = parse_nonzero("FNSERVE_CHANNEL_CAPACITY", &capacity)?;
        }

        if let Ok(timeout) = std::env::var("FNSERVE_DEFAULT_TIMEOUT_SECONDS") {
            config.default_timeout =
                Duration::from_secs(parse_nonzero_u64("FNSERVE_DEFAULT_TIMEOUT_SECONDS", &timeout)?);
        }

        if let Ok(visibility) = std::env::var("FNSERVE_VISIBILITY_TIMEOUT_SECONDS") {
            config.visibility_timeout = Duration::from_secs(parse_nonzero_u64(
                "FNSERVE_VISIBILITY_TIMEOUT_SECONDS",
                &visibility,
            )?);
        }

        if let Ok(pollers) = std::env::var("FNSERVE_POLLER_COUNT") {
            config.poller_count = parse_nonzero("FNSERVE_POLLER_COUNT", &pollers)?;
        }

        if let Ok(backoff) = std::env::var("FNSERVE_EMPTY_BACKOFF_MS") {
            config.empty_backoff =
                Duration::from_millis(parse_nonzero_u64("FNSERVE_EMPTY_BACKOFF_MS", &backoff)?);
        }

        Ok(config)
    }
}

fn parse_nonzero(var: &str, raw: &str) -> ApiResult<usize> {
    let value: usize = raw
        .parse()
        .map_err(|e| ApiError::configuration(format!("Invalid {var}: {e}")))?;
    if value == 0 {
        return Err(ApiError::configuration(format!("{var} must be greater than 0")));
    }
    Ok(value)
}

fn parse_nonzero_u64(var: &str, raw: &str) -> ApiResult<u64> {
    let value: u64 = raw
        .parse()
        .map_err(|e| ApiError::configuration(format!("Invalid {var}: {e}")))?;
    if value == 0 {
        return Err(ApiError::configuration(format!("{var} must be greater than 0")));
    }
    Ok(value)
}
