//! # System Constants
//!
//! Default operational boundaries for the dispatch and execution engine.
//! Values mirror the queue and runner defaults the platform has always
//! shipped with; overrides come from [`crate::config::ServerConfig`].

/// Default per-task execution timeout when neither the task nor the route
/// specifies one.
pub const DEFAULT_TASK_TIMEOUT_SECONDS: u64 = 30;

/// How long a reserved queue item stays hidden from other consumers before
/// becoming redeliverable.
pub const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: u64 = 60;

/// Fixed backoff applied by async pollers when the queue is empty or
/// unreachable.
pub const EMPTY_QUEUE_BACKOFF_MS: u64 = 1000;

/// Number of synchronous executor routines in the worker pool.
pub const DEFAULT_WORKER_COUNT: usize = 8;

/// Per-tier buffer depth of the dispatch channels. Submission blocks once a
/// tier's buffer is full and all workers are busy.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// Number of async poll loops started per process.
pub const DEFAULT_POLLER_COUNT: usize = 1;

/// Task priorities are clamped to `0..=MAX_TASK_PRIORITY`; higher values are
/// reserved first.
pub const MAX_TASK_PRIORITY: i32 = 2;

/// Environment variable names injected into every function invocation.
pub mod env_keys {
    pub const METHOD: &str = "METHOD";
    pub const ROUTE: &str = "ROUTE";
    pub const REQUEST_URL: &str = "REQUEST_URL";

    /// Prefix for trie parameter bindings (`PARAM_<NAME>`).
    pub const PARAM_PREFIX: &str = "PARAM";
    /// Prefix for inbound request headers (`HEADER_<NAME>`).
    pub const HEADER_PREFIX: &str = "HEADER";
}
