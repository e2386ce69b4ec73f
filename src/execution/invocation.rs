//! # Invocation Config
//!
//! The execution-side view of one function call, assembled by the dispatch
//! engine for synchronous runs and reconstructed from a [`Task`] for
//! deferred runs. Both paths collapse into the same shape so the rest of
//! the execution stack cannot tell them apart.

use crate::constants::DEFAULT_TASK_TIMEOUT_SECONDS;
use crate::models::Task;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Shared buffer capturing a function's stdout for the caller.
pub type StdoutSink = Arc<Mutex<Vec<u8>>>;

/// Configuration for a single function execution.
#[derive(Debug, Clone)]
pub struct InvocationConfig {
    /// Call id, used for log correlation across the whole invocation.
    pub id: String,

    pub app_name: String,

    /// Path pattern of the matched route.
    pub route_path: String,

    /// Image reference handed to the execution backend.
    pub image: String,

    /// Complete environment for the function process.
    pub env: HashMap<String, String>,

    pub timeout: Duration,

    /// Memory limit in MB; backends that cannot enforce it ignore it.
    pub memory: u64,

    /// Payload delivered on stdin.
    pub payload: Option<String>,

    /// Where captured stdout goes, when the caller wants it back.
    pub stdout: Option<StdoutSink>,
}

impl InvocationConfig {
    pub fn new(
        id: impl Into<String>,
        app_name: impl Into<String>,
        route_path: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            app_name: app_name.into(),
            route_path: route_path.into(),
            image: image.into(),
            env: HashMap::new(),
            timeout: Duration::from_secs(DEFAULT_TASK_TIMEOUT_SECONDS),
            memory: 0,
            payload: None,
            stdout: None,
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_memory(mut self, memory: u64) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_payload(mut self, payload: Option<String>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_stdout(mut self, stdout: StdoutSink) -> Self {
        self.stdout = Some(stdout);
        self
    }
}

impl From<&Task> for InvocationConfig {
    /// Rebuild the execution view of a reserved task. Deferred executions
    /// run with the environment snapshot captured at enqueue time.
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            app_name: task.app_name.clone(),
            route_path: task.route_path.clone(),
            image: task.image.clone(),
            env: task.env_vars.clone(),
            timeout: Duration::from_secs(task.effective_timeout_seconds()),
            memory: 0,
            payload: if task.payload.is_empty() {
                None
            } else {
                Some(task.payload.clone())
            },
            stdout: None,
        }
    }
}
