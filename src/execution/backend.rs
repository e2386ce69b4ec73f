//! # Execution Backend
//!
//! Polymorphic capability that actually runs a [`ContainerTask`]. The
//! dispatch layer never talks to a runtime directly; it is handed a
//! backend at construction time. Variants in the wild: the local process
//! sandbox shipped here, container runtimes, and remote executors.
//!
//! Timeouts are enforced here, per task, not by the dispatch layer: a
//! backend must return a timeout-classified result rather than hang.

use crate::error::{ApiError, ApiResult};
use crate::execution::container_task::ContainerTask;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Outcome classification for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Error,
    Timeout,
}

/// What a finished (or timed-out) execution looks like to the rest of the
/// system.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Capability for running container tasks.
///
/// `run` returns `Ok` with a classified result whenever the task was
/// started, including error and timeout outcomes; `Err` is reserved for
/// failures to run at all (bad image, runtime unavailable).
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn run(&self, task: &ContainerTask) -> ApiResult<ExecutionResult>;
}

/// Local process sandbox: runs the task's command (or the image reference
/// itself, treated as a program line) under `sh -c` with the task's
/// environment, payload on stdin, and the task timeout enforced by
/// killing the child.
///
/// This is the embedded/development variant of the backend capability;
/// production deployments inject a container runtime instead.
#[derive(Debug, Clone, Default)]
pub struct ProcessBackend;

impl ProcessBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionBackend for ProcessBackend {
    async fn run(&self, task: &ContainerTask) -> ApiResult<ExecutionResult> {
        let command_line = if task.command().is_empty() {
            task.image()
        } else {
            task.command()
        };

        let mut command = Command::new("/bin/sh");
        command
            .arg("-c")
            .arg(command_line)
            .envs(task.env_vars())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if !task.work_dir().is_empty() {
            command.current_dir(task.work_dir());
        }

        let started = Instant::now();
        let mut child = command
            .spawn()
            .map_err(|e| ApiError::execution(format!("Failed to spawn {command_line}: {e}")))?;

        if let Some(payload) = task.payload() {
            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    warn!(task_id = %task.id(), error = %e, "Failed to write payload to stdin");
                }
            }
        } else {
            drop(child.stdin.take());
        }

        let timeout = Duration::from_secs(task.timeout_seconds());
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => {
                result.map_err(|e| ApiError::execution(format!("Failed to collect output: {e}")))?
            }
            Err(_) => {
                // kill_on_drop reaps the child the moment the wait future
                // is dropped.
                debug!(task_id = %task.id(), timeout_seconds = task.timeout_seconds(), "Task timed out");
                return Ok(ExecutionResult {
                    status: ExecutionStatus::Timeout,
                    elapsed: started.elapsed(),
                });
            }
        };

        if let Some(sink) = task.stdout_sink() {
            sink.lock().extend_from_slice(&output.stdout);
        }

        // Correlate function stderr with the task that produced it.
        if !output.stderr.is_empty() {
            debug!(
                task_id = %task.id(),
                log_name = task.labels().get("log_name").map(String::as_str),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Function stderr"
            );
        }

        let status = if output.status.success() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Error
        };

        Ok(ExecutionResult {
            status,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::container_task::NoAuth;
    use crate::execution::invocation::InvocationConfig;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn descriptor(command_line: &str, timeout: Duration) -> (ContainerTask, super::super::StdoutSink) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let config = InvocationConfig::new("call-1", "myapp", "/hello", command_line)
            .with_timeout(timeout)
            .with_stdout(sink.clone());
        (ContainerTask::from_config(&config, &NoAuth), sink)
    }

    #[tokio::test]
    async fn test_success_captures_stdout() {
        let (task, sink) = descriptor("echo hello", Duration::from_secs(5));
        let result = ProcessBackend::new().run(&task).await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(String::from_utf8_lossy(&sink.lock()).trim(), "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let (task, _) = descriptor("exit 3", Duration::from_secs(5));
        let result = ProcessBackend::new().run(&task).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Error);
    }

    #[tokio::test]
    async fn test_stalled_task_times_out() {
        let (task, _) = descriptor("sleep 30", Duration::from_secs(1));
        let started = Instant::now();
        let result = ProcessBackend::new().run(&task).await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Timeout);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_payload_on_stdin() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let config = InvocationConfig::new("call-1", "myapp", "/hello", "cat")
            .with_timeout(Duration::from_secs(5))
            .with_payload(Some("from stdin".to_string()))
            .with_stdout(sink.clone());
        let task = ContainerTask::from_config(&config, &NoAuth);

        let result = ProcessBackend::new().run(&task).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(String::from_utf8_lossy(&sink.lock()), "from stdin");
    }

    #[tokio::test]
    async fn test_env_reaches_function() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut env = std::collections::HashMap::new();
        env.insert("GREETING".to_string(), "bonjour".to_string());
        let config = InvocationConfig::new("call-1", "myapp", "/hello", "echo $GREETING")
            .with_env(env)
            .with_timeout(Duration::from_secs(5))
            .with_stdout(sink.clone());
        let task = ContainerTask::from_config(&config, &NoAuth);

        ProcessBackend::new().run(&task).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&sink.lock()).trim(), "bonjour");
    }
}
