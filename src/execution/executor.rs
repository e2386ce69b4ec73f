//! # Executor
//!
//! The single execution primitive shared by the synchronous worker pool
//! and the asynchronous task lifecycle. Both paths build a fresh
//! descriptor here and run it through the injected backend, so they share
//! one success/error/timeout classification.

use crate::error::ApiResult;
use crate::execution::backend::{ExecutionBackend, ExecutionResult};
use crate::execution::container_task::{ContainerTask, RegistryAuth};
use crate::execution::invocation::InvocationConfig;
use std::sync::Arc;
use tracing::debug;

/// Runs invocation configs against the injected backend.
#[derive(Clone)]
pub struct Executor {
    backend: Arc<dyn ExecutionBackend>,
    auth: Arc<dyn RegistryAuth>,
}

impl Executor {
    pub fn new(backend: Arc<dyn ExecutionBackend>, auth: Arc<dyn RegistryAuth>) -> Self {
        Self { backend, auth }
    }

    /// Execute one invocation: adapt the config into a fresh descriptor,
    /// run it, and hand back the classified result. Retry policy, if any,
    /// belongs to the caller.
    pub async fn execute(&self, config: &InvocationConfig) -> ApiResult<ExecutionResult> {
        let task = ContainerTask::from_config(config, self.auth.as_ref());
        debug!(
            call_id = %config.id,
            app_name = %config.app_name,
            image = %config.image,
            timeout_seconds = task.timeout_seconds(),
            "Executing task"
        );

        let result = self.backend.run(&task).await?;
        debug!(
            call_id = %config.id,
            status = ?result.status,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Execution finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::backend::{ExecutionStatus, ProcessBackend};
    use crate::execution::container_task::NoAuth;
    use std::time::Duration;

    #[tokio::test]
    async fn test_execute_classifies_outcomes() {
        let executor = Executor::new(Arc::new(ProcessBackend::new()), Arc::new(NoAuth));

        let ok = InvocationConfig::new("c1", "myapp", "/hello", "true")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(
            executor.execute(&ok).await.unwrap().status,
            ExecutionStatus::Success
        );

        let failing = InvocationConfig::new("c2", "myapp", "/hello", "false")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(
            executor.execute(&failing).await.unwrap().status,
            ExecutionStatus::Error
        );
    }
}
