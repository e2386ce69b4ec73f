//! # Test Support
//!
//! Shared fixtures for unit and integration tests. Nothing here is part
//! of the public contract; production code must not depend on it.

use crate::error::{ApiError, ApiResult};
use crate::execution::backend::{ExecutionBackend, ExecutionResult, ExecutionStatus};
use crate::execution::container_task::ContainerTask;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Programmed outcome for one stubbed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubOutcome {
    Status(ExecutionStatus),
    /// The backend could not run the task at all.
    Unrunnable,
}

/// Programmable [`ExecutionBackend`] that records execution order, honors
/// the per-task timeout the way a real backend must, and can hold
/// executions behind a gate for scheduling tests.
pub struct StubBackend {
    latency: Duration,
    gate: Option<Arc<Semaphore>>,
    outcomes: Mutex<HashMap<String, StubOutcome>>,
    default_outcome: Mutex<StubOutcome>,
    executions: Mutex<Vec<String>>,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StubBackend {
    /// A stub that succeeds instantly for every task.
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            gate: None,
            outcomes: Mutex::new(HashMap::new()),
            default_outcome: Mutex::new(StubOutcome::Status(ExecutionStatus::Success)),
            executions: Mutex::new(Vec::new()),
        }
    }

    /// Simulated execution time per task.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Hold every execution until [`StubBackend::release`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Program the outcome for a specific task id.
    pub fn set_outcome(&self, task_id: &str, outcome: StubOutcome) {
        self.outcomes.lock().insert(task_id.to_string(), outcome);
    }

    /// Program the outcome for every task without a per-id entry. Useful
    /// when the caller does not control the generated call ids.
    pub fn set_outcome_for_all(&self, outcome: StubOutcome) {
        *self.default_outcome.lock() = outcome;
    }

    /// Let gated executions proceed.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(usize::MAX >> 4);
        }
    }

    /// Task ids in the order their executions started.
    pub fn executions(&self) -> Vec<String> {
        self.executions.lock().clone()
    }

    /// Block until at least `count` executions have started.
    pub async fn wait_for_executions(&self, count: usize) {
        loop {
            if self.executions.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl ExecutionBackend for StubBackend {
    async fn run(&self, task: &ContainerTask) -> ApiResult<ExecutionResult> {
        self.executions.lock().push(task.id().to_string());

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| ApiError::execution("Stub gate closed"))?;
            permit.forget();
        }

        let started = Instant::now();
        let timeout = Duration::from_secs(task.timeout_seconds());
        if self.latency > timeout {
            tokio::time::sleep(timeout).await;
            return Ok(ExecutionResult {
                status: ExecutionStatus::Timeout,
                elapsed: started.elapsed(),
            });
        }
        tokio::time::sleep(self.latency).await;

        let outcome = self
            .outcomes
            .lock()
            .get(task.id())
            .copied()
            .unwrap_or(*self.default_outcome.lock());

        match outcome {
            StubOutcome::Status(status) => Ok(ExecutionResult {
                status,
                elapsed: started.elapsed(),
            }),
            StubOutcome::Unrunnable => Err(ApiError::execution(format!(
                "Stub backend refused to run task {}",
                task.id()
            ))),
        }
    }
}
