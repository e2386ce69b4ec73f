//! # Task Poller
//!
//! Consumer side of the asynchronous lifecycle: reserve, execute, delete.
//! Each poll loop reserves the next task (hiding it for the visibility
//! window), runs it through the same [`Executor`] primitive the synchronous
//! worker pool uses, and deletes it only on success. Any failure, whether
//! in execution or in the delete itself, leaves the task to reappear once
//! its window elapses.
//!
//! Delivery is therefore at-least-once: a crash between successful
//! execution and successful delete redelivers the task, and the function
//! may run more than once. Deduplicating those side effects is the
//! function's concern; there is no max-retry count or dead-letter routing
//! at this layer.

use crate::error::ApiResult;
use crate::execution::backend::ExecutionStatus;
use crate::execution::executor::Executor;
use crate::execution::invocation::InvocationConfig;
use crate::logging::log_queue_operation;
use crate::messaging::MessageQueue;
use crate::models::Task;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Poll loop sizing and timing.
#[derive(Debug, Clone)]
pub struct TaskPollerConfig {
    /// Number of independent poll loops.
    pub pollers: usize,
    /// How long a reserved task stays hidden from other pollers.
    pub visibility_timeout: Duration,
    /// Fixed backoff after an empty reserve or a queue error.
    pub empty_backoff: Duration,
}

impl Default for TaskPollerConfig {
    fn default() -> Self {
        let server = crate::config::ServerConfig::default();
        Self {
            pollers: server.poller_count,
            visibility_timeout: server.visibility_timeout,
            empty_backoff: server.empty_backoff,
        }
    }
}

#[derive(Default)]
struct PollerCounters {
    executed: AtomicU64,
    deleted: AtomicU64,
    redelivering: AtomicU64,
}

/// Point-in-time poller statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPollerStats {
    /// Tasks run to completion, whatever the classification.
    pub executed: u64,
    /// Tasks acknowledged and permanently removed.
    pub deleted: u64,
    /// Tasks left for redelivery after a failure.
    pub redelivering: u64,
}

/// A set of running reserve/execute/delete loops.
pub struct TaskPoller {
    shutdown: watch::Sender<bool>,
    counters: Arc<PollerCounters>,
    loops: Vec<JoinHandle<()>>,
}

impl TaskPoller {
    /// Spawn `config.pollers` loops against the queue and the shared
    /// execution primitive.
    pub fn start(
        queue: Arc<dyn MessageQueue>,
        executor: Executor,
        config: TaskPollerConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let counters = Arc::new(PollerCounters::default());

        let loops = (0..config.pollers)
            .map(|poller_id| {
                let queue = Arc::clone(&queue);
                let executor = executor.clone();
                let config = config.clone();
                let counters = Arc::clone(&counters);
                let shutdown_rx = shutdown.subscribe();
                tokio::spawn(poll_loop(
                    poller_id,
                    queue,
                    executor,
                    config,
                    counters,
                    shutdown_rx,
                ))
            })
            .collect();

        info!(
            pollers = config.pollers,
            visibility_timeout_seconds = config.visibility_timeout.as_secs(),
            "🚀 Async task pollers started"
        );

        Self {
            shutdown,
            counters,
            loops,
        }
    }

    pub fn stats(&self) -> TaskPollerStats {
        TaskPollerStats {
            executed: self.counters.executed.load(Ordering::Relaxed),
            deleted: self.counters.deleted.load(Ordering::Relaxed),
            redelivering: self.counters.redelivering.load(Ordering::Relaxed),
        }
    }

    /// Signal every loop to stop and wait for in-flight executions to
    /// finish. Reserved-but-unfinished tasks redeliver after their window.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for result in futures::future::join_all(self.loops).await {
            if let Err(err) = result {
                warn!(error = %err, "Poller panicked during shutdown");
            }
        }
        info!("Async task pollers stopped");
    }
}

async fn poll_loop(
    poller_id: usize,
    queue: Arc<dyn MessageQueue>,
    executor: Executor,
    config: TaskPollerConfig,
    counters: Arc<PollerCounters>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(poller_id, "Poller started");
    loop {
        if *shutdown.borrow() {
            break;
        }

        match queue.reserve(config.visibility_timeout).await {
            Ok(Some(task)) => {
                info!(poller_id, task_id = %task.id, "Picked up task");
                serve(&task, &executor, &queue, &counters).await;
            }
            Ok(None) => {
                if wait_or_shutdown(&mut shutdown, config.empty_backoff).await {
                    break;
                }
            }
            Err(err) => {
                // Queue unavailability is never fatal to the loop.
                warn!(poller_id, error = %err, "Queue reserve failed, backing off");
                if wait_or_shutdown(&mut shutdown, config.empty_backoff).await {
                    break;
                }
            }
        }
    }
    debug!(poller_id, "Poller stopped");
}

/// Sleep for `backoff`, returning true if shutdown was requested meanwhile.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, backoff: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(backoff) => *shutdown.borrow(),
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

/// Run one reserved task and acknowledge it on success. Errors are
/// absorbed: no caller is waiting, so failure means redelivery, not
/// propagation.
async fn serve(
    task: &Task,
    executor: &Executor,
    queue: &Arc<dyn MessageQueue>,
    counters: &PollerCounters,
) {
    let config = InvocationConfig::from(task);
    let succeeded = match executor.execute(&config).await {
        Ok(result) => {
            counters.executed.fetch_add(1, Ordering::Relaxed);
            result.status == ExecutionStatus::Success
        }
        Err(err) => {
            warn!(task_id = %task.id, error = %err, "Task execution failed");
            false
        }
    };

    if !succeeded {
        counters.redelivering.fetch_add(1, Ordering::Relaxed);
        log_queue_operation("redeliver", Some(&task.id), "pending", None);
        return;
    }

    match queue.delete(task).await {
        Ok(()) => {
            counters.deleted.fetch_add(1, Ordering::Relaxed);
            info!(task_id = %task.id, "Processed and deleted task");
            log_queue_operation("delete", Some(&task.id), "deleted", None);
        }
        Err(err) => {
            // The work itself succeeded; the next delivery runs it again.
            counters.redelivering.fetch_add(1, Ordering::Relaxed);
            warn!(
                task_id = %task.id,
                error = %err,
                "Delete failed after successful execution, task will redeliver"
            );
        }
    }
}
