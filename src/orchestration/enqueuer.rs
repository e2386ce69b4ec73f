//! # Task Enqueuer
//!
//! Producer side of the asynchronous lifecycle: turns an invocation config
//! into an immutable [`Task`] and pushes it to the queue. The task carries
//! its own payload and environment snapshot, so execution later does not
//! depend on the route or app still looking the same.

use crate::error::ApiResult;
use crate::execution::invocation::InvocationConfig;
use crate::logging::log_queue_operation;
use crate::messaging::MessageQueue;
use crate::models::Task;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Builds and enqueues tasks for deferred execution.
#[derive(Clone)]
pub struct TaskEnqueuer {
    queue: Arc<dyn MessageQueue>,
}

impl TaskEnqueuer {
    pub fn new(queue: Arc<dyn MessageQueue>) -> Self {
        Self { queue }
    }

    /// Snapshot the invocation into a task and push it. The returned task
    /// is exactly what the queue accepted; its id is the caller's handle
    /// for correlating logs once a poller picks it up.
    pub async fn enqueue(&self, config: &InvocationConfig, priority: i32) -> ApiResult<Task> {
        let task = Task {
            id: config.id.clone(),
            image: config.image.clone(),
            payload: config.payload.clone().unwrap_or_default(),
            env_vars: config.env.clone(),
            priority,
            route_path: config.route_path.clone(),
            app_name: config.app_name.clone(),
            timeout_seconds: Some(config.timeout.as_secs() as u32),
            created_at: Utc::now(),
        };

        let accepted = self.queue.push(&task).await?;
        info!(
            task_id = %accepted.id,
            app_name = %accepted.app_name,
            route_path = %accepted.route_path,
            priority,
            "Task added to queue"
        );
        log_queue_operation("push", Some(&accepted.id), "enqueued", None);
        Ok(accepted)
    }
}
