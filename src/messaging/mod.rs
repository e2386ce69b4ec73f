//! # Messaging Module
//!
//! Durable queue boundary for asynchronous task execution. The engine
//! treats the queue as an opaque, already-synchronized service; the
//! in-memory queue ships as the reference implementation.

pub mod memory;

pub use memory::MemoryQueue;

use crate::error::ApiResult;
use crate::models::Task;
use async_trait::async_trait;
use std::time::Duration;

/// Push/reserve/delete over queued tasks, with at-least-once delivery.
///
/// `reserve` atomically hides the returned task from concurrent reservers
/// for the visibility window; a reserved-but-undeleted task becomes
/// reservable again once the window elapses. Implementations provide their
/// own internal synchronization.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue a task. The task is immutable from this point on.
    async fn push(&self, task: &Task) -> ApiResult<Task>;

    /// Reserve the next task, hiding it for `visibility_timeout`. Returns
    /// `None` when nothing is reservable.
    async fn reserve(&self, visibility_timeout: Duration) -> ApiResult<Option<Task>>;

    /// Permanently remove a task. Called only after successful execution.
    async fn delete(&self, task: &Task) -> ApiResult<()>;
}
