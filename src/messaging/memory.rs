//! # In-Memory Message Queue
//!
//! Reference [`MessageQueue`] implementation: per-priority FIFO buffers
//! plus a reservation table keyed by task id. Reservations that outlive
//! their visibility window are returned to the front of their tier before
//! the next reserve, so redelivered tasks are not penalized for having
//! failed once.

use crate::constants::MAX_TASK_PRIORITY;
use crate::error::{ApiError, ApiResult};
use crate::messaging::MessageQueue;
use crate::models::Task;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::debug;

const TIERS: usize = MAX_TASK_PRIORITY as usize + 1;

struct Reservation {
    task: Task,
    deadline: Instant,
}

#[derive(Default)]
struct QueueState {
    /// One FIFO buffer per priority tier, index == tier.
    buffers: Vec<VecDeque<Task>>,
    reserved: HashMap<String, Reservation>,
}

/// In-memory [`MessageQueue`] implementation.
pub struct MemoryQueue {
    state: Mutex<QueueState>,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueue {
    pub fn new() -> Self {
        let mut state = QueueState::default();
        state.buffers = (0..TIERS).map(|_| VecDeque::new()).collect();
        Self {
            state: Mutex::new(state),
        }
    }

    /// Tasks currently waiting in buffers (excludes reserved tasks).
    pub fn waiting(&self) -> usize {
        let state = self.state.lock();
        state.buffers.iter().map(VecDeque::len).sum()
    }

    /// Tasks currently hidden by an active reservation.
    pub fn reserved(&self) -> usize {
        self.state.lock().reserved.len()
    }

    /// Move expired reservations back into their tier. Redelivered tasks
    /// go to the front so the earliest work is retried first.
    fn requeue_expired(state: &mut QueueState, now: Instant) {
        let expired: Vec<String> = state
            .reserved
            .iter()
            .filter(|(_, reservation)| reservation.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            if let Some(reservation) = state.reserved.remove(&id) {
                debug!(task_id = %id, "Reservation expired, task visible again");
                let tier = reservation.task.priority_tier();
                state.buffers[tier].push_front(reservation.task);
            }
        }
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn push(&self, task: &Task) -> ApiResult<Task> {
        if task.id.is_empty() {
            return Err(ApiError::validation("Task is missing an id"));
        }
        let mut state = self.state.lock();
        let tier = task.priority_tier();
        state.buffers[tier].push_back(task.clone());
        debug!(task_id = %task.id, tier, "Task enqueued");
        Ok(task.clone())
    }

    async fn reserve(&self, visibility_timeout: Duration) -> ApiResult<Option<Task>> {
        let now = Instant::now();
        let mut state = self.state.lock();
        Self::requeue_expired(&mut state, now);

        // Highest tier first, FIFO within a tier.
        for tier in (0..TIERS).rev() {
            if let Some(task) = state.buffers[tier].pop_front() {
                state.reserved.insert(
                    task.id.clone(),
                    Reservation {
                        task: task.clone(),
                        deadline: now + visibility_timeout,
                    },
                );
                debug!(task_id = %task.id, tier, "Task reserved");
                return Ok(Some(task));
            }
        }
        Ok(None)
    }

    async fn delete(&self, task: &Task) -> ApiResult<()> {
        let mut state = self.state.lock();

        if state.reserved.remove(&task.id).is_some() {
            debug!(task_id = %task.id, "Task deleted");
            return Ok(());
        }

        // The reservation may have expired and put the task back in a
        // buffer; delete must still win over redelivery.
        for buffer in state.buffers.iter_mut() {
            if let Some(position) = buffer.iter().position(|queued| queued.id == task.id) {
                buffer.remove(position);
                debug!(task_id = %task.id, "Task deleted after reservation expiry");
                return Ok(());
            }
        }

        Err(ApiError::delivery(
            "delete",
            format!("Task not found: {}", task.id),
        ))
    }
}
