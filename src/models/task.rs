//! # Task Model
//!
//! One concrete unit of deferred work derived from a route invocation. A
//! task carries its own payload and environment snapshot so execution does
//! not depend on the route still existing when the task is reserved.
//!
//! Tasks are immutable once created and logically consumed exactly once;
//! under at-least-once delivery a task may still execute more than once
//! when a reservation expires before a successful delete.

use crate::constants::{DEFAULT_TASK_TIMEOUT_SECONDS, MAX_TASK_PRIORITY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A queued function invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque identifier, assigned at enqueue time.
    pub id: String,

    /// Image reference handed to the execution backend.
    pub image: String,

    /// Request payload captured at enqueue time, delivered on stdin.
    #[serde(default)]
    pub payload: String,

    /// Environment snapshot captured at enqueue time.
    #[serde(default)]
    pub env_vars: HashMap<String, String>,

    /// Reservation priority, `0..=2`, higher first. Affects dispatch order
    /// only, never correctness.
    #[serde(default)]
    pub priority: i32,

    /// Path pattern of the route this task was derived from.
    pub route_path: String,

    pub app_name: String,

    /// Execution timeout in seconds; `None` falls back to the system
    /// default at execution time.
    #[serde(default)]
    pub timeout_seconds: Option<u32>,

    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Queue tier for this task, clamped to the supported priority range.
    pub fn priority_tier(&self) -> usize {
        self.priority.clamp(0, MAX_TASK_PRIORITY) as usize
    }

    /// Effective execution timeout in seconds.
    pub fn effective_timeout_seconds(&self) -> u64 {
        self.timeout_seconds
            .map(u64::from)
            .unwrap_or(DEFAULT_TASK_TIMEOUT_SECONDS)
    }
}
