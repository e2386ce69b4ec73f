//! # Worker Pool & Synchronous Dispatch
//!
//! A fixed set of executor routines pulling from a shared two-tier request
//! channel: High is always checked before Normal, strict FIFO within a
//! tier. This is deliberately not a weighted priority queue; sustained
//! High traffic starves Normal requests indefinitely, and callers that
//! care must shape their traffic accordingly.
//!
//! Every submitted request receives exactly one response on its dedicated
//! one-shot channel, including when the backend errors. Submission blocks
//! once the pool and a tier's buffer are saturated, pushing backpressure to
//! the ingress instead of absorbing it internally.

use crate::constants::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_WORKER_COUNT};
use crate::error::{ApiError, ApiResult};
use crate::execution::backend::{ExecutionResult, ExecutionStatus};
use crate::execution::executor::Executor;
use crate::execution::invocation::InvocationConfig;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Dispatch tier for synchronous requests. Inbound user requests run High;
/// background work runs Normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPriority {
    High,
    Normal,
}

/// The single response every request gets: a classified execution result,
/// or the error that prevented execution.
pub type TaskResponse = ApiResult<ExecutionResult>;

/// One synchronous invocation in flight: its config plus the dedicated
/// one-shot channel its response is delivered on. Created per submission,
/// destroyed after its single response.
struct TaskRequest {
    config: InvocationConfig,
    response: oneshot::Sender<TaskResponse>,
}

/// Worker pool sizing.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub workers: usize,
    /// Per-tier buffer depth.
    pub channel_capacity: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKER_COUNT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Counters shared by all workers.
#[derive(Default)]
struct PoolCounters {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
}

/// Point-in-time pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPoolStats {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
}

/// Both tier receivers, shared by all workers behind one lock: whichever
/// worker is idle first holds the pair while waiting, takes the next
/// request, and releases the pair before executing it.
struct ChannelPair {
    high: mpsc::Receiver<TaskRequest>,
    normal: mpsc::Receiver<TaskRequest>,
    high_closed: bool,
    normal_closed: bool,
}

enum Pulled {
    High(Option<TaskRequest>),
    Normal(Option<TaskRequest>),
}

impl ChannelPair {
    /// Next request, High tier first. Returns `None` only when both tiers
    /// are closed and drained.
    async fn pull(&mut self) -> Option<TaskRequest> {
        loop {
            // Anything already waiting in High wins outright.
            match self.high.try_recv() {
                Ok(request) => return Some(request),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.high_closed = true,
            }

            if self.high_closed && self.normal_closed {
                return None;
            }
            if self.high_closed {
                return self.normal.recv().await;
            }
            if self.normal_closed {
                match self.high.recv().await {
                    Some(request) => return Some(request),
                    None => {
                        self.high_closed = true;
                        continue;
                    }
                }
            }

            let pulled = {
                let high = &mut self.high;
                let normal = &mut self.normal;
                tokio::select! {
                    biased;
                    request = high.recv() => Pulled::High(request),
                    request = normal.recv() => Pulled::Normal(request),
                }
            };
            match pulled {
                Pulled::High(Some(request)) | Pulled::Normal(Some(request)) => {
                    return Some(request)
                }
                Pulled::High(None) => self.high_closed = true,
                Pulled::Normal(None) => self.normal_closed = true,
            }
        }
    }
}

/// The pool of synchronous executor routines.
pub struct WorkerPool {
    high_tx: mpsc::Sender<TaskRequest>,
    normal_tx: mpsc::Sender<TaskRequest>,
    counters: Arc<PoolCounters>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `config.workers` executor routines against the shared
    /// executor primitive.
    pub fn new(executor: Executor, config: WorkerPoolConfig) -> Self {
        let (high_tx, high_rx) = mpsc::channel(config.channel_capacity);
        let (normal_tx, normal_rx) = mpsc::channel(config.channel_capacity);

        let channels = Arc::new(Mutex::new(ChannelPair {
            high: high_rx,
            normal: normal_rx,
            high_closed: false,
            normal_closed: false,
        }));
        let counters = Arc::new(PoolCounters::default());

        let workers = (0..config.workers)
            .map(|worker_id| {
                let channels = Arc::clone(&channels);
                let executor = executor.clone();
                let counters = Arc::clone(&counters);
                tokio::spawn(worker_loop(worker_id, channels, executor, counters))
            })
            .collect();

        info!(
            workers = config.workers,
            channel_capacity = config.channel_capacity,
            "🚀 Worker pool started"
        );

        Self {
            high_tx,
            normal_tx,
            counters,
            workers,
        }
    }

    /// Submit one invocation and block until its single response arrives.
    /// No timeout is applied here beyond what the task itself specifies.
    pub async fn dispatch(
        &self,
        priority: DispatchPriority,
        config: InvocationConfig,
    ) -> TaskResponse {
        let (response_tx, response_rx) = oneshot::channel();
        let request = TaskRequest {
            config,
            response: response_tx,
        };

        let sender = match priority {
            DispatchPriority::High => &self.high_tx,
            DispatchPriority::Normal => &self.normal_tx,
        };
        sender
            .send(request)
            .await
            .map_err(|_| ApiError::dispatch("Worker pool is shut down"))?;

        response_rx
            .await
            .map_err(|_| ApiError::dispatch("Worker dropped the response channel"))?
    }

    pub fn stats(&self) -> WorkerPoolStats {
        WorkerPoolStats {
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting work, drain buffered requests, and wait for every
    /// worker to finish its current execution.
    pub async fn shutdown(self) {
        drop(self.high_tx);
        drop(self.normal_tx);
        for result in futures::future::join_all(self.workers).await {
            if let Err(err) = result {
                warn!(error = %err, "Worker panicked during shutdown");
            }
        }
        info!("Worker pool drained and stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    channels: Arc<Mutex<ChannelPair>>,
    executor: Executor,
    counters: Arc<PoolCounters>,
) {
    debug!(worker_id, "Worker started");
    loop {
        let request = {
            let mut pair = channels.lock().await;
            pair.pull().await
        };
        let Some(request) = request else { break };
        serve(worker_id, request, &executor, &counters).await;
    }
    debug!(worker_id, "Worker stopped");
}

/// Execute one request and deliver its single response. A timeout frees
/// this worker only once the backend call returns; the dispatch layer
/// never kills an in-flight execution.
async fn serve(
    worker_id: usize,
    request: TaskRequest,
    executor: &Executor,
    counters: &PoolCounters,
) {
    counters.dispatched.fetch_add(1, Ordering::Relaxed);
    let call_id = request.config.id.clone();

    let result = executor.execute(&request.config).await;
    match &result {
        Ok(execution) => match execution.status {
            ExecutionStatus::Success => counters.succeeded.fetch_add(1, Ordering::Relaxed),
            ExecutionStatus::Error => counters.failed.fetch_add(1, Ordering::Relaxed),
            ExecutionStatus::Timeout => counters.timed_out.fetch_add(1, Ordering::Relaxed),
        },
        Err(_) => counters.failed.fetch_add(1, Ordering::Relaxed),
    };

    if request.response.send(result).is_err() {
        warn!(
            worker_id,
            call_id = %call_id,
            "Submitter went away before the response could be delivered"
        );
    }
}
