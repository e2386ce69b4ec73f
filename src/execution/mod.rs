//! # Execution Module
//!
//! Everything between a resolved route and a finished function run: the
//! invocation config, the container task descriptor handed to execution
//! backends, the backend capability itself, the shared executor primitive,
//! and the synchronous worker pool.

pub mod backend;
pub mod container_task;
pub mod executor;
pub mod invocation;
pub mod worker_pool;

pub use backend::{ExecutionBackend, ExecutionResult, ExecutionStatus, ProcessBackend};
pub use container_task::{ContainerTask, NoAuth, RegistryAuth, RegistryAuthConfig};
pub use executor::Executor;
pub use invocation::{InvocationConfig, StdoutSink};
pub use worker_pool::{
    DispatchPriority, TaskResponse, WorkerPool, WorkerPoolConfig, WorkerPoolStats,
};
