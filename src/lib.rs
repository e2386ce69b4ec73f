#![allow(clippy::doc_markdown)] // Allow technical terms like FaaS, DashMap in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # fnserve-core
//!
//! Rust core of a function-as-a-service platform: the task dispatch and
//! execution engine. It accepts inbound requests, resolves them to a
//! registered function route, and executes the function inside an isolated
//! execution backend, returning the result synchronously or deferring
//! execution through a durable queue.
//!
//! ## Architecture
//!
//! - A **trie route matcher** resolves a concrete path to a registered
//!   pattern with parameter extraction; static segments beat parameters,
//!   parameters beat wildcards. Tries are built once per route-set version
//!   and shared read-only across concurrent matches.
//! - A **middleware chain** of pure transitions runs before dispatch; a
//!   single driver loop owns advancement, and the first error aborts the
//!   chain and the request.
//! - A **worker pool** of N executor routines consumes a two-tier priority
//!   channel: High before waiting Normal, FIFO within a tier. Every
//!   submission receives exactly one response.
//! - The **async task lifecycle** reserves queued tasks under a visibility
//!   window, runs them through the same execution primitive as the
//!   synchronous path, and deletes them only on success, so delivery is
//!   at-least-once.
//! - Execution backends, datastores, queues and registry auth are injected
//!   capabilities; in-memory references ship for tests and embedded use.
//!
//! ## Module Organization
//!
//! - [`models`] - Apps, routes, tasks and the dispatch-boundary request view
//! - [`router`] - Trie route matcher and the shared per-app matcher cache
//! - [`middleware`] - Interceptor chain with layered, immutable context
//! - [`execution`] - Invocation config, container task descriptor, backends,
//!   the shared executor primitive and the worker pool
//! - [`orchestration`] - Async task enqueuer and reserve/execute/delete pollers
//! - [`dispatch`] - The engine composing everything at the request boundary
//! - [`datastore`] / [`messaging`] - Injected persistence and queue boundaries
//! - [`config`] / [`constants`] / [`error`] / [`logging`] - Ambient stack
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fnserve_core::config::ServerConfig;
//! use fnserve_core::datastore::{Datastore, MemoryDatastore};
//! use fnserve_core::dispatch::DispatchEngine;
//! use fnserve_core::execution::{Executor, NoAuth, ProcessBackend};
//! use fnserve_core::messaging::MemoryQueue;
//! use fnserve_core::middleware::MiddlewareChain;
//! use fnserve_core::models::{Request, Route};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let datastore = Arc::new(MemoryDatastore::new());
//! datastore
//!     .insert_route(&Route {
//!         app_name: "myapp".to_string(),
//!         path: "/hello".to_string(),
//!         image: "fnserve/hello".to_string(),
//!         ..Route::default()
//!     })
//!     .await?;
//!
//! let executor = Executor::new(Arc::new(ProcessBackend::new()), Arc::new(NoAuth));
//! let engine = DispatchEngine::new(
//!     datastore,
//!     Arc::new(MemoryQueue::new()),
//!     executor,
//!     MiddlewareChain::new(),
//!     &ServerConfig::from_env()?,
//! );
//!
//! let outcome = engine.handle(&Request::new("myapp", "GET", "/hello")).await?;
//! println!("dispatched: {outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod datastore;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod logging;
pub mod messaging;
pub mod middleware;
pub mod models;
pub mod orchestration;
pub mod router;
pub mod test_support;

pub use config::ServerConfig;
pub use datastore::{Datastore, MemoryDatastore};
pub use dispatch::{DispatchEngine, DispatchOutcome};
pub use error::{ApiError, ApiResult};
pub use execution::{
    ContainerTask, DispatchPriority, ExecutionBackend, ExecutionResult, ExecutionStatus, Executor,
    InvocationConfig, NoAuth, ProcessBackend, RegistryAuth, RegistryAuthConfig, WorkerPool,
    WorkerPoolConfig, WorkerPoolStats,
};
pub use messaging::{MemoryQueue, MessageQueue};
pub use middleware::{Middleware, MiddlewareChain, MiddlewareContext, Verdict};
pub use models::{App, AppFilter, Request, Route, RouteFilter, RouteType, Task};
pub use orchestration::{TaskEnqueuer, TaskPoller, TaskPollerConfig, TaskPollerStats};
pub use router::{LookupResult, Param, Params, RouteTrie, RouterCache};
