//! # Dispatch Engine
//!
//! The request boundary where everything composes: middleware chain, app
//! lookup, trie route match, invocation environment assembly, and finally
//! either synchronous dispatch onto the worker pool or a push onto the
//! durable queue.
//!
//! The engine owns no HTTP concepts; the surface layer reduces a wire
//! request to a [`Request`] before calling [`DispatchEngine::handle`].

use crate::config::ServerConfig;
use crate::constants::env_keys;
use crate::datastore::Datastore;
use crate::error::{ApiError, ApiResult};
use crate::execution::backend::ExecutionResult;
use crate::execution::executor::Executor;
use crate::execution::invocation::InvocationConfig;
use crate::execution::worker_pool::{
    DispatchPriority, WorkerPool, WorkerPoolConfig, WorkerPoolStats,
};
use crate::logging::log_dispatch_operation;
use crate::messaging::MessageQueue;
use crate::middleware::{MiddlewareChain, MiddlewareContext};
use crate::models::{Request, Route, RouteFilter, RouteType};
use crate::orchestration::TaskEnqueuer;
use crate::router::{Params, RouteTrie, RouterCache};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// What came out of one handled request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A synchronous route ran to completion (whatever the classification).
    Completed {
        result: ExecutionResult,
        /// Function stdout captured during the run.
        stdout: Vec<u8>,
        /// Response headers declared on the matched route.
        headers: HashMap<String, Vec<String>>,
    },
    /// An asynchronous route was snapshotted and enqueued.
    Queued { task_id: String },
}

/// Uppercases a config/param/header name into its environment form,
/// optionally under a prefix: `("PARAM", "user-id")` becomes
/// `PARAM_USER_ID`.
pub fn to_env_name(prefix: &str, name: &str) -> String {
    let name = name.replace('-', "_").to_uppercase();
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix}_{name}")
    }
}

/// Composes the middleware chain, route matcher, worker pool and enqueuer
/// behind one `handle` call.
pub struct DispatchEngine {
    datastore: Arc<dyn Datastore>,
    chain: MiddlewareChain,
    router: RouterCache,
    pool: WorkerPool,
    enqueuer: TaskEnqueuer,
    default_timeout: Duration,
}

impl DispatchEngine {
    /// Wire the engine together. The worker pool starts immediately; the
    /// executor is the same primitive any async pollers should be given.
    pub fn new(
        datastore: Arc<dyn Datastore>,
        queue: Arc<dyn MessageQueue>,
        executor: Executor,
        chain: MiddlewareChain,
        config: &ServerConfig,
    ) -> Self {
        let pool = WorkerPool::new(
            executor,
            WorkerPoolConfig {
                workers: config.worker_count,
                channel_capacity: config.channel_capacity,
            },
        );

        Self {
            datastore,
            chain,
            router: RouterCache::new(),
            pool,
            enqueuer: TaskEnqueuer::new(queue),
            default_timeout: config.default_timeout,
        }
    }

    /// Handle one inbound request: middleware → app lookup → route match →
    /// dispatch or enqueue.
    ///
    /// Validation and NotFound failures surface immediately; execution
    /// failures on the synchronous path come back classified inside
    /// [`DispatchOutcome::Completed`], and nothing here retries.
    pub async fn handle(&self, req: &Request) -> ApiResult<DispatchOutcome> {
        if req.app_name.is_empty() {
            return Err(ApiError::validation("Missing app name"));
        }

        let app = self
            .datastore
            .get_app(&req.app_name)
            .await?
            .ok_or_else(|| ApiError::app_not_found(&req.app_name))?;

        let ctx = self.chain.run(MiddlewareContext::new(), req, &app).await?;
        debug!(
            app_name = %app.name,
            path = %req.path,
            middleware_ran = ctx.index(),
            "Finding route"
        );

        let trie = self.trie_for(&app.name).await?;
        let lookup = trie.lookup(&req.path);
        let Some(route) = lookup.handler else {
            return Err(ApiError::route_not_found(&req.path));
        };

        let call_id = Uuid::new_v4().to_string();
        let env = build_env(req, &app.config, route, &lookup.params);
        let config = InvocationConfig::new(&call_id, &app.name, &route.path, &route.image)
            .with_env(env)
            .with_timeout(self.default_timeout)
            .with_memory(route.memory)
            .with_payload(req.payload());

        match route.route_type {
            RouteType::Async => {
                let task = self.enqueuer.enqueue(&config, 0).await?;
                log_dispatch_operation(
                    "enqueue",
                    &call_id,
                    Some(&app.name),
                    Some(&route.path),
                    "queued",
                    None,
                );
                Ok(DispatchOutcome::Queued { task_id: task.id })
            }
            RouteType::Sync => {
                let stdout = Arc::new(Mutex::new(Vec::new()));
                let config = config.with_stdout(stdout.clone());

                let result = self
                    .pool
                    .dispatch(DispatchPriority::High, config)
                    .await?;
                log_dispatch_operation(
                    "dispatch",
                    &call_id,
                    Some(&app.name),
                    Some(&route.path),
                    &format!("{:?}", result.status),
                    None,
                );

                let stdout = std::mem::take(&mut *stdout.lock());
                Ok(DispatchOutcome::Completed {
                    result,
                    stdout,
                    headers: route.headers.clone(),
                })
            }
        }
    }

    /// Drop the cached matcher for an app. The management layer calls this
    /// after any route change; the next request rebuilds from the
    /// datastore.
    pub fn invalidate_routes(&self, app_name: &str) {
        self.router.invalidate(app_name);
    }

    pub fn pool_stats(&self) -> WorkerPoolStats {
        self.pool.stats()
    }

    /// Stop accepting work and drain the worker pool.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }

    async fn trie_for(&self, app_name: &str) -> ApiResult<Arc<RouteTrie<Route>>> {
        if let Some(trie) = self.router.get(app_name) {
            return Ok(trie);
        }
        let routes = self
            .datastore
            .get_routes_by_app(app_name, &RouteFilter::default())
            .await?;
        Ok(self.router.rebuild(app_name, &routes))
    }
}

/// Assemble the function's environment: request identity, app and route
/// config (route wins on collision), trie parameter bindings, and inbound
/// headers.
fn build_env(
    req: &Request,
    app_config: &HashMap<String, String>,
    route: &Route,
    params: &Params,
) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert(env_keys::METHOD.to_string(), req.method.clone());
    env.insert(env_keys::ROUTE.to_string(), route.path.clone());
    env.insert(env_keys::REQUEST_URL.to_string(), req.url());

    for (key, value) in app_config {
        env.insert(to_env_name("", key), value.clone());
    }
    for (key, value) in &route.config {
        env.insert(to_env_name("", key), value.clone());
    }
    for param in params {
        env.insert(to_env_name(env_keys::PARAM_PREFIX, &param.key), param.value.clone());
    }
    for (name, value) in &req.headers {
        env.insert(to_env_name(env_keys::HEADER_PREFIX, name), value.clone());
    }
    env
}
