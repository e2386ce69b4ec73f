//! # Dispatch Integration Tests
//!
//! End-to-end coverage of the synchronous request path: middleware → app
//! lookup → trie match → environment assembly → worker pool dispatch,
//! using the in-memory datastore and the local process backend.

use anyhow::Result;
use async_trait::async_trait;
use fnserve_core::config::ServerConfig;
use fnserve_core::datastore::{Datastore, MemoryDatastore};
use fnserve_core::dispatch::{DispatchEngine, DispatchOutcome};
use fnserve_core::error::{ApiError, ApiResult};
use fnserve_core::execution::{ExecutionStatus, Executor, NoAuth, ProcessBackend};
use fnserve_core::messaging::{MemoryQueue, MessageQueue};
use fnserve_core::middleware::{Middleware, MiddlewareChain, MiddlewareContext, Verdict};
use fnserve_core::models::{App, Request, Route, RouteType};
use fnserve_core::test_support::StubBackend;
use std::sync::Arc;
use std::time::Duration;

/// A route whose image is a shell line run by the process backend.
fn shell_route(path: &str, command_line: &str) -> Route {
    Route {
        app_name: "myapp".to_string(),
        path: path.to_string(),
        image: command_line.to_string(),
        ..Route::default()
    }
}

struct Harness {
    datastore: Arc<MemoryDatastore>,
    queue: Arc<MemoryQueue>,
    engine: DispatchEngine,
}

async fn harness_with(chain: MiddlewareChain, routes: &[Route]) -> Result<Harness> {
    let datastore = Arc::new(MemoryDatastore::new());
    for route in routes {
        datastore.insert_route(route).await?;
    }

    let queue = Arc::new(MemoryQueue::new());
    let executor = Executor::new(Arc::new(ProcessBackend::new()), Arc::new(NoAuth));
    let config = ServerConfig {
        worker_count: 2,
        default_timeout: Duration::from_secs(5),
        ..ServerConfig::default()
    };
    let engine = DispatchEngine::new(
        datastore.clone() as Arc<dyn Datastore>,
        queue.clone() as Arc<dyn MessageQueue>,
        executor,
        chain,
        &config,
    );
    Ok(Harness {
        datastore,
        queue,
        engine,
    })
}

async fn harness(routes: &[Route]) -> Result<Harness> {
    harness_with(MiddlewareChain::new(), routes).await
}

fn completed(outcome: DispatchOutcome) -> (ExecutionStatus, String) {
    match outcome {
        DispatchOutcome::Completed { result, stdout, .. } => (
            result.status,
            String::from_utf8_lossy(&stdout).trim().to_string(),
        ),
        DispatchOutcome::Queued { task_id } => panic!("expected sync completion, got task {task_id}"),
    }
}

#[tokio::test]
async fn test_sync_dispatch_assembles_environment() -> Result<()> {
    let h = harness(&[shell_route(
        "/greet/:name",
        "echo \"$METHOD $ROUTE $PARAM_NAME $HEADER_X_GREETING\"",
    )])
    .await?;

    let req = Request::new("myapp", "GET", "/greet/world").with_header("X-Greeting", "hej");
    let (status, stdout) = completed(h.engine.handle(&req).await?);

    assert_eq!(status, ExecutionStatus::Success);
    assert_eq!(stdout, "GET /greet/:name world hej");
    Ok(())
}

#[tokio::test]
async fn test_app_and_route_config_reach_the_function() -> Result<()> {
    let mut route = shell_route("/env", "echo \"$DB_URL $TIER\"");
    route.config.insert("tier".to_string(), "gold".to_string());
    let h = harness(&[route]).await?;

    let app = App::new("myapp").with_config("db-url", "memory://local");
    h.datastore.update_app(&app).await?;

    let (_, stdout) = completed(h.engine.handle(&Request::new("myapp", "GET", "/env")).await?);
    assert_eq!(stdout, "memory://local gold");
    Ok(())
}

#[tokio::test]
async fn test_post_body_is_delivered_on_stdin() -> Result<()> {
    let h = harness(&[shell_route("/echo", "cat")]).await?;

    let req = Request::new("myapp", "POST", "/echo").with_body("{\"name\":\"world\"}");
    let (status, stdout) = completed(h.engine.handle(&req).await?);

    assert_eq!(status, ExecutionStatus::Success);
    assert_eq!(stdout, "{\"name\":\"world\"}");
    Ok(())
}

#[tokio::test]
async fn test_unknown_app_and_route_are_not_found() -> Result<()> {
    let h = harness(&[shell_route("/hello", "true")]).await?;

    let err = h
        .engine
        .handle(&Request::new("ghost", "GET", "/hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));

    let err = h
        .engine
        .handle(&Request::new("myapp", "GET", "/missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn test_static_route_beats_parametrized_sibling() -> Result<()> {
    let h = harness(&[
        shell_route("/a/b", "echo static"),
        shell_route("/a/:x", "echo param $PARAM_X"),
    ])
    .await?;

    let (_, stdout) = completed(h.engine.handle(&Request::new("myapp", "GET", "/a/b")).await?);
    assert_eq!(stdout, "static");

    let (_, stdout) = completed(h.engine.handle(&Request::new("myapp", "GET", "/a/c")).await?);
    assert_eq!(stdout, "param c");
    Ok(())
}

#[tokio::test]
async fn test_route_headers_returned_on_completion() -> Result<()> {
    let mut route = shell_route("/hello", "true");
    route.headers.insert(
        "Content-Type".to_string(),
        vec!["application/json".to_string()],
    );
    let h = harness(&[route]).await?;

    match h.engine.handle(&Request::new("myapp", "GET", "/hello")).await? {
        DispatchOutcome::Completed { headers, .. } => {
            assert_eq!(headers.get("Content-Type").unwrap()[0], "application/json");
        }
        other => panic!("expected completion, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_stalled_function_is_classified_as_timeout() -> Result<()> {
    let datastore = Arc::new(MemoryDatastore::new());
    datastore.insert_route(&shell_route("/slow", "sleep 30")).await?;

    let executor = Executor::new(Arc::new(ProcessBackend::new()), Arc::new(NoAuth));
    let config = ServerConfig {
        worker_count: 1,
        default_timeout: Duration::from_secs(1),
        ..ServerConfig::default()
    };
    let engine = DispatchEngine::new(
        datastore as Arc<dyn Datastore>,
        Arc::new(MemoryQueue::new()) as Arc<dyn MessageQueue>,
        executor,
        MiddlewareChain::new(),
        &config,
    );

    let (status, _) = completed(engine.handle(&Request::new("myapp", "GET", "/slow")).await?);
    assert_eq!(status, ExecutionStatus::Timeout);
    assert_eq!(engine.pool_stats().timed_out, 1);
    Ok(())
}

/// Rejects requests that do not carry the header the app requires.
struct RequireHeader;

#[async_trait]
impl Middleware for RequireHeader {
    async fn handle(
        &self,
        ctx: &MiddlewareContext,
        req: &Request,
        app: &App,
    ) -> ApiResult<Verdict> {
        let required = app
            .config
            .get("required-header")
            .map(String::as_str)
            .unwrap_or("X-Fn-Token");
        match req.headers.get(required) {
            Some(token) => Ok(Verdict::ContinueWith(
                ctx.with_value("token", serde_json::json!(token)),
            )),
            None => Err(ApiError::validation(format!("Missing header {required}"))),
        }
    }
}

#[tokio::test]
async fn test_middleware_abort_prevents_dispatch() -> Result<()> {
    let backend = Arc::new(StubBackend::new());
    let datastore = Arc::new(MemoryDatastore::new());
    datastore
        .insert_route(&shell_route("/guarded", "fnserve/guarded"))
        .await?;

    let mut chain = MiddlewareChain::new();
    chain.add(Arc::new(RequireHeader));

    let executor = Executor::new(backend.clone(), Arc::new(NoAuth));
    let engine = DispatchEngine::new(
        datastore as Arc<dyn Datastore>,
        Arc::new(MemoryQueue::new()) as Arc<dyn MessageQueue>,
        executor,
        chain,
        &ServerConfig::default(),
    );

    let err = engine
        .handle(&Request::new("myapp", "GET", "/guarded"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation { .. }));
    // The chain aborted before dispatch; nothing reached the backend.
    assert!(backend.executions().is_empty());

    let req = Request::new("myapp", "GET", "/guarded").with_header("X-Fn-Token", "secret");
    engine.handle(&req).await?;
    assert_eq!(backend.executions().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_async_route_enqueues_a_snapshot() -> Result<()> {
    let mut route = shell_route("/jobs/:kind", "fnserve/jobs");
    route.route_type = RouteType::Async;
    let h = harness(&[route]).await?;

    let req = Request::new("myapp", "POST", "/jobs/import").with_body("batch-1");
    let task_id = match h.engine.handle(&req).await? {
        DispatchOutcome::Queued { task_id } => task_id,
        other => panic!("expected enqueue, got {other:?}"),
    };

    let task = h
        .queue
        .reserve(Duration::from_secs(60))
        .await?
        .expect("task should be reservable");
    assert_eq!(task.id, task_id);
    assert_eq!(task.app_name, "myapp");
    assert_eq!(task.route_path, "/jobs/:kind");
    assert_eq!(task.payload, "batch-1");
    // The environment snapshot was captured at enqueue time.
    assert_eq!(task.env_vars.get("PARAM_KIND").unwrap(), "import");
    assert_eq!(task.env_vars.get("METHOD").unwrap(), "POST");
    Ok(())
}

#[tokio::test]
async fn test_route_changes_require_invalidation() -> Result<()> {
    let h = harness(&[shell_route("/one", "echo one")]).await?;

    // First dispatch builds and caches the matcher.
    h.engine.handle(&Request::new("myapp", "GET", "/one")).await?;

    // A route added behind the cache is invisible until invalidation.
    h.datastore.insert_route(&shell_route("/two", "echo two")).await?;
    let err = h
        .engine
        .handle(&Request::new("myapp", "GET", "/two"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));

    h.engine.invalidate_routes("myapp");
    let (_, stdout) = completed(h.engine.handle(&Request::new("myapp", "GET", "/two")).await?);
    assert_eq!(stdout, "two");
    Ok(())
}

#[tokio::test]
async fn test_backend_refusal_surfaces_as_execution_error() -> Result<()> {
    let backend = Arc::new(StubBackend::new());
    let datastore = Arc::new(MemoryDatastore::new());
    let route = shell_route("/hello", "task-under-test");
    datastore.insert_route(&route).await?;

    let executor = Executor::new(backend.clone(), Arc::new(NoAuth));
    let engine = DispatchEngine::new(
        datastore as Arc<dyn Datastore>,
        Arc::new(MemoryQueue::new()) as Arc<dyn MessageQueue>,
        executor,
        MiddlewareChain::new(),
        &ServerConfig::default(),
    );

    // Call ids are generated per request, so refuse every task.
    backend.set_outcome_for_all(fnserve_core::test_support::StubOutcome::Unrunnable);
    let err = engine
        .handle(&Request::new("myapp", "GET", "/hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Execution { .. }));
    assert_eq!(engine.pool_stats().failed, 1);
    Ok(())
}
