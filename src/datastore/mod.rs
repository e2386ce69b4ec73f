//! # Datastore Abstraction
//!
//! Persistence boundary for apps, routes and extension data. The engine
//! treats any implementation as an opaque collaborator; the in-memory
//! store ships as the reference implementation for tests and embedded
//! deployments.

pub mod memory;

pub use memory::MemoryDatastore;

use crate::error::ApiResult;
use crate::models::{App, AppFilter, Route, RouteFilter};
use async_trait::async_trait;

/// CRUD over registered apps and routes, plus a generic key/value store
/// for extension data.
///
/// `get_app`/`get_route` return `None` for unknown names; removal of an
/// unknown app or route is a NotFound error, never a silent success. All
/// route paths are absolute.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn get_app(&self, app_name: &str) -> ApiResult<Option<App>>;
    async fn get_apps(&self, filter: &AppFilter) -> ApiResult<Vec<App>>;
    async fn insert_app(&self, app: &App) -> ApiResult<App>;
    async fn update_app(&self, app: &App) -> ApiResult<App>;
    async fn remove_app(&self, app_name: &str) -> ApiResult<()>;

    async fn get_route(&self, app_name: &str, route_path: &str) -> ApiResult<Option<Route>>;
    async fn get_routes(&self, filter: &RouteFilter) -> ApiResult<Vec<Route>>;
    async fn get_routes_by_app(
        &self,
        app_name: &str,
        filter: &RouteFilter,
    ) -> ApiResult<Vec<Route>>;
    async fn insert_route(&self, route: &Route) -> ApiResult<Route>;
    async fn update_route(&self, route: &Route) -> ApiResult<Route>;
    async fn remove_route(&self, app_name: &str, route_path: &str) -> ApiResult<()>;

    /// Generic key/value storage for extensions.
    async fn put(&self, key: &[u8], value: &[u8]) -> ApiResult<()>;
    async fn get(&self, key: &[u8]) -> ApiResult<Option<Vec<u8>>>;
}
