//! # In-Memory Datastore
//!
//! DashMap-backed reference implementation of [`Datastore`]. State does not
//! survive the process; tests and single-node embedded deployments are the
//! intended users.

use crate::datastore::Datastore;
use crate::error::{ApiError, ApiResult};
use crate::models::{App, AppFilter, Route, RouteFilter};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

/// In-memory [`Datastore`] implementation.
#[derive(Default)]
pub struct MemoryDatastore {
    apps: DashMap<String, App>,
    routes: DashMap<(String, String), Route>,
    extras: DashMap<Vec<u8>, Vec<u8>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn get_app(&self, app_name: &str) -> ApiResult<Option<App>> {
        if app_name.is_empty() {
            return Err(ApiError::validation("Missing app name"));
        }
        Ok(self.apps.get(app_name).map(|entry| entry.value().clone()))
    }

    async fn get_apps(&self, filter: &AppFilter) -> ApiResult<Vec<App>> {
        let mut apps: Vec<App> = self
            .apps
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }

    async fn insert_app(&self, app: &App) -> ApiResult<App> {
        app.validate()?;
        if self.apps.contains_key(&app.name) {
            return Err(ApiError::validation(format!(
                "App already exists: {}",
                app.name
            )));
        }
        self.apps.insert(app.name.clone(), app.clone());
        debug!(app_name = %app.name, "App stored");
        Ok(app.clone())
    }

    async fn update_app(&self, app: &App) -> ApiResult<App> {
        app.validate()?;
        let mut existing = self
            .apps
            .get_mut(&app.name)
            .ok_or_else(|| ApiError::app_not_found(&app.name))?;
        // Config replaces wholesale; partial merges are the caller's job.
        existing.config = app.config.clone();
        Ok(existing.clone())
    }

    async fn remove_app(&self, app_name: &str) -> ApiResult<()> {
        if app_name.is_empty() {
            return Err(ApiError::validation("Missing app name"));
        }
        self.apps
            .remove(app_name)
            .map(|_| ())
            .ok_or_else(|| ApiError::app_not_found(app_name))
    }

    async fn get_route(&self, app_name: &str, route_path: &str) -> ApiResult<Option<Route>> {
        if app_name.is_empty() {
            return Err(ApiError::validation("Missing app name"));
        }
        if route_path.is_empty() {
            return Err(ApiError::validation("Missing route path"));
        }
        let key = (app_name.to_string(), route_path.to_string());
        Ok(self.routes.get(&key).map(|entry| entry.value().clone()))
    }

    async fn get_routes(&self, filter: &RouteFilter) -> ApiResult<Vec<Route>> {
        let mut routes: Vec<Route> = self
            .routes
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        routes.sort_by(|a, b| (&a.app_name, &a.path).cmp(&(&b.app_name, &b.path)));
        Ok(routes)
    }

    async fn get_routes_by_app(
        &self,
        app_name: &str,
        filter: &RouteFilter,
    ) -> ApiResult<Vec<Route>> {
        if app_name.is_empty() {
            return Err(ApiError::validation("Missing app name"));
        }
        let mut routes: Vec<Route> = self
            .routes
            .iter()
            .filter(|entry| entry.key().0 == app_name && filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        routes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(routes)
    }

    async fn insert_route(&self, route: &Route) -> ApiResult<Route> {
        route.validate()?;

        // Routes may arrive before their app; create it implicitly so the
        // route's app_name always references a real app.
        if !self.apps.contains_key(&route.app_name) {
            let app = App::new(route.app_name.clone());
            app.validate()?;
            self.apps.insert(app.name.clone(), app);
            debug!(app_name = %route.app_name, "App implicitly created for new route");
        }

        let key = (route.app_name.clone(), route.path.clone());
        if self.routes.contains_key(&key) {
            return Err(ApiError::validation(format!(
                "Route already exists: {} {}",
                route.app_name, route.path
            )));
        }
        self.routes.insert(key, route.clone());
        debug!(app_name = %route.app_name, path = %route.path, "Route stored");
        Ok(route.clone())
    }

    async fn update_route(&self, route: &Route) -> ApiResult<Route> {
        route.validate()?;
        let key = (route.app_name.clone(), route.path.clone());
        let mut existing = self
            .routes
            .get_mut(&key)
            .ok_or_else(|| ApiError::route_not_found(&route.path))?;
        *existing = route.clone();
        Ok(existing.clone())
    }

    async fn remove_route(&self, app_name: &str, route_path: &str) -> ApiResult<()> {
        if app_name.is_empty() {
            return Err(ApiError::validation("Missing app name"));
        }
        if route_path.is_empty() {
            return Err(ApiError::validation("Missing route path"));
        }
        let key = (app_name.to_string(), route_path.to_string());
        self.routes
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| ApiError::route_not_found(route_path))
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> ApiResult<()> {
        if key.is_empty() {
            return Err(ApiError::validation("Missing key"));
        }
        self.extras.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> ApiResult<Option<Vec<u8>>> {
        if key.is_empty() {
            return Err(ApiError::validation("Missing key"));
        }
        Ok(self.extras.get(key).map(|entry| entry.value().clone()))
    }
}
