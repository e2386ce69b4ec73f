//! # Route Model
//!
//! A route maps (app, path pattern) to the image and config used to execute
//! a function for matching requests. Routes are keyed by `(app_name, path)`
//! and the path must be absolute.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How matching requests are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    /// Execute in-line on the worker pool and return the result to the
    /// caller.
    #[default]
    Sync,
    /// Defer execution through the durable queue.
    Async,
}

/// A registered function route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub app_name: String,

    /// Absolute path pattern: static segments, `:name` parameters, optional
    /// trailing `*name` wildcard.
    pub path: String,

    /// Image reference handed to the execution backend.
    pub image: String,

    /// Memory limit in MB.
    #[serde(default)]
    pub memory: u64,

    /// Response headers applied on successful synchronous dispatch.
    #[serde(default)]
    pub headers: HashMap<String, Vec<String>>,

    /// Config entries injected into the invocation environment, layered
    /// over the app config.
    #[serde(default)]
    pub config: HashMap<String, String>,

    #[serde(rename = "type", default)]
    pub route_type: RouteType,
}

impl Route {
    /// Validate the route pre-insert, collecting every problem before
    /// failing so callers see the complete list at once.
    pub fn validate(&self) -> ApiResult<()> {
        let mut problems = Vec::new();

        if self.app_name.is_empty() {
            problems.push("Missing route AppName");
        }
        if self.image.is_empty() {
            problems.push("Missing route Image");
        }
        if self.path.is_empty() {
            problems.push("Missing route Path");
        } else if !self.path.starts_with('/') {
            problems.push("Invalid Path format: path must be absolute");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(problems.join("; ")))
        }
    }
}

/// Optional equality predicates for route listings.
#[derive(Debug, Clone, Default)]
pub struct RouteFilter {
    pub path: Option<String>,
    pub app_name: Option<String>,
    pub image: Option<String>,
}

impl RouteFilter {
    pub fn matches(&self, route: &Route) -> bool {
        self.path.as_deref().map_or(true, |path| path == route.path)
            && self
                .app_name
                .as_deref()
                .map_or(true, |app| app == route.app_name)
            && self
                .image
                .as_deref()
                .map_or(true, |image| image == route.image)
    }
}
