//! # App Model
//!
//! An application is a named grouping of routes plus a config map whose
//! entries are injected into every function invocation under that app.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A registered application.
///
/// Apps are created and removed independently of routes; a route's
/// `app_name` must reference an existing or implicitly-created app.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub name: String,

    /// Config entries injected into the environment of every invocation
    /// belonging to this app.
    #[serde(default)]
    pub config: HashMap<String, String>,
}

impl App {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: HashMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Validate the app pre-insert. Rejected apps never reach the datastore.
    pub fn validate(&self) -> ApiResult<()> {
        if self.name.is_empty() {
            return Err(ApiError::validation("Missing app name"));
        }
        Ok(())
    }
}

/// Optional equality predicates for app listings.
#[derive(Debug, Clone, Default)]
pub struct AppFilter {
    pub name: Option<String>,
}

impl AppFilter {
    pub fn matches(&self, app: &App) -> bool {
        self.name.as_deref().map_or(true, |name| name == app.name)
    }
}
