//! # Data Models
//!
//! Core data layer for the dispatch engine: registered [`App`]s and
//! [`Route`]s, queued [`Task`]s, and the dispatch-boundary [`Request`] view.

pub mod app;
pub mod request;
pub mod route;
pub mod task;

pub use app::{App, AppFilter};
pub use request::Request;
pub use route::{Route, RouteFilter, RouteType};
pub use task::Task;
