//! # Request Model
//!
//! The dispatch-boundary view of an inbound request. The HTTP binding layer
//! owns the wire format; by the time a request reaches the engine it has
//! been reduced to this shape.

use std::collections::HashMap;

/// An inbound function invocation request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Application the request targets, resolved by the surface layer from
    /// the URL or host.
    pub app_name: String,

    pub method: String,

    /// Absolute request path, matched against route patterns.
    pub path: String,

    pub headers: HashMap<String, String>,

    /// Query parameters in arrival order.
    pub query: Vec<(String, String)>,

    /// Request body for methods that carry one.
    pub body: Option<String>,
}

impl Request {
    pub fn new(
        app_name: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The function payload: the body for POST/PUT, otherwise the `payload`
    /// query parameter.
    pub fn payload(&self) -> Option<String> {
        match self.method.as_str() {
            "POST" | "PUT" => self.body.clone(),
            _ => self
                .query
                .iter()
                .find(|(key, _)| key == "payload")
                .map(|(_, value)| value.clone()),
        }
    }

    /// Reconstructed request URL (path plus query string) for the
    /// invocation environment.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_body_for_post() {
        let req = Request::new("myapp", "POST", "/hello").with_body("{\"name\":\"world\"}");
        assert_eq!(req.payload().as_deref(), Some("{\"name\":\"world\"}"));
    }

    #[test]
    fn test_payload_from_query_for_get() {
        let req = Request::new("myapp", "GET", "/hello").with_query("payload", "world");
        assert_eq!(req.payload().as_deref(), Some("world"));

        let req = Request::new("myapp", "GET", "/hello");
        assert_eq!(req.payload(), None);
    }

    #[test]
    fn test_url_reconstruction() {
        let req = Request::new("myapp", "GET", "/hello");
        assert_eq!(req.url(), "/hello");

        let req = req.with_query("a", "1").with_query("b", "2");
        assert_eq!(req.url(), "/hello?a=1&b=2");
    }
}
