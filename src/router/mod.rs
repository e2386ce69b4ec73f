//! # Route Matcher
//!
//! Trie keyed by path segments, used to resolve a concrete request path to
//! a registered pattern with parameter extraction.
//!
//! Patterns are composed of static segments, `:name` parameter segments
//! (each binding exactly one path segment) and an optional trailing `*name`
//! wildcard binding the remainder. When siblings compete for a segment the
//! most specific edge wins: static > parameter > wildcard.
//!
//! Tries are immutable once built. [`RouterCache`] shares one trie per app
//! read-only across concurrent matches and rebuilds it only when the
//! route set changes, never per request.

use crate::error::{ApiError, ApiResult};
use crate::models::Route;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A single parameter binding extracted during matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

/// Ordered parameter bindings, outermost pattern segment first.
pub type Params = Vec<Param>;

/// Result of a trie lookup. `matched` is false when no registered pattern
/// covers the path; callers treat that as "route not found", not an error.
#[derive(Debug)]
pub struct LookupResult<'a, T> {
    pub handler: Option<&'a T>,
    pub params: Params,
    pub matched: bool,
}

struct ParamEdge<T> {
    name: String,
    node: Node<T>,
}

struct WildcardEdge<T> {
    name: String,
    handler: T,
}

struct Node<T> {
    static_children: HashMap<String, Node<T>>,
    param_child: Option<Box<ParamEdge<T>>>,
    wildcard: Option<WildcardEdge<T>>,
    handler: Option<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            static_children: HashMap::new(),
            param_child: None,
            wildcard: None,
            handler: None,
        }
    }
}

/// Path-segment trie mapping registered patterns to handlers.
pub struct RouteTrie<T> {
    root: Node<T>,
    routes: usize,
}

impl<T> Default for RouteTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTrie<T> {
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            routes: 0,
        }
    }

    /// Number of registered patterns.
    pub fn len(&self) -> usize {
        self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes == 0
    }

    /// Insert a pattern. Fails on non-absolute patterns, empty segments,
    /// conflicting parameter names, non-trailing wildcards, and duplicate
    /// registrations.
    pub fn add_route(&mut self, pattern: &str, handler: T) -> ApiResult<()> {
        if !pattern.starts_with('/') {
            return Err(ApiError::validation(format!(
                "Route pattern must be absolute: {pattern}"
            )));
        }

        let segments: Vec<&str> = if pattern == "/" {
            Vec::new()
        } else {
            pattern[1..].split('/').collect()
        };

        let mut node = &mut self.root;
        for (position, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(ApiError::validation(format!(
                    "Route pattern has an empty segment: {pattern}"
                )));
            }

            if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() {
                    return Err(ApiError::validation(format!(
                        "Route pattern has an unnamed parameter: {pattern}"
                    )));
                }
                let edge = node.param_child.get_or_insert_with(|| {
                    Box::new(ParamEdge {
                        name: name.to_string(),
                        node: Node::default(),
                    })
                });
                if edge.name != name {
                    return Err(ApiError::validation(format!(
                        "Conflicting parameter name in {pattern}: :{name} vs existing :{}",
                        edge.name
                    )));
                }
                node = &mut edge.node;
            } else if let Some(name) = segment.strip_prefix('*') {
                if name.is_empty() {
                    return Err(ApiError::validation(format!(
                        "Route pattern has an unnamed wildcard: {pattern}"
                    )));
                }
                if position != segments.len() - 1 {
                    return Err(ApiError::validation(format!(
                        "Wildcard must be the final segment: {pattern}"
                    )));
                }
                if node.wildcard.is_some() {
                    return Err(ApiError::validation(format!(
                        "A wildcard is already registered at {pattern}"
                    )));
                }
                node.wildcard = Some(WildcardEdge {
                    name: name.to_string(),
                    handler,
                });
                self.routes += 1;
                return Ok(());
            } else {
                node = node
                    .static_children
                    .entry((*segment).to_string())
                    .or_default();
            }
        }

        if node.handler.is_some() {
            return Err(ApiError::validation(format!(
                "A handler is already registered for {pattern}"
            )));
        }
        node.handler = Some(handler);
        self.routes += 1;
        Ok(())
    }

    /// Resolve a concrete path. Non-absolute paths never match.
    pub fn lookup<'a>(&'a self, path: &str) -> LookupResult<'a, T> {
        if !path.starts_with('/') {
            return LookupResult {
                handler: None,
                params: Params::new(),
                matched: false,
            };
        }

        let segments: Vec<&str> = if path == "/" {
            Vec::new()
        } else {
            path[1..].split('/').collect()
        };

        let mut params = Params::new();
        let handler = Self::walk(&self.root, &segments, &mut params);
        LookupResult {
            matched: handler.is_some(),
            handler,
            params,
        }
    }

    fn walk<'a>(node: &'a Node<T>, segments: &[&str], params: &mut Params) -> Option<&'a T> {
        let Some((segment, rest)) = segments.split_first() else {
            return node.handler.as_ref();
        };

        // Most specific edge first, backtracking to less specific siblings.
        if let Some(child) = node.static_children.get(*segment) {
            if let Some(handler) = Self::walk(child, rest, params) {
                return Some(handler);
            }
        }

        if let Some(edge) = &node.param_child {
            let checkpoint = params.len();
            params.push(Param {
                key: edge.name.clone(),
                value: (*segment).to_string(),
            });
            if let Some(handler) = Self::walk(&edge.node, rest, params) {
                return Some(handler);
            }
            params.truncate(checkpoint);
        }

        if let Some(edge) = &node.wildcard {
            params.push(Param {
                key: edge.name.clone(),
                value: segments.join("/"),
            });
            return Some(&edge.handler);
        }

        None
    }
}

/// Shared, versioned tries: one immutable trie per app, rebuilt on
/// invalidation rather than per request.
pub struct RouterCache {
    tries: DashMap<String, Arc<RouteTrie<Route>>>,
}

impl Default for RouterCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterCache {
    pub fn new() -> Self {
        Self {
            tries: DashMap::new(),
        }
    }

    /// The cached trie for an app, if one has been built since the last
    /// invalidation.
    pub fn get(&self, app_name: &str) -> Option<Arc<RouteTrie<Route>>> {
        self.tries.get(app_name).map(|entry| entry.value().clone())
    }

    /// Build and cache a trie from the app's current route set. Stored
    /// routes were validated at insert time; anything unloadable is skipped
    /// rather than poisoning the whole app.
    pub fn rebuild(&self, app_name: &str, routes: &[Route]) -> Arc<RouteTrie<Route>> {
        let mut trie = RouteTrie::new();
        for route in routes {
            if let Err(err) = trie.add_route(&route.path, route.clone()) {
                warn!(
                    app_name = %app_name,
                    path = %route.path,
                    error = %err,
                    "Skipping unloadable route while rebuilding matcher"
                );
            }
        }
        debug!(app_name = %app_name, routes = trie.len(), "Rebuilt route matcher");

        let shared = Arc::new(trie);
        self.tries.insert(app_name.to_string(), Arc::clone(&shared));
        shared
    }

    /// Drop the cached trie for an app. Called by the management layer
    /// after any route change; the next request rebuilds.
    pub fn invalidate(&self, app_name: &str) {
        self.tries.remove(app_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn trie_with(patterns: &[&str]) -> RouteTrie<String> {
        let mut trie = RouteTrie::new();
        for pattern in patterns {
            trie.add_route(pattern, (*pattern).to_string()).unwrap();
        }
        trie
    }

    #[test]
    fn test_static_match() {
        let trie = trie_with(&["/users/all"]);

        let result = trie.lookup("/users/all");
        assert!(result.matched);
        assert_eq!(result.handler.unwrap(), "/users/all");
        assert!(result.params.is_empty());

        assert!(!trie.lookup("/users").matched);
        assert!(!trie.lookup("/users/all/extra").matched);
    }

    #[test]
    fn test_param_binding() {
        let trie = trie_with(&["/users/:id"]);

        let result = trie.lookup("/users/42");
        assert!(result.matched);
        assert_eq!(result.params.len(), 1);
        assert_eq!(result.params[0].key, "id");
        assert_eq!(result.params[0].value, "42");
    }

    #[test]
    fn test_static_beats_param() {
        let trie = trie_with(&["/a/b", "/a/:x"]);

        let result = trie.lookup("/a/b");
        assert_eq!(result.handler.unwrap(), "/a/b");
        assert!(result.params.is_empty());

        let result = trie.lookup("/a/c");
        assert_eq!(result.handler.unwrap(), "/a/:x");
        assert_eq!(result.params[0].value, "c");
    }

    #[test]
    fn test_param_beats_wildcard() {
        let trie = trie_with(&["/a/:x", "/a/*rest"]);

        let result = trie.lookup("/a/b");
        assert_eq!(result.handler.unwrap(), "/a/:x");

        // The wildcard still catches deeper paths the param cannot.
        let result = trie.lookup("/a/b/c");
        assert_eq!(result.handler.unwrap(), "/a/*rest");
        assert_eq!(result.params[0].key, "rest");
        assert_eq!(result.params[0].value, "b/c");
    }

    #[test]
    fn test_backtracks_from_static_to_param() {
        let trie = trie_with(&["/a/b/c", "/a/:x/d"]);

        // "/a/b/d" walks the static "b" edge first, fails at "d", then
        // backtracks to bind :x = "b".
        let result = trie.lookup("/a/b/d");
        assert_eq!(result.handler.unwrap(), "/a/:x/d");
        assert_eq!(result.params[0].value, "b");
    }

    #[test]
    fn test_root_route() {
        let trie = trie_with(&["/"]);
        assert!(trie.lookup("/").matched);
        assert!(!trie.lookup("/a").matched);
    }

    #[test]
    fn test_relative_path_never_matches() {
        let trie = trie_with(&["/users/:id"]);
        assert!(!trie.lookup("users/42").matched);
        assert!(!trie.lookup("").matched);
    }

    #[test]
    fn test_add_route_rejects_bad_patterns() {
        let mut trie: RouteTrie<&str> = RouteTrie::new();
        assert!(trie.add_route("users", "h").is_err());
        assert!(trie.add_route("/a//b", "h").is_err());
        assert!(trie.add_route("/a/:", "h").is_err());
        assert!(trie.add_route("/a/*rest/more", "h").is_err());

        trie.add_route("/a/:id", "h").unwrap();
        assert!(trie.add_route("/a/:other", "h").is_err());
        assert!(trie.add_route("/a/:id", "h").is_err());
    }

    #[test]
    fn test_router_cache_rebuild_and_invalidate() {
        let cache = RouterCache::new();
        assert!(cache.get("myapp").is_none());

        let routes = vec![Route {
            app_name: "myapp".to_string(),
            path: "/hello".to_string(),
            image: "fnserve/hello".to_string(),
            ..Route::default()
        }];
        let trie = cache.rebuild("myapp", &routes);
        assert!(trie.lookup("/hello").matched);
        assert!(cache.get("myapp").is_some());

        cache.invalidate("myapp");
        assert!(cache.get("myapp").is_none());
    }

    prop_compose! {
        fn segment_strategy()(segment in "[a-z][a-z0-9]{0,8}") -> String {
            segment
        }
    }

    proptest! {
        /// Property: a pattern of literal segments matches exactly the path
        /// built from those segments, with no parameter bindings.
        #[test]
        fn static_patterns_match_their_own_path(segments in prop::collection::vec(segment_strategy(), 1..5)) {
            let pattern = format!("/{}", segments.join("/"));
            let trie = trie_with(&[pattern.as_str()]);

            let result = trie.lookup(&pattern);
            prop_assert!(result.matched);
            prop_assert!(result.params.is_empty());
        }

        /// Property: replacing any one segment with a parameter still
        /// matches, binding exactly the replaced literal.
        #[test]
        fn param_binds_exactly_one_segment(
            segments in prop::collection::vec(segment_strategy(), 1..5),
            position in 0usize..5,
        ) {
            let position = position % segments.len();
            let mut pattern_segments = segments.clone();
            pattern_segments[position] = ":p".to_string();
            let pattern = format!("/{}", pattern_segments.join("/"));
            let path = format!("/{}", segments.join("/"));

            let trie = trie_with(&[pattern.as_str()]);
            let result = trie.lookup(&path);
            prop_assert!(result.matched);
            prop_assert_eq!(result.params.len(), 1);
            prop_assert_eq!(result.params[0].key.as_str(), "p");
            prop_assert_eq!(result.params[0].value.as_str(), segments[position].as_str());
        }

        /// Property: a path one segment longer than a static pattern does
        /// not match it.
        #[test]
        fn longer_paths_do_not_match(segments in prop::collection::vec(segment_strategy(), 1..4)) {
            let pattern = format!("/{}", segments.join("/"));
            let trie = trie_with(&[pattern.as_str()]);
            let path = format!("{pattern}/extra");
            prop_assert!(!trie.lookup(&path).matched);
        }
    }
}
