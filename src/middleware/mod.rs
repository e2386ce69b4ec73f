//! # Middleware Chain
//!
//! Ordered interceptors applied before route dispatch. Each interceptor is
//! a pure transition over an immutable, layered context; a single driver
//! loop owns chain advancement, so an interceptor can neither skip nor
//! double-advance the chain.
//!
//! An interceptor error aborts the entire chain immediately: no further
//! interceptor runs and no route dispatch occurs.

use crate::error::ApiResult;
use crate::models::{App, Request};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// One immutable binding layer. Frames are never mutated; adding a binding
/// layers a new frame over the existing chain.
struct Frame {
    key: String,
    value: Value,
    parent: Option<Arc<Frame>>,
}

/// Layered key/value environment threaded through the chain, plus the
/// index of the interceptor currently being served.
///
/// Lookups walk from the innermost frame outward, so a later interceptor
/// sees bindings added by earlier ones while ancestor frames stay intact.
#[derive(Clone, Default)]
pub struct MiddlewareContext {
    index: usize,
    frame: Option<Arc<Frame>>,
}

impl MiddlewareContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position in the chain of the interceptor currently being served;
    /// equals the chain length once the chain has fully run.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Layer a new binding visible to this context and everything derived
    /// from it. The receiver is unaffected.
    pub fn with_value(&self, key: impl Into<String>, value: Value) -> Self {
        Self {
            index: self.index,
            frame: Some(Arc::new(Frame {
                key: key.into(),
                value,
                parent: self.frame.clone(),
            })),
        }
    }

    /// Innermost binding for `key`, if any frame carries one.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut current = self.frame.as_deref();
        while let Some(frame) = current {
            if frame.key == key {
                return Some(&frame.value);
            }
            current = frame.parent.as_deref();
        }
        None
    }

    fn at_index(&self, index: usize) -> Self {
        Self {
            index,
            frame: self.frame.clone(),
        }
    }
}

impl fmt::Debug for MiddlewareContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0;
        let mut current = self.frame.as_deref();
        while let Some(frame) = current {
            depth += 1;
            current = frame.parent.as_deref();
        }
        f.debug_struct("MiddlewareContext")
            .field("index", &self.index)
            .field("frames", &depth)
            .finish()
    }
}

/// Outcome of one interceptor: carry the context forward unchanged, or
/// replace it with a derived one.
pub enum Verdict {
    Continue,
    ContinueWith(MiddlewareContext),
}

/// A single interceptor. Returning an error aborts the chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        ctx: &MiddlewareContext,
        req: &Request,
        app: &App,
    ) -> ApiResult<Verdict>;
}

/// The ordered chain plus its driver loop.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    interceptors: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor. Order of addition is order of execution.
    pub fn add(&mut self, middleware: Arc<dyn Middleware>) {
        self.interceptors.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run every interceptor in order. On success the returned context
    /// (index == chain length) is handed to route dispatch; the first
    /// error aborts the chain and is surfaced unchanged.
    pub async fn run(
        &self,
        ctx: MiddlewareContext,
        req: &Request,
        app: &App,
    ) -> ApiResult<MiddlewareContext> {
        let mut ctx = ctx;
        for (index, interceptor) in self.interceptors.iter().enumerate() {
            ctx = ctx.at_index(index);
            debug!(index, app_name = %app.name, "Serving middleware");

            match interceptor.handle(&ctx, req, app).await {
                Ok(Verdict::Continue) => {}
                Ok(Verdict::ContinueWith(next)) => ctx = next,
                Err(err) => {
                    warn!(index, error = %err, "Middleware aborted request");
                    return Err(err);
                }
            }
        }
        Ok(ctx.at_index(self.interceptors.len()))
    }
}
