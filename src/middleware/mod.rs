mod guard;

pub use guard::Guard;

use crate::error::RouteResult;
use crate::http::{Request, Response};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// `Ok(None)` lets the request continue; `Ok(Some(response))` answers it
/// immediately; an error propagates to the router like a handler error.
pub type MiddlewareResult<'a> = BoxFuture<'a, RouteResult<Option<Response>>>;

pub trait Middleware: Send + Sync + 'static {
    fn evaluate<'a>(&'a self, req: &'a mut Request) -> MiddlewareResult<'a>;
}

/// Middleware backed by a plain synchronous closure. See [`from_fn`].
pub struct FnMiddleware<F> {
    f: F,
}

pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&mut Request) -> RouteResult<Option<Response>> + Send + Sync + 'static,
{
    FnMiddleware { f }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut Request) -> RouteResult<Option<Response>> + Send + Sync + 'static,
{
    fn evaluate<'a>(&'a self, req: &'a mut Request) -> MiddlewareResult<'a> {
        Box::pin(futures::future::ready((self.f)(req)))
    }
}

/// The ordered middleware attached to one route node.
#[derive(Clone, Default)]
pub(crate) struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Runs every middleware in insertion order until one answers.
    pub async fn evaluate(&self, req: &mut Request) -> RouteResult<Option<Response>> {
        for (index, middleware) in self.middlewares.iter().enumerate() {
            if let Some(response) = middleware.evaluate(req).await? {
                debug!(
                    index,
                    status = response.status(),
                    "middleware short-circuited the request"
                );
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}
