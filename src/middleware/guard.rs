use crate::http::{Request, Response};
use crate::middleware::{Middleware, MiddlewareResult};
use std::sync::Arc;

type Reject = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

/// Lets a request through only while `predicate` holds.
///
/// A rejected request is answered by the reject factory, which defaults to a
/// bare `403 Forbidden`.
pub struct Guard<P> {
    predicate: P,
    reject: Reject,
}

impl<P> Guard<P>
where
    P: Fn(&Request) -> bool + Send + Sync + 'static,
{
    pub fn new(predicate: P) -> Self {
        Self {
            predicate,
            reject: Arc::new(|_: &Request| Response::forbidden()),
        }
    }

    pub fn reject_with<R>(mut self, reject: R) -> Self
    where
        R: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.reject = Arc::new(reject);
        self
    }
}

impl<P> Middleware for Guard<P>
where
    P: Fn(&Request) -> bool + Send + Sync + 'static,
{
    fn evaluate<'a>(&'a self, req: &'a mut Request) -> MiddlewareResult<'a> {
        let req: &Request = req;
        let outcome = if (self.predicate)(req) {
            None
        } else {
            Some((self.reject)(req))
        };
        Box::pin(futures::future::ready(Ok(outcome)))
    }
}
