use crate::error::RouteResult;
use crate::http::Request;
use crate::http::Response;
use futures::future::BoxFuture;
use std::future::Future;

pub type HttpResponse = RouteResult<Response>;

/// The terminal function of a route. Receives the request with its
/// parameters already bound.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: Request) -> BoxFuture<'static, HttpResponse>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    fn handle(&self, req: Request) -> BoxFuture<'static, HttpResponse> {
        Box::pin((self)(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn erase<F, Fut>(handler: F) -> Arc<dyn Handler>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        Arc::new(handler)
    }

    #[tokio::test]
    async fn closures_are_handlers() {
        let handler = erase(|req| async move { Ok(Response::text(req.path().to_string())) });
        let response = handler.handle(Request::get("/echo")).await.unwrap();
        assert_eq!(response.body(), b"/echo");
    }

    #[tokio::test]
    async fn handler_errors_pass_through() {
        let handler = erase(|_req| async { Err(crate::RouteError::bad_request("no")) });
        let err = handler.handle(Request::get("/")).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
