//! Ordered, first-match routing.
//!
//! ```text
//! Request
//!     → Router::dispatch (top-level routes, offset 0)
//!     → Route::dispatch (method + pattern, middleware, children)
//!     → first handled result wins
//!     → errors and panics translated to responses
//!     → Response
//! ```
//!
//! The route tree is built once through [`RouterBuilder`] and never changes
//! afterwards, so a `Router` can be shared between tasks behind an `Arc`.

pub mod matcher;
mod observer;
pub mod route;

pub use observer::Observer;
pub use route::{Dispatch, FallbackRoute, GroupRoute, PathRoute, Route, RouteSet};

use crate::assets::{self, Assets, NOT_FOUND_PAGE};
use crate::error::RouteError;
use crate::http::{Request, Response};
use futures::FutureExt;
use serde::Deserialize;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Answer unmatched requests with the styled page instead of an empty 404.
    pub not_found_page: bool,
    /// Asset name of that page, looked up at the empty root.
    pub not_found_asset: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            not_found_page: true,
            not_found_asset: NOT_FOUND_PAGE.to_string(),
        }
    }
}

pub struct Router {
    routes: Vec<Route>,
    config: RouterConfig,
    assets: Assets,
    observer: Option<Arc<dyn Observer>>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Routes `req` and always produces a response.
    ///
    /// Aborts become their own status and message. Any other error, and any
    /// panic raised by a handler or middleware, is reported to the observer
    /// and becomes a bare 500. Observer panics are logged and swallowed.
    pub async fn dispatch(&self, req: Request) -> Response {
        let method = req.method().clone();
        let path = req.path().to_string();
        self.notify("on_request", |observer| observer.on_request(&req));

        let outcome = AssertUnwindSafe(route::dispatch_all(&self.routes, 0, req))
            .catch_unwind()
            .await;
        let response = match outcome {
            Ok(Dispatch::Handled(Ok(response))) => response,
            Ok(Dispatch::Handled(Err(err))) => self.recover(err),
            Ok(Dispatch::Declined(_)) => self.not_found(),
            Err(panic) => self.recover(RouteError::Panic(panic_message(panic))),
        };

        debug!(%method, %path, status = response.status(), "request dispatched");
        self.notify("before_send", |observer| observer.before_send(&response));
        response
    }

    /// For the transport to call once `res` has been written.
    pub fn notify_sent(&self, res: &Response) {
        self.notify("after_send", |observer| observer.after_send(res));
    }

    fn recover(&self, err: RouteError) -> Response {
        match err {
            RouteError::Abort(abort) => {
                debug!(status = abort.status, message = %abort.message, "request aborted");
                Response::new(abort.status, abort.message, &abort.content_type)
            }
            err => {
                match &err {
                    RouteError::Panic(_) => error!(error = %err, "handler panicked"),
                    _ => warn!(error = %err, "request failed"),
                }
                self.notify("on_error", |observer| observer.on_error(&err));
                Response::empty(500)
            }
        }
    }

    /// Runs one observer hook; a panicking observer is logged and ignored.
    fn notify<F>(&self, hook: &'static str, call: F)
    where
        F: FnOnce(&dyn Observer),
    {
        if let Some(observer) = &self.observer {
            let observer: &dyn Observer = observer.as_ref();
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| call(observer))) {
                error!(hook, panic = %panic_message(panic), "observer panicked");
            }
        }
    }

    fn not_found(&self) -> Response {
        if self.config.not_found_page {
            let name = &self.config.not_found_asset;
            if let Some(page) = self.assets.get("", name) {
                return Response::new(404, page.to_vec(), assets::content_type(name));
            }
            warn!(asset = %name, "not-found page is missing from the asset store");
        }
        Response::not_found()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Collects top-level routes and settings, then freezes them into a
/// [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
    config: RouterConfig,
    assets: Option<Assets>,
    observer: Option<Arc<dyn Observer>>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the bundled asset store used for the not-found page.
    pub fn assets(mut self, assets: Assets) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn observer(mut self, observer: impl Observer) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn build(self) -> Router {
        debug!(routes = self.routes.len(), "router built");
        Router {
            routes: self.routes,
            config: self.config,
            assets: self.assets.unwrap_or_else(Assets::bundled),
            observer: self.observer,
        }
    }
}

impl RouteSet for RouterBuilder {
    fn push(&mut self, route: Route) {
        self.routes.push(route);
    }
}
