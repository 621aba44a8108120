use crate::handler::{Handler, HttpResponse};
use crate::http::{Method, Request};
use crate::middleware::{Guard, Middleware, MiddlewareChain};
use crate::router::matcher::{self, Pattern};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::trace;

/// What a node did with a request.
pub enum Dispatch {
    /// The node (or one of its children) matched and produced this result.
    Handled(HttpResponse),
    /// Nothing matched; the request is handed back so siblings can try.
    Declined(Request),
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled(_))
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Handled(Ok(res)) => write!(f, "Handled({})", res.status()),
            Dispatch::Handled(Err(err)) => write!(f, "Handled(Err({}))", err),
            Dispatch::Declined(req) => write!(f, "Declined({})", req.path()),
        }
    }
}

/// A leaf: method + full pattern + handler.
pub struct PathRoute {
    pattern: Pattern,
    method: Option<Method>,
    middlewares: MiddlewareChain,
    handler: Arc<dyn Handler>,
}

impl PathRoute {
    /// `method: None` accepts any verb.
    pub fn new<F, Fut>(pattern: &str, method: Option<Method>, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        Self {
            pattern: Pattern::parse(pattern),
            method,
            middlewares: MiddlewareChain::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.add(middleware);
        self
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn accepts(&self, method: &Method) -> bool {
        self.method.as_ref().map_or(true, |expected| expected == method)
    }

    fn dispatch(&self, offset: usize, mut req: Request) -> BoxFuture<'_, Dispatch> {
        Box::pin(async move {
            if !self.accepts(req.method())
                || !matcher::match_with_catchall(offset, &self.pattern, &mut req)
            {
                return Dispatch::Declined(req);
            }
            trace!(pattern = self.pattern.as_str(), "path route matched");
            match self.middlewares.evaluate(&mut req).await {
                Ok(Some(response)) => return Dispatch::Handled(Ok(response)),
                Err(err) => return Dispatch::Handled(Err(err)),
                Ok(None) => {}
            }
            Dispatch::Handled(self.handler.handle(req).await)
        })
    }
}

/// A prefix shared by an ordered list of child routes.
pub struct GroupRoute {
    pattern: Pattern,
    middlewares: MiddlewareChain,
    children: Vec<Route>,
}

impl GroupRoute {
    pub fn new(pattern: &str) -> Self {
        Self::with_pattern(Pattern::parse(pattern))
    }

    /// A group that consumes no tokens; useful for attaching middleware to a
    /// set of routes without a shared prefix.
    pub fn scope() -> Self {
        Self::with_pattern(Pattern::empty())
    }

    fn with_pattern(pattern: Pattern) -> Self {
        Self {
            pattern,
            middlewares: MiddlewareChain::new(),
            children: Vec::new(),
        }
    }

    pub fn middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middlewares.add(middleware);
        self
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn children(&self) -> &[Route] {
        &self.children
    }

    /// Only the group's own token count is consumed, without catch-all
    /// handling; children match against what is left.
    fn dispatch(&self, offset: usize, mut req: Request) -> BoxFuture<'_, Dispatch> {
        Box::pin(async move {
            let consumed = self.pattern.len();
            if !matcher::match_range(&mut req, offset, &self.pattern, consumed, false) {
                return Dispatch::Declined(req);
            }
            trace!(pattern = self.pattern.as_str(), "group prefix matched");
            match self.middlewares.evaluate(&mut req).await {
                Ok(Some(response)) => return Dispatch::Handled(Ok(response)),
                Err(err) => return Dispatch::Handled(Err(err)),
                Ok(None) => {}
            }
            dispatch_all(&self.children, offset + consumed, req).await
        })
    }
}

/// Matches anything that reaches it.
pub struct FallbackRoute {
    middlewares: MiddlewareChain,
    handler: Arc<dyn Handler>,
}

impl FallbackRoute {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        Self {
            middlewares: MiddlewareChain::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.add(middleware);
        self
    }

    fn dispatch(&self, mut req: Request) -> BoxFuture<'_, Dispatch> {
        Box::pin(async move {
            match self.middlewares.evaluate(&mut req).await {
                Ok(Some(response)) => return Dispatch::Handled(Ok(response)),
                Err(err) => return Dispatch::Handled(Err(err)),
                Ok(None) => {}
            }
            Dispatch::Handled(self.handler.handle(req).await)
        })
    }
}

pub enum Route {
    Path(PathRoute),
    Group(GroupRoute),
    Fallback(FallbackRoute),
}

impl Route {
    pub fn dispatch(&self, offset: usize, req: Request) -> BoxFuture<'_, Dispatch> {
        match self {
            Route::Path(route) => route.dispatch(offset, req),
            Route::Group(group) => group.dispatch(offset, req),
            Route::Fallback(fallback) => fallback.dispatch(req),
        }
    }
}

impl From<PathRoute> for Route {
    fn from(route: PathRoute) -> Self {
        Route::Path(route)
    }
}

impl From<GroupRoute> for Route {
    fn from(group: GroupRoute) -> Self {
        Route::Group(group)
    }
}

impl From<FallbackRoute> for Route {
    fn from(fallback: FallbackRoute) -> Self {
        Route::Fallback(fallback)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Path(route) => f
                .debug_struct("Path")
                .field("pattern", &route.pattern.as_str())
                .field("method", &route.method)
                .field("middlewares", &route.middlewares.len())
                .finish(),
            Route::Group(group) => f
                .debug_struct("Group")
                .field("pattern", &group.pattern.as_str())
                .field("middlewares", &group.middlewares.len())
                .field("children", &group.children)
                .finish(),
            Route::Fallback(fallback) => f
                .debug_struct("Fallback")
                .field("middlewares", &fallback.middlewares.len())
                .finish(),
        }
    }
}

/// Offers `req` to each route in order; the first to handle it wins.
pub fn dispatch_all(routes: &[Route], offset: usize, req: Request) -> BoxFuture<'_, Dispatch> {
    Box::pin(async move {
        let mut req = req;
        for route in routes {
            match route.dispatch(offset, req).await {
                Dispatch::Declined(returned) => req = returned,
                handled => return handled,
            }
        }
        Dispatch::Declined(req)
    })
}

/// Route registration shared by the router builder and groups. Declaration
/// order is match priority.
pub trait RouteSet: Sized {
    fn push(&mut self, route: Route);

    fn add(&mut self, route: impl Into<Route>) -> &mut Self {
        self.push(route.into());
        self
    }

    fn route<F, Fut>(&mut self, pattern: &str, method: Option<Method>, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        self.add(PathRoute::new(pattern, method, handler))
    }

    fn get<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        self.route(pattern, Some(Method::GET), handler)
    }

    fn post<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        self.route(pattern, Some(Method::POST), handler)
    }

    fn put<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        self.route(pattern, Some(Method::PUT), handler)
    }

    fn patch<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        self.route(pattern, Some(Method::PATCH), handler)
    }

    fn delete<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        self.route(pattern, Some(Method::DELETE), handler)
    }

    /// Any method, any remaining path; the remainder is bound to `*`.
    fn everything<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        self.route(":*", None, handler)
    }

    /// Unconditional; no pattern is matched and nothing is bound.
    fn fallback<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        self.add(FallbackRoute::new(handler))
    }

    fn group<B>(&mut self, pattern: &str, build: B) -> &mut Self
    where
        B: FnOnce(&mut GroupRoute),
    {
        let mut group = GroupRoute::new(pattern);
        build(&mut group);
        self.add(group)
    }

    /// A prefix-less group carrying a [`Guard`] on `predicate`.
    ///
    /// The scope consumes no tokens, so it matches every request that reaches
    /// it. While `predicate` fails, any path is answered with a bare 403 and
    /// routes declared after the scope are never tried. Declare public routes
    /// before it.
    fn guarded<P, B>(&mut self, predicate: P, build: B) -> &mut Self
    where
        P: Fn(&Request) -> bool + Send + Sync + 'static,
        B: FnOnce(&mut GroupRoute),
    {
        let mut group = GroupRoute::scope();
        group.middleware(Guard::new(predicate));
        build(&mut group);
        self.add(group)
    }
}

impl RouteSet for GroupRoute {
    fn push(&mut self, route: Route) {
        self.children.push(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Response;
    use crate::middleware::from_fn;

    async fn run(routes: &[Route], req: Request) -> Dispatch {
        dispatch_all(routes, 0, req).await
    }

    fn body(dispatch: Dispatch) -> String {
        match dispatch {
            Dispatch::Handled(Ok(response)) => String::from_utf8(response.into_body()).unwrap(),
            other => panic!("expected a response, got {:?}", other),
        }
    }

    fn text(body: &'static str) -> impl Fn(Request) -> futures::future::Ready<HttpResponse> {
        move |_req| futures::future::ready(Ok(Response::text(body)))
    }

    #[tokio::test]
    async fn method_gating() {
        let routes: Vec<Route> = vec![PathRoute::new("a", Some(Method::GET), text("get")).into()];
        let post = Request::new(Method::POST, "/a", Vec::new(), None);
        assert!(!run(&routes, post).await.is_handled());

        let any: Vec<Route> = vec![PathRoute::new("a", None, text("any")).into()];
        let post = Request::new(Method::POST, "/a", Vec::new(), None);
        assert_eq!(body(run(&any, post).await), "any");
    }

    #[tokio::test]
    async fn group_consumes_prefix() {
        let mut api = GroupRoute::new("api");
        api.get("users", text("users"));
        let routes = vec![Route::from(api)];

        assert_eq!(body(run(&routes, Request::get("/api/users")).await), "users");
        assert!(!run(&routes, Request::get("/users")).await.is_handled());
        assert!(!run(&routes, Request::get("/api")).await.is_handled());
    }

    #[tokio::test]
    async fn declined_group_lets_siblings_try() {
        let mut api = GroupRoute::new("api");
        api.get("users", text("users"));
        let mut routes = vec![Route::from(api)];
        routes.push(PathRoute::new("api/:other", None, text("sibling")).into());

        let dispatch = run(&routes, Request::get("/api/teams")).await;
        assert_eq!(body(dispatch), "sibling");
    }

    #[tokio::test]
    async fn group_middleware_runs_before_children_match() {
        let mut admin = GroupRoute::new("admin");
        admin.middleware(from_fn(|_req: &mut Request| Ok(Some(Response::empty(401)))));
        admin.get("panel", text("panel"));
        let routes = vec![Route::from(admin)];

        match run(&routes, Request::get("/admin/unknown")).await {
            Dispatch::Handled(Ok(response)) => assert_eq!(response.status(), 401),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn path_middleware_only_runs_after_a_match() {
        let routes: Vec<Route> = vec![
            PathRoute::new("a", None, text("a"))
                .middleware(from_fn(|_req: &mut Request| Ok(Some(Response::empty(403)))))
                .into(),
            PathRoute::new("b", None, text("b")).into(),
        ];
        assert_eq!(body(run(&routes, Request::get("/b")).await), "b");
    }

    #[tokio::test]
    async fn fallback_matches_anything() {
        let routes: Vec<Route> = vec![FallbackRoute::new(text("fallback")).into()];
        let req = Request::new(Method::DELETE, "/deep/er/path", Vec::new(), None);
        assert_eq!(body(run(&routes, req).await), "fallback");
    }

    #[tokio::test]
    async fn guarded_scope_consumes_nothing() {
        let mut routes = GroupRoute::scope();
        routes.guarded(|req: &Request| req.query_optional("key") == Some("s3cret"), |g| {
            g.get("vault", text("vault"));
        });
        let routes = vec![Route::from(routes)];

        assert_eq!(body(run(&routes, Request::get("/vault?key=s3cret")).await), "vault");
        match run(&routes, Request::get("/vault")).await {
            Dispatch::Handled(Ok(response)) => {
                assert_eq!(response.status(), 403);
                assert!(response.body().is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn nested_groups_namespace_params() {
        let mut orgs = GroupRoute::new("orgs/:org");
        orgs.group("teams/:team", |teams| {
            teams.get("members/:member", |req: Request| async move {
                Ok(Response::text(format!(
                    "{}/{}/{}",
                    req.param("org")?,
                    req.param("team")?,
                    req.param("member")?
                )))
            });
        });
        let routes = vec![Route::from(orgs)];

        let dispatch = run(&routes, Request::get("/orgs/acme/teams/core/members/ada")).await;
        assert_eq!(body(dispatch), "acme/core/ada");
    }

    #[test]
    fn debug_lists_the_tree() {
        let mut api = GroupRoute::new("api");
        api.get("users", text("users")).everything(text("rest"));
        let rendered = format!("{:?}", Route::from(api));
        assert!(rendered.contains("\"api\""));
        assert!(rendered.contains("\"users\""));
        assert!(rendered.contains("\":*\""));
    }
}
