//! Groups, guards and middleware
//!
//! This example demonstrates:
//! - A versioned API group with path parameters and catch-alls
//! - Middleware that stores request attributes for handlers
//! - A guarded admin area with a custom rejection
//! - A fallback that replaces the not-found page

use signpost::middleware::{from_fn, Guard};
use signpost::{
    created_json, ok_json, Observer, Request, Response, RouteError, RouteSet, Router, Server,
    ServerConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

// Logs every response after it has been written
struct AccessLog;

impl Observer for AccessLog {
    fn after_send(&self, res: &Response) {
        info!(status = res.status(), "response sent");
    }

    fn on_error(&self, err: &RouteError) {
        info!(error = %err, "request failed");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .init();

    let mut router = Router::builder().observer(AccessLog);

    router.group("api/v1", |api| {
        api.middleware(from_fn(|req: &mut Request| {
            let client = req.header("X-Client").unwrap_or("unknown").to_string();
            req.set_attribute("client", client);
            Ok(None)
        }));

        api.get("users/:id", |req| async move {
            let id = req.param_as_int("id", 10)?;
            let client = req.attribute::<String>("client").cloned().unwrap_or_default();
            ok_json!({ "id": id, "client": client })
        })
        .post("users", |req| async move {
            let user: signpost::Value = req.json()?;
            created_json!({ "created": user })
        })
        .get("search", |req| async move {
            let term = req.query("q")?;
            let page = req.query_as_int_or("page", 10, 1);
            ok_json!({ "term": term, "page": page })
        })
        .get("files/:*", |req| async move {
            Ok(Response::text(format!("file: {}", req.param("*")?)))
        });
    });

    router.group("admin", |admin| {
        admin
            .middleware(
                Guard::new(|req: &Request| req.header("Authorization") == Some("Bearer admin"))
                    .reject_with(|_req: &Request| {
                        Response::new(401, "Authentication required", "text/plain")
                    }),
            )
            .get("stats", |_req| async { ok_json!({ "uptime": "forever" }) });
    });

    router.fallback(|req| async move {
        Err(RouteError::abort(404, format!("nothing at {}", req.path())))
    });

    Server::new(router.build(), ServerConfig::default())
        .listen("127.0.0.1:3000")
        .expect("Server failed to start");
}
