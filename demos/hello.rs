//! A minimal server using Signpost
//!
//! Answers `GET /` and `GET /hello/:name`; everything else gets the bundled
//! not-found page.

use signpost::{Response, RouteSet, Router, Server, ServerConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut router = Router::builder();
    router
        .get("", |_req| async { Ok(Response::text("Hello, World!")) })
        .get("hello/:name", |req| async move {
            Ok(Response::text(format!("Hello, {}!", req.param("name")?)))
        });

    Server::new(router.build(), ServerConfig::default())
        .listen("127.0.0.1:3000")
        .expect("Server failed to start");
}
