//! # Signpost
//!
//! An HTTP request router built around an ordered route tree.
//!
//! ## Features
//!
//! - First-match routing in declaration order
//! - Path parameters (`:id`) and trailing catch-alls (`:*`)
//! - Nested groups that consume a path prefix
//! - Per-node middleware that can answer a request early
//! - Guards, fallbacks and a styled not-found page
//! - Handler errors and panics turned into responses at the router boundary
//!
//! ## Quick Start
//!
//! ```rust
//! use signpost::{ok_json, Request, Response, Router, RouteSet};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut builder = Router::builder();
//! builder
//!     .get("", |_req| async { Ok(Response::text("Welcome")) })
//!     .group("api", |api| {
//!         api.get("users/:id", |req| async move {
//!             let id = req.param_as_int("id", 10)?;
//!             ok_json!({ "id": id })
//!         });
//!     })
//!     .fallback(|_req| async { Ok(Response::empty(404)) });
//!
//! let router = builder.build();
//! let response = router.dispatch(Request::get("/api/users/7")).await;
//! assert_eq!(response.body(), br#"{"id":7}"#);
//! # });
//! ```
//!
//! ## Middleware Usage
//!
//! ```rust
//! use signpost::middleware::Guard;
//! use signpost::{GroupRoute, Request, Response, Router, RouteSet};
//!
//! let mut admin = GroupRoute::new("admin");
//! admin
//!     .middleware(Guard::new(|req: &Request| req.header("Authorization").is_some()))
//!     .get("stats", |_req| async { Ok(Response::text("ok")) });
//!
//! let mut builder = Router::builder();
//! builder.add(admin);
//! let router = builder.build();
//! ```

pub mod assets;
pub mod error;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;
pub extern crate serde_json;

pub use error::{Abort, RouteError, RouteResult, ServerError};
pub use handler::{Handler, HttpResponse};
pub use http::{Method, Request, Response};
pub use router::{
    FallbackRoute, GroupRoute, Observer, PathRoute, Route, RouteSet, Router, RouterBuilder,
    RouterConfig,
};
pub use server::{Server, ServerConfig};

// Reexport serde_json
pub use serde_json::{json, Value};
