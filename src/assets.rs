//! In-memory static resources.
//!
//! Files are registered under a root and a name and served with a content
//! type picked from the extension. The store ships the router's styled
//! not-found page.

use crate::http::Response;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::debug;

/// Name of the bundled not-found page, stored at the empty root.
pub const NOT_FOUND_PAGE: &str = "404.html";

static NOT_FOUND_HTML: &[u8] = include_bytes!("../assets/404.html");

fn key(root: &str, name: &str) -> String {
    let root = root.trim_matches('/');
    let name = name.trim_matches('/');
    match (root.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => root.to_string(),
        (false, false) => format!("{}/{}", root, name),
    }
}

pub fn content_type(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("html") => "text/html",
        _ => "text/plain",
    }
}

#[derive(Debug, Clone, Default)]
pub struct Assets {
    files: HashMap<String, Cow<'static, [u8]>>,
    fallback: Option<(String, String)>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding only the bundled pages.
    pub fn bundled() -> Self {
        let mut assets = Self::new();
        assets.insert("", NOT_FOUND_PAGE, NOT_FOUND_HTML);
        assets
    }

    pub fn insert(
        &mut self,
        root: &str,
        name: &str,
        contents: impl Into<Cow<'static, [u8]>>,
    ) -> &mut Self {
        self.files.insert(key(root, name), contents.into());
        self
    }

    /// The file served when a lookup misses.
    pub fn with_fallback(mut self, root: &str, name: &str) -> Self {
        self.fallback = Some((root.to_string(), name.to_string()));
        self
    }

    pub fn get(&self, root: &str, name: &str) -> Option<&[u8]> {
        self.files.get(&key(root, name)).map(|contents| contents.as_ref())
    }

    /// Serves `root/name`, then the fallback, then a bare 404.
    pub fn serve(&self, root: &str, name: &str) -> Response {
        if let Some(contents) = self.get(root, name) {
            return Response::new(200, contents.to_vec(), content_type(name));
        }
        debug!(root, name, "asset not found");

        if let Some((fallback_root, fallback_name)) = &self.fallback {
            if let Some(contents) = self.get(fallback_root, fallback_name) {
                return Response::new(200, contents.to_vec(), content_type(fallback_name));
            }
            debug!(
                root = fallback_root.as_str(),
                name = fallback_name.as_str(),
                "fallback asset not found"
            );
        }
        Response::not_found()
    }
}
