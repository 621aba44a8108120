use crate::error::RouteResult;
use serde::Serialize;

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Headers", "*"),
    ("Access-Control-Allow-Methods", "*"),
];

/// The response handed back to the transport.
///
/// The body is fixed at construction, so `Content-Length` always matches it.
/// Every constructor also adds permissive CORS headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>, content_type: &str) -> Response {
        let mut response = Response::build(status, body.into());
        response
            .headers
            .insert(0, ("Content-Type".to_string(), content_type.to_string()));
        response
    }

    /// A bare status with no body and no content type.
    pub fn empty(status: u16) -> Response {
        Response::build(status, Vec::new())
    }

    fn build(status: u16, body: Vec<u8>) -> Response {
        let mut headers = Vec::with_capacity(CORS_HEADERS.len() + 2);
        headers.push(("Content-Length".to_string(), body.len().to_string()));
        headers.extend(
            CORS_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );
        Response {
            status,
            headers,
            body,
        }
    }

    pub fn text<T: Into<String>>(content: T) -> Response {
        Response::new(200, content.into(), "text/plain")
    }

    pub fn html<T: Into<String>>(content: T) -> Response {
        Response::new(200, content.into(), "text/html")
    }

    pub fn json<T: Serialize>(status: u16, value: &T) -> RouteResult<Response> {
        let body = serde_json::to_vec(value)?;
        Ok(Response::new(status, body, "application/json"))
    }

    pub fn ok<T: Serialize>(data: &T) -> RouteResult<Response> {
        Response::json(200, data)
    }

    pub fn created<T: Serialize>(data: &T) -> RouteResult<Response> {
        Response::json(201, data)
    }

    pub fn no_content() -> Response {
        Response::empty(204)
    }

    pub fn forbidden() -> Response {
        Response::empty(403)
    }

    pub fn not_found() -> Response {
        Response::empty(404)
    }

    pub fn redirect(location: &str) -> Response {
        Response::empty(302).header("Location", location)
    }

    /// Appends a header; earlier values with the same name are kept.
    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_value("Content-Type")
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

#[macro_export]
macro_rules! ok_json {
    ($($json:tt)+) => {
        $crate::http::Response::ok(&$crate::json!($($json)+))
    };
}

#[macro_export]
macro_rules! created_json {
    ($($json:tt)+) => {
        $crate::http::Response::created(&$crate::json!($($json)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip_with_length_and_type() {
        let bytes = vec![0u8, 159, 146, 150, 10];
        let response = Response::new(201, bytes.clone(), "application/octet-stream");

        assert_eq!(response.status(), 201);
        assert_eq!(response.body(), bytes.as_slice());
        assert_eq!(response.header_value("content-length"), Some("5"));
        assert_eq!(response.content_type(), Some("application/octet-stream"));
    }

    #[test]
    fn cors_headers_are_always_present() {
        for response in [Response::empty(500), Response::text("hi")] {
            assert_eq!(response.header_value("Access-Control-Allow-Origin"), Some("*"));
            assert_eq!(response.header_value("Access-Control-Allow-Headers"), Some("*"));
            assert_eq!(response.header_value("Access-Control-Allow-Methods"), Some("*"));
        }
    }

    #[test]
    fn empty_has_no_content_type() {
        let response = Response::forbidden();
        assert_eq!(response.status(), 403);
        assert!(response.body().is_empty());
        assert_eq!(response.header_value("Content-Length"), Some("0"));
        assert_eq!(response.content_type(), None);
    }

    #[test]
    fn headers_form_a_multimap() {
        let response = Response::text("x")
            .header("Set-Cookie", "a=1")
            .header("Set-Cookie", "b=2");
        let cookies: Vec<_> = response
            .headers()
            .iter()
            .filter(|(name, _)| name == "Set-Cookie")
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
    }

    #[test]
    fn json_helpers() {
        let response = crate::ok_json!({ "ok": true }).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.body(), br#"{"ok":true}"#);
    }
}
