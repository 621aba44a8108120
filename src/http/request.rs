use crate::error::{RouteError, RouteResult};
use std::any::Any;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

#[derive(Eq, Hash, PartialEq, Clone, Debug)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
    Other(String),
}

impl Method {
    pub fn from_string(s: &str) -> Method {
        match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "CONNECT" => Method::CONNECT,
            "OPTIONS" => Method::OPTIONS,
            "TRACE" => Method::TRACE,
            "PATCH" => Method::PATCH,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::CONNECT => "CONNECT",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::PATCH => "PATCH",
            Method::Other(verb) => verb,
        }
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Method::from_string(s))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits a path the way both request paths and route patterns are split:
/// outer slashes are trimmed and blank segments keep their slot.
pub(crate) fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('/').split('/')
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

fn decode_query_part(raw: &str) -> String {
    if raw.contains('+') {
        decode(&raw.replace('+', " "))
    } else {
        decode(raw)
    }
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_query_part(key), decode_query_part(value)),
            None => (decode_query_part(pair), String::new()),
        })
        .collect()
}

fn parse_int(value: &str, radix: u32) -> Result<i64, String> {
    if !(2..=36).contains(&radix) {
        return Err(format!("unsupported radix {}", radix));
    }
    i64::from_str_radix(value, radix).map_err(|e| e.to_string())
}

/// One incoming request, as handed over by the transport.
///
/// Path tokens and the query mapping are fixed at construction. Route
/// parameters are filled in while the router matches, and attributes are
/// free-form scratch space for middleware.
pub struct Request {
    method: Method,
    path: String,
    pub(crate) tokens: Vec<String>,
    query: BTreeMap<String, String>,
    pub(crate) params: HashMap<String, String>,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    attributes: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Request {
    /// Builds a request from the method, the raw `path?query` target, the
    /// headers in arrival order and the body if the transport read one.
    pub fn new(
        method: Method,
        target: &str,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> Request {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, BTreeMap::new()),
        };
        let tokens = split_path(path).map(decode).collect();

        Request {
            method,
            path: path.to_string(),
            tokens,
            query,
            params: HashMap::new(),
            headers,
            body,
            attributes: HashMap::new(),
        }
    }

    /// Shorthand for a header-less, body-less request.
    pub fn get(target: &str) -> Request {
        Request::new(Method::GET, target, Vec::new(), None)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn query(&self, key: &str) -> RouteResult<&str> {
        self.query_optional(key)
            .ok_or_else(|| RouteError::MissingQuery(key.to_string()))
    }

    pub fn query_optional(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn query_or_default<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.query_optional(key).unwrap_or(default)
    }

    pub fn has_query(&self, key: &str) -> bool {
        self.query.contains_key(key)
    }

    pub fn query_as_int(&self, key: &str, radix: u32) -> RouteResult<i64> {
        let value = self
            .query_optional(key)
            .ok_or_else(|| RouteError::invalid_query(key, "missing"))?;
        parse_int(value, radix).map_err(|reason| RouteError::invalid_query(key, reason))
    }

    pub fn query_as_int_or(&self, key: &str, radix: u32, default: i64) -> i64 {
        self.query_as_int(key, radix).unwrap_or(default)
    }

    /// A path parameter bound by the matched route.
    ///
    /// Asking for a name the route never declared is a bug in the handler, so
    /// it surfaces as [`RouteError::UnboundParameter`] rather than a 400.
    pub fn param(&self, key: &str) -> RouteResult<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| RouteError::UnboundParameter(key.to_string()))
    }

    pub fn param_as_int(&self, key: &str, radix: u32) -> RouteResult<i64> {
        let value = self.param(key)?;
        parse_int(value, radix).map_err(|reason| {
            RouteError::bad_request(format!("Invalid path parameter `{}`: {}", key, reason))
        })
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn body_bytes(&self) -> RouteResult<&[u8]> {
        self.body
            .as_deref()
            .ok_or_else(|| RouteError::bad_request("Request has no body"))
    }

    pub fn body_text(&self) -> RouteResult<&str> {
        std::str::from_utf8(self.body_bytes()?)
            .map_err(|_| RouteError::bad_request("Request body is not valid UTF-8"))
    }

    pub fn json<T>(&self) -> RouteResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.body_bytes()?)
            .map_err(|e| RouteError::bad_request(format!("Invalid JSON body: {}", e)))
    }

    pub fn set_attribute<T>(&mut self, key: &str, value: T)
    where
        T: Any + Send + Sync,
    {
        self.attributes.insert(key.to_string(), Box::new(value));
    }

    /// Returns `None` when the key is absent or holds another type.
    pub fn attribute<T: Any>(&self, key: &str) -> Option<&T> {
        self.attributes
            .get(key)
            .and_then(|boxed| boxed.downcast_ref())
    }

    pub fn remove_attribute(&mut self, key: &str) -> bool {
        self.attributes.remove(key).is_some()
    }

    /// Rebuilds `path?query` with every query key and value percent-encoded.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(Vec::len))
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .finish()
    }
}
