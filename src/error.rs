use std::fmt;
use std::io;
use thiserror::Error;

/// A deliberate abort carrying the response the router should send.
///
/// Handlers and middleware return this (wrapped in [`RouteError::Abort`]) to
/// stop processing with a specific client-facing status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    pub status: u16,
    pub message: String,
    pub content_type: String,
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

#[derive(Debug, Error)]
pub enum RouteError {
    /// Routing short-circuit, always turned into a response by the router.
    #[error("aborted with {0}")]
    Abort(Abort),

    /// A handler asked for a parameter its own pattern never declared.
    #[error("parameter `{0}` is not bound by the matched route")]
    UnboundParameter(String),

    #[error("query parameter `{0}` is missing")]
    MissingQuery(String),

    #[error("panic: {0}")]
    Panic(String),

    #[error("handler error: {0}")]
    Handler(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl RouteError {
    pub fn abort(status: u16, message: impl Into<String>) -> Self {
        Self::abort_with(status, message, "text/plain")
    }

    pub fn abort_with(
        status: u16,
        message: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        RouteError::Abort(Abort {
            status,
            message: message.into(),
            content_type: content_type.into(),
        })
    }

    /// The 400 client error used for malformed query, parameter and body input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::abort(400, message)
    }

    pub(crate) fn invalid_query(key: &str, reason: impl fmt::Display) -> Self {
        Self::bad_request(format!("Invalid query parameter `{}`: {}", key, reason))
    }

    /// Wraps any error a handler bubbles up; it becomes a bare 500.
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RouteError::Handler(Box::new(err))
    }

    pub fn status_code(&self) -> u16 {
        match self {
            RouteError::Abort(abort) => abort.status,
            RouteError::UnboundParameter(_)
            | RouteError::MissingQuery(_)
            | RouteError::Panic(_)
            | RouteError::Handler(_) => 500,
        }
    }

    /// True for errors that originate from the client rather than the code.
    pub fn is_abort(&self) -> bool {
        matches!(self, RouteError::Abort(_))
    }
}

impl From<serde_json::Error> for RouteError {
    fn from(err: serde_json::Error) -> Self {
        RouteError::Handler(Box::new(err))
    }
}

pub type RouteResult<T> = Result<T, RouteError>;

/// Failures of the bundled transport adapter.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Timed out reading the request")]
    Timeout,
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_is_a_400_abort() {
        let err = RouteError::bad_request("nope");
        assert!(err.is_abort());
        assert_eq!(err.status_code(), 400);
        match err {
            RouteError::Abort(abort) => {
                assert_eq!(abort.message, "nope");
                assert_eq!(abort.content_type, "text/plain");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn developer_errors_stay_distinct() {
        let unbound = RouteError::UnboundParameter("id".into());
        assert!(!unbound.is_abort());
        assert_eq!(unbound.status_code(), 500);
        assert_eq!(
            unbound.to_string(),
            "parameter `id` is not bound by the matched route"
        );
        assert_eq!(RouteError::MissingQuery("q".into()).status_code(), 500);
    }
}
