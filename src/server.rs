//! A minimal HTTP/1.1 transport for a [`Router`].
//!
//! One request per connection: the request head and a `Content-Length` body
//! are read, the router produces a response, and the connection is closed.
//!
//! ```rust,no_run
//! use signpost::{Response, Router, RouteSet, Server, ServerConfig};
//!
//! let mut builder = Router::builder();
//! builder.get("hello/:name", |req| async move {
//!     Ok(Response::text(format!("Hello, {}!", req.param("name")?)))
//! });
//!
//! Server::new(builder.build(), ServerConfig::default())
//!     .listen("127.0.0.1:3000")
//!     .unwrap();
//! ```

use crate::error::{ServerError, ServerResult};
use crate::http::{Method, Request, Response};
use crate::router::Router;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Connections handled at once; further accepts wait for a free slot.
    pub max_connections: usize,
    /// Upper bound for reading the request head, and again for the body.
    pub read_timeout_secs: u64,
    /// Requests with a larger `Content-Length` are refused with 413.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 256,
            read_timeout_secs: 5,
            max_body_bytes: 8 * 1024 * 1024,
        }
    }
}

struct Head {
    method: Method,
    target: String,
    headers: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct Server {
    router: Arc<Router>,
    config: ServerConfig,
}

impl Server {
    pub fn new(router: Router, config: ServerConfig) -> Self {
        Self::shared(Arc::new(router), config)
    }

    pub fn shared(router: Arc<Router>, config: ServerConfig) -> Self {
        Self { router, config }
    }

    /// Binds `addr` and serves on a fresh tokio runtime until the process
    /// ends.
    pub fn listen(self, addr: &str) -> ServerResult<()> {
        let runtime = Runtime::new()?;
        runtime.block_on(async move {
            let listener = TcpListener::bind(addr).await?;
            self.serve(listener).await
        })
    }

    /// Accepts connections from `listener` forever.
    pub async fn serve(self, listener: TcpListener) -> ServerResult<()> {
        let local = listener.local_addr()?;
        info!(addr = %local, "server listening");

        let permits = Arc::new(Semaphore::new(self.config.max_connections.max(1)));
        loop {
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Ok(()),
            };
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(err) = server.handle_connection(stream).await {
                            warn!(%peer, error = %err, "connection error");
                        }
                        drop(permit);
                    });
                }
                Err(err) => error!(error = %err, "accept failed"),
            }
        }
    }

    async fn handle_connection<S>(&self, mut stream: S) -> ServerResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(&mut stream);
        let timeout = Duration::from_secs(self.config.read_timeout_secs);
        let head = match tokio::time::timeout(timeout, read_head(&mut reader)).await {
            Ok(Ok(Some(head))) => head,
            Ok(Ok(None)) => return Ok(()),
            Ok(Err(ServerError::Malformed(reason))) => {
                debug!(%reason, "malformed request");
                drop(reader);
                return write_response(&mut stream, &Response::empty(400)).await;
            }
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(ServerError::Timeout),
        };

        let length = match content_length(&head.headers) {
            Ok(length) => length,
            Err(err) => {
                debug!(error = %err, "malformed request");
                drop(reader);
                return write_response(&mut stream, &Response::empty(400)).await;
            }
        };
        if length > self.config.max_body_bytes {
            drop(reader);
            return write_response(&mut stream, &Response::empty(413)).await;
        }
        let mut body = Vec::new();
        let mut limited = (&mut reader).take(length as u64);
        let read_body = limited.read_to_end(&mut body);
        match tokio::time::timeout(timeout, read_body).await {
            Ok(read) => {
                read?;
            }
            Err(_) => return Err(ServerError::Timeout),
        }
        drop(reader);

        let request = Request::new(head.method, &head.target, head.headers, Some(body));
        let response = self.router.dispatch(request).await;
        write_response(&mut stream, &response).await?;
        self.router.notify_sent(&response);
        Ok(())
    }
}

async fn read_head<R>(reader: &mut R) -> ServerResult<Option<Head>>
where
    R: AsyncBufRead + Unpin,
{
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(None);
    }

    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => (method, target),
        _ => return Err(ServerError::Malformed("invalid request line".to_string())),
    };

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        match line.split_once(':') {
            Some((name, value)) => {
                headers.push((name.trim().to_string(), value.trim().to_string()))
            }
            None => {
                return Err(ServerError::Malformed(format!("invalid header line `{}`", line)));
            }
        }
    }

    Ok(Some(Head {
        method: Method::from_string(method),
        target: target.to_string(),
        headers,
    }))
}

fn content_length(headers: &[(String, String)]) -> ServerResult<usize> {
    match headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
    {
        Some((_, value)) => value
            .parse()
            .map_err(|_| ServerError::Malformed(format!("invalid Content-Length `{}`", value))),
        None => Ok(0),
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}

fn encode_head(response: &Response) -> String {
    let status = response.status();
    let mut head = format!("HTTP/1.1 {} {}\r\n", status, reason_phrase(status));
    for (name, value) in response.headers() {
        head += &format!("{}: {}\r\n", name, value);
    }
    head += &format!("Date: {}\r\n", httpdate::fmt_http_date(SystemTime::now()));
    head += "Connection: close\r\n\r\n";
    head
}

async fn write_response<S>(stream: &mut S, response: &Response) -> ServerResult<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(encode_head(response).as_bytes()).await?;
    stream.write_all(response.body()).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_request_head() {
        let raw = b"POST /items?x=1 HTTP/1.1\r\nHost: local\r\nContent-Length: 3\r\n\r\nabc";
        let mut reader = BufReader::new(&raw[..]);
        let head = read_head(&mut reader).await.unwrap().unwrap();
        assert_eq!(head.method, Method::POST);
        assert_eq!(head.target, "/items?x=1");
        assert_eq!(head.headers[0], ("Host".to_string(), "local".to_string()));
        assert_eq!(content_length(&head.headers).unwrap(), 3);
    }

    #[tokio::test]
    async fn empty_connection_has_no_head() {
        let mut reader = BufReader::new(&b""[..]);
        assert!(read_head(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_garbage_request_line() {
        let mut reader = BufReader::new(&b"HELLO\r\n\r\n"[..]);
        assert!(matches!(
            read_head(&mut reader).await,
            Err(ServerError::Malformed(_))
        ));
    }

    #[test]
    fn bad_content_length_is_malformed() {
        let headers = vec![("content-length".to_string(), "lots".to_string())];
        assert!(matches!(content_length(&headers), Err(ServerError::Malformed(_))));
        assert_eq!(content_length(&[]).unwrap(), 0);
    }

    #[test]
    fn head_carries_status_headers_and_date() {
        let head = encode_head(&Response::text("hi"));
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Length: 2\r\n"));
        assert!(head.contains("Content-Type: text/plain\r\n"));
        assert!(head.contains("\r\nDate: "));
        assert!(head.ends_with("Connection: close\r\n\r\n"));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ServerConfig = serde_json::from_str(r#"{ "max_connections": 4 }"#).unwrap();
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.read_timeout_secs, 5);
    }
}
