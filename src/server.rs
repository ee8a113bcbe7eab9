//! A small HTTP/1.1 host for running a router locally.
//!
//! In production the gateway turns HTTP traffic into [`ApiRequest`] events
//! and calls [`Router::handle`]. This module plays that part on a developer
//! machine: one request per connection, query string and headers parsed into
//! the event, binary bodies base64-encoded. Path parameters are not resolved
//! here since only the gateway knows the resource template.
//!
//! ```rust,no_run
//! use waypoint::{Server, ServerConfig};
//!
//! let mut router = waypoint::rest();
//! router.get("/", |c| c.text(200, "hello"));
//!
//! Server::new(router)
//!     .config(ServerConfig::default().max_connections(64))
//!     .listen("127.0.0.1:3000")
//!     .unwrap();
//! ```

use crate::context::Context;
use crate::http::{ApiRequest, ApiResponse};
use crate::router::Router;
use base64::Engine;
use serde_json::json;
use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_connections: usize,
    /// Limit on the request line plus all header lines, in bytes.
    pub max_header_size: usize,
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 256,
            max_header_size: 8 * 1024,
            max_body_size: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn max_header_size(mut self, max_header_size: usize) -> Self {
        self.max_header_size = max_header_size;
        self
    }

    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }
}

pub struct Server<C> {
    config: ServerConfig,
    router: Arc<Router<C>>,
}

impl<C> Clone for Server<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            router: Arc::clone(&self.router),
        }
    }
}

impl<C: Context + 'static> Server<C> {
    pub fn new(router: Router<C>) -> Self {
        Self {
            config: ServerConfig::default(),
            router: Arc::new(router),
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds `addr` and serves until the process exits.
    pub fn listen(self, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
        let runtime = Runtime::new()?;
        runtime.block_on(async {
            let listener = TcpListener::bind(addr).await?;
            info!(addr, "listening");
            self.serve(listener).await?;
            Ok::<(), Box<dyn std::error::Error>>(())
        })
    }

    pub async fn serve(self, listener: TcpListener) -> Result<(), Error> {
        let permits = Arc::new(Semaphore::new(self.config.max_connections));

        loop {
            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .map_err(|e| Error::new(ErrorKind::Other, e))?;

            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted connection");
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, Some(peer)).await {
                            warn!(%peer, error = %e, "connection error");
                        }
                        drop(permit);
                    });
                }
                Err(e) => error!(error = %e, "accept failed"),
            }
        }
    }

    pub(crate) async fn handle_connection<S>(&self, mut stream: S, peer: Option<SocketAddr>) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf_reader = BufReader::new(&mut stream);
        let Some((request_line, headers)) =
            read_head(&mut buf_reader, self.config.max_header_size).await?
        else {
            drop(buf_reader);
            warn!(?peer, "request head too large");
            let mut response = ApiResponse::new(431);
            response.body("request header too large");
            return write_response(&mut stream, &response).await;
        };

        if request_line.is_empty() {
            return Ok(());
        }

        let mut parts = request_line.split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "Invalid request line"))?
            .to_string();
        let full_path = parts
            .next()
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "Invalid request line"))?;

        let (raw_path, raw_query) = full_path.split_once('?').unwrap_or((full_path, ""));
        let path = urlencoding::decode(raw_path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| raw_path.to_string());
        let query = parse_query(raw_query);

        let content_length = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.parse::<usize>().ok())
            .unwrap_or(0);

        let response = if content_length > self.config.max_body_size {
            let mut response = ApiResponse::new(413);
            response.body("request body too large");
            response
        } else {
            let mut body = Vec::with_capacity(content_length);
            let mut take = buf_reader.take(content_length as u64);
            take.read_to_end(&mut body).await?;

            let (body, is_base64_encoded) = match String::from_utf8(body) {
                Ok(text) => (text, false),
                Err(e) => (
                    base64::engine::general_purpose::STANDARD.encode(e.into_bytes()),
                    true,
                ),
            };

            let source_ip = peer.map(|p| p.ip().to_string());
            let request = ApiRequest {
                http_method: method,
                path,
                headers,
                query_string_parameters: query,
                body,
                is_base64_encoded,
                request_context: json!({
                    "stage": "local",
                    "identity": { "sourceIp": source_ip }
                }),
                ..ApiRequest::default()
            };
            self.dispatch(request).await
        };

        write_response(&mut stream, &response).await
    }

    async fn dispatch(&self, request: ApiRequest) -> ApiResponse {
        let router = Arc::clone(&self.router);
        // The router lets handler panics through; the host turns them into a 500.
        match tokio::task::spawn_blocking(move || router.handle(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(miss)) => miss.into_response(),
            Err(err) => {
                let message = if err.is_panic() {
                    let panic = err.into_panic();
                    if let Some(msg) = panic.downcast_ref::<&str>() {
                        msg.to_string()
                    } else if let Some(msg) = panic.downcast_ref::<String>() {
                        msg.clone()
                    } else {
                        "Unknown panic".to_string()
                    }
                } else {
                    err.to_string()
                };
                error!(error = %message, "handler failed");
                let mut response = ApiResponse::new(500);
                response.body(format!("Internal error: {}", message));
                response
            }
        }
    }
}

// Reads the request line and headers within `limit` bytes. `None` when the
// head does not fit.
async fn read_head<R>(
    reader: &mut R,
    limit: usize,
) -> Result<Option<(String, HashMap<String, String>)>, Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = limit;
    let Some(request_line) = read_head_line(reader, &mut budget).await? else {
        return Ok(None);
    };

    let mut headers = HashMap::new();
    if request_line.is_empty() {
        return Ok(Some((request_line, headers)));
    }
    loop {
        let Some(line) = read_head_line(reader, &mut budget).await? else {
            return Ok(None);
        };
        if line.trim().is_empty() {
            break;
        }
        if let Some((key, value)) = line.trim().split_once(':') {
            headers.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(Some((request_line, headers)))
}

async fn read_head_line<R>(reader: &mut R, budget: &mut usize) -> Result<Option<String>, Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = (&mut *reader).take(*budget as u64).read_line(&mut line).await?;
    *budget -= read;
    if *budget == 0 && !line.ends_with('\n') {
        return Ok(None);
    }
    Ok(Some(line))
}

async fn write_response<S>(stream: &mut S, response: &ApiResponse) -> Result<(), Error>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&encode_response(response)).await?;
    stream.flush().await
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw,
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
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
        431 => "Request Header Fields Too Large",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

fn encode_response(response: &ApiResponse) -> Vec<u8> {
    let (status, body) = match response.decoded_body() {
        Ok(body) => (response.status_code, body),
        Err(e) => (500, format!("Invalid base64 body: {}", e).into_bytes()),
    };

    let mut head = format!("HTTP/1.1 {} {}\r\n", status, reason_phrase(status));
    for (name, value) in &response.headers {
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        head += &format!("{}: {}\r\n", name, value);
    }
    if !response.headers.keys().any(|k| k.eq_ignore_ascii_case("date")) {
        head += &format!("Date: {}\r\n", httpdate::fmt_http_date(SystemTime::now()));
    }
    head += &format!("Content-Length: {}\r\nConnection: close\r\n\r\n", body.len());

    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(&body);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RestRouter;
    use tokio::io::duplex;

    fn router() -> RestRouter {
        let mut router = RestRouter::new();
        router.get("/hello", |c| {
            let name = c.query("name").unwrap_or("world").to_string();
            c.text(200, format!("hello {}", name));
        });
        router.post("/echo", |c| {
            let body = c.body_bytes().unwrap_or_default();
            c.binary(201, "application/octet-stream", &body);
        });
        router.get("/boom", |_| panic!("kaboom"));
        router
    }

    async fn roundtrip(server: &Server<crate::RestContext>, raw: &[u8]) -> String {
        let (mut client, server_io) = duplex(64 * 1024);
        client.write_all(raw).await.unwrap();
        server.handle_connection(server_io, None).await.unwrap();

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn parses_query_pairs() {
        let query = parse_query("name=jott&greeting=moin+moin&flag&x=%2Fy");
        assert_eq!(query["name"], "jott");
        assert_eq!(query["greeting"], "moin moin");
        assert_eq!(query["flag"], "");
        assert_eq!(query["x"], "/y");
    }

    #[tokio::test]
    async fn serves_a_matched_route() {
        let server = Server::new(router());
        let out = roundtrip(&server, b"GET /hello?name=jott HTTP/1.1\r\nHost: local\r\n\r\n").await;

        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"), "{}", out);
        assert!(out.contains("Content-Length: 10\r\n"));
        assert!(out.contains("Date: "));
        assert!(out.ends_with("\r\n\r\nhello jott"));
    }

    #[tokio::test]
    async fn unmatched_route_is_404() {
        let server = Server::new(router());
        let out = roundtrip(&server, b"GET /nope HTTP/1.1\r\n\r\n").await;

        assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"), "{}", out);
        assert!(out.ends_with("route not found: GET /nope"));
    }

    #[tokio::test]
    async fn binary_body_roundtrips() {
        let server = Server::new(router());
        let mut raw = b"POST /echo HTTP/1.1\r\nContent-Length: 3\r\n\r\n".to_vec();
        raw.extend_from_slice(&[0xff, 0x00, 0x10]);

        let (mut client, server_io) = duplex(64 * 1024);
        client.write_all(&raw).await.unwrap();
        server.handle_connection(server_io, None).await.unwrap();
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();

        assert!(out.starts_with(b"HTTP/1.1 201 Created\r\n"));
        assert!(out.ends_with(&[b'\n', 0xff, 0x00, 0x10]));
    }

    #[tokio::test]
    async fn handler_panic_becomes_500() {
        let server = Server::new(router());
        let out = roundtrip(&server, b"GET /boom HTTP/1.1\r\n\r\n").await;

        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{}", out);
        assert!(out.ends_with("Internal error: kaboom"));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let server = Server::new(router()).config(ServerConfig::default().max_body_size(2));
        let out = roundtrip(&server, b"POST /echo HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc").await;

        assert!(out.starts_with("HTTP/1.1 413 Payload Too Large\r\n"), "{}", out);
    }

    #[tokio::test]
    async fn oversized_head_is_rejected() {
        let server = Server::new(router()).config(ServerConfig::default().max_header_size(64));
        let raw = format!("GET /hello HTTP/1.1\r\nX-Padding: {}\r\n\r\n", "a".repeat(100));
        let out = roundtrip(&server, raw.as_bytes()).await;

        assert!(out.starts_with("HTTP/1.1 431 Request Header Fields Too Large\r\n"), "{}", out);
        assert!(out.ends_with("request header too large"));
    }

    #[tokio::test]
    async fn head_within_limit_is_served() {
        let raw = b"GET /hello HTTP/1.1\r\nHost: local\r\n\r\n";
        let server =
            Server::new(router()).config(ServerConfig::default().max_header_size(raw.len()));
        let out = roundtrip(&server, raw).await;

        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"), "{}", out);
    }
}
