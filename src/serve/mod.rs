//! Development server for previewing the build output.
//!
//! Built on `tiny_http`:
//!
//! - Page routes with index and `.html` fallbacks (see [`resolve`])
//! - A static mount for assets under `serve.static_prefix`
//! - `GET /ping` health check
//! - Graceful shutdown on Ctrl+C
//!
//! # Architecture
//!
//! ```text
//!               ┌──────────────┐
//!               │  tiny_http   │  one listener
//!               └──────┬───────┘
//!          ┌───────────┼───────────┐
//!          ▼           ▼           ▼
//!      worker 0    worker 1 … worker N-1
//!          │           │           │
//!          └──── Router::route ────┘
//!                      │
//!                      ▼
//!              config.build.output
//! ```
//!
//! Routing itself is socket-free: [`Router::route`] maps a method and URL to a
//! [`Reply`], and only [`Router::handle`] touches the connection.

pub mod resolve;

use crate::{config::SiteConfig, debug, log, logger::Logger};
use anyhow::{Context, Result, anyhow};
use resolve::{RequestResolver, Resolution};
use std::{
    fs,
    io::{self, Cursor},
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

const NOT_FOUND_BODY: &str = "404 Not Found";
const METHOD_NOT_ALLOWED_BODY: &str = "405 Method Not Allowed";
const PING_ROUTE: &str = "ping";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

// ============================================================================
// Server Entry Point
// ============================================================================

/// Serve `config.build.output` until Ctrl+C.
///
/// `reload` turns on development mode: every response carries
/// `Cache-Control: no-store`.
pub fn serve_site(config: &SiteConfig, reload: bool, logger: &Logger) -> Result<()> {
    let interface: IpAddr = config.serve.interface.parse()?;
    let (server, addr) = try_bind_port(interface, config.serve.port, MAX_PORT_RETRIES, logger)?;
    let server = Arc::new(server);
    let workers = config.serve.workers.max(1);

    let server_for_signal = Arc::clone(&server);
    let signal_logger = logger.clone();
    ctrlc::set_handler(move || {
        log!(signal_logger, "serve"; "shutting down...");
        // one unblock per worker blocked in recv
        for _ in 0..workers {
            server_for_signal.unblock();
        }
    })
    .context("Failed to set Ctrl+C handler")?;

    let router = Router::new(config, reload, logger.clone());
    log!(logger, "serve"; "http://{addr} -> {}", router.resolver.root().display());
    if reload {
        log!(logger, "serve"; "reload mode, caching disabled");
    }

    thread::scope(|scope| {
        for _ in 0..workers {
            let server = &server;
            let router = &router;
            scope.spawn(move || {
                for request in server.incoming_requests() {
                    if let Err(err) = router.handle(request) {
                        log!(router.logger, "error"; "request failed: {err:#}");
                    }
                }
            });
        }
    });

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(
    interface: IpAddr,
    base_port: u16,
    max_retries: u16,
    logger: &Logger,
) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!(logger, "serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Routing
// ============================================================================

/// Response body, loaded lazily for files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// What to send back for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Body,
}

impl Reply {
    fn file(path: PathBuf) -> Self {
        Self {
            status: 200,
            content_type: guess_content_type(&path),
            body: Body::File(path),
        }
    }

    fn text(status: u16, text: &str) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: Body::Bytes(text.as_bytes().to_vec()),
        }
    }

    fn not_found() -> Self {
        Self::text(404, NOT_FOUND_BODY)
    }
}

/// Maps requests onto the output directory.
#[derive(Debug)]
pub struct Router {
    resolver: RequestResolver,
    /// Static mount without surrounding slashes, e.g. `static`.
    static_prefix: String,
    reload: bool,
    logger: Logger,
}

impl Router {
    pub fn new(config: &SiteConfig, reload: bool, logger: Logger) -> Self {
        Self {
            resolver: RequestResolver::new(&config.build.output),
            static_prefix: config.serve.static_prefix.trim_matches('/').to_owned(),
            reload,
            logger,
        }
    }

    /// Decide the reply for `method` and raw request `url`.
    pub fn route(&self, method: &Method, url: &str) -> Reply {
        if !matches!(method, Method::Get | Method::Head) {
            return Reply::text(405, METHOD_NOT_ALLOWED_BODY);
        }

        // Strip query string before decoding so an encoded `?` stays in the path
        let raw_path = url.split(['?', '#']).next().unwrap_or_default();
        let Ok(decoded) = urlencoding::decode(raw_path) else {
            return Reply::not_found();
        };
        let path = decoded.trim_start_matches('/');

        if let Some(asset) = self.strip_static_prefix(path) {
            return self.reply_for(self.resolver.resolve_asset(asset));
        }

        if path.trim_end_matches('/') == PING_ROUTE {
            let pong = serde_json::json!({ "message": "pong" });
            return Reply {
                status: 200,
                content_type: "application/json",
                body: Body::Bytes(pong.to_string().into_bytes()),
            };
        }

        self.reply_for(self.resolver.resolve_page(path))
    }

    fn strip_static_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.static_prefix.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }

    fn reply_for(&self, resolution: Resolution) -> Reply {
        match resolution {
            Resolution::Served(path) => Reply::file(path),
            Resolution::NotFound => Reply::not_found(),
            Resolution::Rejected => {
                debug!(self.logger, "request"; "rejected");
                Reply::not_found()
            }
        }
    }

    /// Route and answer one request.
    pub fn handle(&self, request: Request) -> Result<()> {
        let reply = self.route(request.method(), request.url());
        debug!(self.logger, "request"; "{} {} -> {}", request.method(), request.url(), reply.status);

        let (status, content_type, data) = load(reply)?;
        request.respond(self.response(status, content_type, data)?)?;
        Ok(())
    }

    fn response(
        &self,
        status: u16,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<Response<Cursor<Vec<u8>>>> {
        let mut headers = vec![header("Content-Type", content_type)?];
        if status == 405 {
            headers.push(header("Allow", "GET, HEAD")?);
        }
        if self.reload {
            headers.push(header("Cache-Control", "no-store")?);
        }
        let len = data.len();
        Ok(Response::new(
            StatusCode(status),
            headers,
            Cursor::new(data),
            Some(len),
            None,
        ))
    }
}

/// Read the reply body into memory.
///
/// A file removed between resolve and read, e.g. by a rebuild, becomes a 404.
fn load(reply: Reply) -> Result<(u16, &'static str, Vec<u8>)> {
    match reply.body {
        Body::Bytes(bytes) => Ok((reply.status, reply.content_type, bytes)),
        Body::File(path) => match fs::read(&path) {
            Ok(bytes) => Ok((reply.status, reply.content_type, bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Ok((404, TEXT_PLAIN, NOT_FOUND_BODY.as_bytes().to_vec()))
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        },
    }
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name, value).map_err(|()| anyhow!("invalid header {name}: {value}"))
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",

        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Tests
// ============================================================================
