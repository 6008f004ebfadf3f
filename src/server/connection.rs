// Connection handling module
// Accepts a TCP connection and serves it with the application pipeline

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::app::App;
use crate::config::Config;
use crate::http::{self, HttpRequest, HttpResponse};
use crate::logger;
use crate::middleware::ClientAddr;

/// Per-connection limits, read once from configuration
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub max_connections: Option<u64>,
    pub keep_alive: bool,
    pub timeout: Duration,
    pub max_body_size: u64,
    pub log_accepts: bool,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config) -> Self {
        let perf = &config.performance;
        Self {
            max_connections: perf.max_connections,
            keep_alive: perf.keep_alive_timeout > 0,
            timeout: Duration::from_secs(perf.read_timeout.max(perf.write_timeout)),
            max_body_size: config.http.max_body_size,
            log_accepts: config.logging.access_log,
        }
    }
}

/// Accept a connection unless the limit is reached, then serve it in its own task
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    app: &Arc<App>,
    settings: ConnectionSettings,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment first, then check, so concurrent accepts cannot overshoot
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = settings.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if settings.log_accepts {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(app),
        settings,
        Arc::clone(conn_counter),
    );
}

fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    app: Arc<App>,
    settings: ConnectionSettings,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(settings.keep_alive);

        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let app = Arc::clone(&app);
                async move {
                    Ok::<_, Infallible>(
                        serve_request(&app, req, peer_addr, settings.max_body_size).await,
                    )
                }
            }),
        );

        match tokio::time::timeout(settings.timeout, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds",
                    settings.timeout.as_secs()
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Collect the body and hand the request to the pipeline
async fn serve_request(
    app: &App,
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    max_body_size: u64,
) -> HttpResponse {
    if let Some(resp) = check_body_size(&req, max_body_size) {
        return resp;
    }

    let (mut parts, body) = req.into_parts();
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_error(&format!(
                "Request body from {peer_addr} exceeded {max_body_size} bytes"
            ));
            return http::build_413_response(max_body_size);
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body from {peer_addr}: {e}"));
            return http::build_error_response(StatusCode::BAD_REQUEST, "unreadable request body");
        }
    };

    parts.extensions.insert(ClientAddr(peer_addr));
    app.handle(HttpRequest::from_parts(parts, bytes)).await
}

/// Reject a declared `Content-Length` above the limit before reading anything
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<HttpResponse> {
    let content_length = req.headers().get(hyper::header::CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response(max_body_size))
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}
