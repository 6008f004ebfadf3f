//! Access logging interceptor

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use hyper::body::Body;

use super::{Middleware, Next};
use crate::config::LoggingConfig;
use crate::http::{HttpRequest, HttpResponse};
use crate::logger::{self, AccessLogEntry};

/// Peer address, stored in request extensions by the connection task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub SocketAddr);

type Emit = Arc<dyn Fn(&AccessLogEntry) + Send + Sync>;

/// Writes one access log line per request, never touching the response
pub struct RequestLogger {
    enabled: bool,
    emit: Emit,
}

impl RequestLogger {
    pub fn new(config: &LoggingConfig) -> Self {
        let format = config.access_log_format.clone();
        Self {
            enabled: config.access_log,
            emit: Arc::new(move |entry| logger::log_access(entry, &format)),
        }
    }

    /// Route finished entries somewhere other than the global access log
    pub fn with_emitter(emit: impl Fn(&AccessLogEntry) + Send + Sync + 'static) -> Self {
        Self {
            enabled: true,
            emit: Arc::new(emit),
        }
    }
}

#[async_trait]
impl Middleware for RequestLogger {
    async fn handle(&self, req: HttpRequest, next: Next<'_>) -> HttpResponse {
        if !self.enabled {
            return next.run(req).await;
        }

        let client = req.extensions().get::<ClientAddr>().map(|c| c.0);
        let mut entry = AccessLogEntry::from_request(&req, client);
        let started = Instant::now();

        let resp = next.run(req).await;

        let body_bytes = resp
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default();
        entry.finish(&resp, body_bytes, started.elapsed());
        (self.emit)(&entry);
        resp
    }
}
