//! Middleware chain
//!
//! An ordered list of interceptors wrapped around a terminal [`Handler`].
//! Each interceptor gets the request plus a [`Next`] cursor; it may answer on
//! its own or call `next.run(req)` and post-process the response.

mod compression;
mod cors;
mod logging;

use std::sync::Arc;

use async_trait::async_trait;

use crate::handler::Handler;
use crate::http::{HttpRequest, HttpResponse};

pub use compression::Compression;
pub use cors::Cors;
pub use logging::{ClientAddr, RequestLogger};

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: HttpRequest, next: Next<'_>) -> HttpResponse;
}

/// The remainder of the chain below the current interceptor
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Handler,
}

impl Next<'_> {
    pub async fn run(self, req: HttpRequest) -> HttpResponse {
        match self.rest.split_first() {
            Some((current, rest)) => {
                current
                    .handle(
                        req,
                        Next {
                            rest,
                            endpoint: self.endpoint,
                        },
                    )
                    .await
            }
            None => self.endpoint.call(req).await,
        }
    }
}

/// Interceptors in application order, fixed at construction
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor; it runs after every one added before it
    #[must_use]
    pub fn with(mut self, layer: impl Middleware + 'static) -> Self {
        self.layers.push(Arc::new(layer));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Run `req` through every interceptor, then `endpoint`
    pub async fn run(&self, req: HttpRequest, endpoint: &dyn Handler) -> HttpResponse {
        Next {
            rest: &self.layers,
            endpoint,
        }
        .run(req)
        .await
    }
}
