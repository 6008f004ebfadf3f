//! Routing module
//!
//! Dispatches a request to the handler bound for its exact (method, path) or,
//! on a miss, to the static fallback. A miss is never an error.

mod table;

use async_trait::async_trait;

use crate::handler::{Handler, StaticFallback};
use crate::http::{HttpRequest, HttpResponse};

pub use table::{RouteTable, RouteTableBuilder};

/// Route table plus the handler for everything it does not match
pub struct Router {
    table: RouteTable,
    fallback: StaticFallback,
}

impl Router {
    pub const fn new(table: RouteTable, fallback: StaticFallback) -> Self {
        Self { table, fallback }
    }

    pub const fn table(&self) -> &RouteTable {
        &self.table
    }
}

#[async_trait]
impl Handler for Router {
    async fn call(&self, req: HttpRequest) -> HttpResponse {
        match self.table.match_route(req.method(), req.uri().path()) {
            Some(handler) => handler.call(req).await,
            None => self.fallback.call(req).await,
        }
    }
}
