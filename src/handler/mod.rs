//! Request handler module
//!
//! Terminal handlers bound in the route table, plus the static fallback that
//! answers every route miss.

pub mod health;
pub mod search;
pub mod static_files;

use async_trait::async_trait;

use crate::http::{HttpRequest, HttpResponse};

pub use health::{build_health_status, HealthHandler};
pub use search::SearchEndpoint;
pub use static_files::StaticFallback;

/// A terminal request handler
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, req: HttpRequest) -> HttpResponse;
}
