//! HTTP boundary of the search aggregation service.
//!
//! Requests pass through CORS, access logging and gzip compression before an
//! exact (method, path) route table. `/api/search` and `/api/health` are the
//! only bound routes; every other request is answered from the embedded
//! single-page front end.

pub mod app;
pub mod asset;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod middleware;
pub mod routing;
pub mod search;
pub mod server;

pub use app::App;
pub use error::GatewayError;
