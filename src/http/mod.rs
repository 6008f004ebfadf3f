//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from routing
//! and from the search domain.

pub mod cache;
pub mod mime;
pub mod response;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};

/// Request as seen by the pipeline: the body is already collected
pub type HttpRequest = Request<Bytes>;

/// Response produced by every stage of the pipeline
pub type HttpResponse = Response<Full<Bytes>>;

// Re-export commonly used builders
pub use response::{
    build_204_response, build_304_response, build_404_response, build_413_response,
    build_asset_response, build_error_response, json_response,
};
