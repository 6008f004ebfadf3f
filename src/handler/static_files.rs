//! Static fallback module
//!
//! Answers every request the route table does not match. The requested path
//! is served from the embedded store when it names a file; anything else gets
//! the single-page-app entry point so client-side routes survive a reload.

use std::sync::Arc;

use async_trait::async_trait;
use hyper::header::IF_NONE_MATCH;

use super::Handler;
use crate::asset::{Asset, AssetStore, FALLBACK_DOCUMENT};
use crate::http::{self, cache, cache::CachePolicy, HttpRequest, HttpResponse};
use crate::logger;

/// Content-Type of the fallback document, whatever path was requested
pub const FALLBACK_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Outcome of resolving a route miss
#[derive(Debug)]
pub enum Resolution<'a> {
    /// The requested path names a file
    Found(&'a Asset),
    /// Unknown path, answered with the fallback document
    Fallback(&'a Asset),
    /// The fallback document itself is missing from the bundle
    NotFound,
}

/// Route-miss handler backed by the embedded asset store
pub struct StaticFallback {
    assets: Arc<AssetStore>,
}

impl StaticFallback {
    pub const fn new(assets: Arc<AssetStore>) -> Self {
        Self { assets }
    }

    /// Resolve a request path against the store
    pub fn resolve(&self, request_path: &str) -> Resolution<'_> {
        let key = lookup_key(request_path);

        if let Some(asset) = self.assets.get(&key) {
            return if key == FALLBACK_DOCUMENT {
                Resolution::Fallback(asset)
            } else {
                Resolution::Found(asset)
            };
        }

        match self.assets.get(FALLBACK_DOCUMENT) {
            Some(index) => Resolution::Fallback(index),
            None => Resolution::NotFound,
        }
    }
}

/// Store key for a request path: one leading `/` removed, percent-decoded,
/// and the root mapped straight to the fallback document
fn lookup_key(request_path: &str) -> String {
    let stripped = request_path.strip_prefix('/').unwrap_or(request_path);
    if stripped.is_empty() {
        return FALLBACK_DOCUMENT.to_string();
    }
    urlencoding::decode(stripped).map_or_else(|_| stripped.to_string(), |s| s.into_owned())
}

#[async_trait]
impl Handler for StaticFallback {
    async fn call(&self, req: HttpRequest) -> HttpResponse {
        let if_none_match = req
            .headers()
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok());

        let (asset, content_type, policy) = match self.resolve(req.uri().path()) {
            Resolution::Found(asset) => (asset, asset.content_type(), CachePolicy::default()),
            Resolution::Fallback(asset) => {
                (asset, Some(FALLBACK_CONTENT_TYPE), CachePolicy::NoCache)
            }
            Resolution::NotFound => {
                logger::log_error(&format!(
                    "Fallback document '{FALLBACK_DOCUMENT}' missing from asset bundle (request: {})",
                    req.uri().path()
                ));
                return http::build_404_response();
            }
        };

        if cache::check_etag_match(if_none_match, asset.etag()) {
            return http::build_304_response(asset.etag(), policy);
        }
        http::build_asset_response(asset.data(), content_type, asset.etag(), policy)
    }
}
