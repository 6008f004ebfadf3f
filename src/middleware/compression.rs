//! gzip response compression

use std::io::Write;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG,
    VARY,
};
use hyper::{Method, StatusCode};

use super::{Middleware, Next};
use crate::config::CompressionConfig;
use crate::http::{mime, HttpRequest, HttpResponse};
use crate::logger;

pub struct Compression {
    config: CompressionConfig,
}

impl Compression {
    pub const fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    fn eligible(&self, resp: &HttpResponse) -> bool {
        let status = resp.status();
        if status.is_informational()
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED
        {
            return false;
        }

        let headers = resp.headers();
        if headers.contains_key(CONTENT_ENCODING) {
            return false;
        }
        headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(mime::is_compressible)
    }
}

/// Whether `Accept-Encoding` lists gzip (or `*`) with a non-zero q-value
fn accepts_gzip(req: &HttpRequest) -> bool {
    req.headers()
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|item| {
            let mut parts = item.split(';').map(str::trim);
            let coding = parts.next().unwrap_or_default();
            let q_zero = parts.any(|p| {
                p.strip_prefix("q=")
                    .and_then(|q| q.parse::<f32>().ok())
                    .is_some_and(|q| q <= 0.0)
            });
            (coding.eq_ignore_ascii_case("gzip") || coding == "*") && !q_zero
        })
}

/// Turn a strong `ETag` weak, since the gzip body differs from the identity bytes
fn weaken_etag(headers: &mut HeaderMap) {
    let weak = headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .filter(|tag| tag.starts_with('"'))
        .and_then(|tag| HeaderValue::from_str(&format!("W/{tag}")).ok());
    if let Some(weak) = weak {
        headers.insert(ETAG, weak);
    }
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(
        Vec::with_capacity(data.len() / 2),
        flate2::Compression::default(),
    );
    encoder.write_all(data)?;
    encoder.finish()
}

#[async_trait]
impl Middleware for Compression {
    async fn handle(&self, req: HttpRequest, next: Next<'_>) -> HttpResponse {
        let wanted =
            self.config.enabled && req.method() != Method::HEAD && accepts_gzip(&req);

        let resp = next.run(req).await;
        if !wanted || !self.eligible(&resp) {
            return resp;
        }

        let (mut parts, body) = resp.into_parts();
        // Full<Bytes> never errors
        let data = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };
        if data.len() < self.config.min_bytes {
            return HttpResponse::from_parts(parts, Full::new(data));
        }

        match gzip(&data) {
            Ok(encoded) => {
                parts
                    .headers
                    .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
                parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(encoded.len()));
                parts
                    .headers
                    .append(VARY, HeaderValue::from_static("Accept-Encoding"));
                weaken_etag(&mut parts.headers);
                HttpResponse::from_parts(parts, Full::new(Bytes::from(encoded)))
            }
            Err(e) => {
                logger::log_warning(&format!("gzip failed, sending identity body: {e}"));
                HttpResponse::from_parts(parts, Full::new(data))
            }
        }
    }
}
