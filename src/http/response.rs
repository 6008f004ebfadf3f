//! HTTP response building module
//!
//! Builders for the responses the gateway produces, decoupled from routing.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::cache::CachePolicy;
use super::HttpResponse;

/// Build 200 response carrying a stored asset
///
/// `Content-Type` is only set when known.
pub fn build_asset_response(
    data: Bytes,
    content_type: Option<&str>,
    etag: &str,
    cache: CachePolicy,
) -> HttpResponse {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_LENGTH, data.len())
        .header(ETAG, etag)
        .header(CACHE_CONTROL, cache.to_header_value());
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }

    builder.body(Full::new(data)).unwrap_or_else(|e| {
        log_build_error("200", &e);
        empty_response(StatusCode::INTERNAL_SERVER_ERROR)
    })
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str, cache: CachePolicy) -> HttpResponse {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(ETAG, etag)
        .header(CACHE_CONTROL, cache.to_header_value())
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            empty_response(StatusCode::NOT_MODIFIED)
        })
}

/// Build 404 Not Found response with an empty body
pub fn build_404_response() -> HttpResponse {
    empty_response(StatusCode::NOT_FOUND)
}

/// Build 204 No Content response (preflight answers)
pub fn build_204_response() -> HttpResponse {
    empty_response(StatusCode::NO_CONTENT)
}

/// Build 413 Payload Too Large response
pub fn build_413_response(max_body_size: u64) -> HttpResponse {
    build_error_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        &format!("request body exceeds {max_body_size} bytes"),
    )
}

/// Build JSON error body: `{"code": <status>, "message": <message>}`
pub fn build_error_response(status: StatusCode, message: &str) -> HttpResponse {
    json_response(
        status,
        &serde_json::json!({
            "code": status.as_u16(),
            "message": message,
        }),
    )
}

/// Build JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header(CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from_static(
                    br#"{"code":500,"message":"internal server error"}"#,
                )))
                .unwrap_or_else(|_| empty_response(StatusCode::INTERNAL_SERVER_ERROR));
        }
    };

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .header(CONTENT_LENGTH, json.len())
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            empty_response(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

fn empty_response(status: StatusCode) -> HttpResponse {
    let mut resp = Response::new(Full::new(Bytes::new()));
    *resp.status_mut() = status;
    resp
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_response_headers() {
        let resp = build_asset_response(
            Bytes::from_static(b"body{}"),
            Some("text/css; charset=utf-8"),
            "\"e1\"",
            CachePolicy::default(),
        );
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_LENGTH], "6");
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/css; charset=utf-8");
        assert_eq!(resp.headers()[ETAG], "\"e1\"");
    }

    #[test]
    fn test_asset_response_without_content_type() {
        let resp = build_asset_response(
            Bytes::from_static(b"\x00\x01"),
            None,
            "\"e2\"",
            CachePolicy::NoCache,
        );
        assert!(resp.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(resp.headers()[CACHE_CONTROL], "no-cache");
    }

    #[test]
    fn test_error_response_body() {
        let resp = build_error_response(StatusCode::BAD_REQUEST, "kw is required");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
    }
}
