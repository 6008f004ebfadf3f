//! Cross-origin interceptor
//!
//! Every `OPTIONS` request is answered here with 204 and never reaches the
//! route table. CORS headers are only attached for permitted origins.

use async_trait::async_trait;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
    ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use hyper::{HeaderMap, Method};

use super::{Middleware, Next};
use crate::config::CorsConfig;
use crate::http::{self, HttpRequest, HttpResponse};

pub struct Cors {
    any_origin: bool,
    origins: Vec<String>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    max_age: HeaderValue,
    allow_credentials: bool,
}

impl Cors {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            any_origin: config.allowed_origins.iter().any(|o| o == "*"),
            origins: config
                .allowed_origins
                .iter()
                .filter(|o| o.as_str() != "*")
                .map(|o| o.trim_end_matches('/').to_string())
                .collect(),
            allow_methods: list_header(&config.allowed_methods),
            allow_headers: list_header(&config.allowed_headers),
            max_age: HeaderValue::from(config.max_age),
            allow_credentials: config.allow_credentials,
        }
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        self.any_origin || self.origins.iter().any(|o| o == origin)
    }

    /// Responses differ per `Origin` unless the policy answers a plain `*`
    const fn varies_by_origin(&self) -> bool {
        !self.any_origin || self.allow_credentials
    }

    /// Add `Vary: Origin` to every response of an origin-dependent policy,
    /// allowed origin or not
    fn apply_vary(&self, headers: &mut HeaderMap) {
        if self.varies_by_origin() {
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }
    }

    /// Insert the origin headers for an allowed `Origin`
    fn apply_origin(&self, headers: &mut HeaderMap, origin: &HeaderValue) {
        if self.varies_by_origin() {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        } else {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
        if self.allow_credentials {
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
    }

    fn allowed_origin<'r>(&self, req: &'r HttpRequest) -> Option<&'r HeaderValue> {
        let origin = req.headers().get(ORIGIN)?;
        let origin_str = origin.to_str().ok()?;
        self.origin_allowed(origin_str).then_some(origin)
    }

    fn preflight(&self, req: &HttpRequest) -> HttpResponse {
        let mut resp = http::build_204_response();
        let is_preflight = req.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD);

        if let Some(origin) = self.allowed_origin(req) {
            let headers = resp.headers_mut();
            self.apply_origin(headers, origin);
            if is_preflight {
                headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
                headers.insert(ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
            }
        }
        self.apply_vary(resp.headers_mut());
        resp
    }
}

fn list_header(items: &[String]) -> HeaderValue {
    HeaderValue::from_str(&items.join(", ")).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[async_trait]
impl Middleware for Cors {
    async fn handle(&self, req: HttpRequest, next: Next<'_>) -> HttpResponse {
        if req.method() == Method::OPTIONS {
            return self.preflight(&req);
        }

        let origin = self.allowed_origin(&req).cloned();
        let mut resp = next.run(req).await;
        if let Some(origin) = origin {
            self.apply_origin(resp.headers_mut(), &origin);
        }
        self.apply_vary(resp.headers_mut());
        resp
    }
}
