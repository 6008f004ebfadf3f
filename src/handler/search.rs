//! Search endpoint
//!
//! Bound to both `GET /api/search` and `POST /api/search`. GET carries the
//! parameters in the query string, POST in a JSON body; both are normalized
//! into one [`SearchQuery`] before the backend sees them.

use std::sync::Arc;

use async_trait::async_trait;
use hyper::{Method, StatusCode};
use serde::Deserialize;

use super::Handler;
use crate::config::SearchConfig;
use crate::http::{self, HttpRequest, HttpResponse};
use crate::logger;
use crate::search::{SearchBackend, SearchError, SearchQuery};

/// Raw parameters as sent by the client
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
struct SearchParams {
    kw: String,
    channels: Vec<String>,
    plugins: Vec<String>,
    refresh: bool,
}

impl SearchParams {
    fn from_query_string(query: Option<&str>) -> Result<Self, String> {
        let mut params = Self::default();
        let Some(query) = query else {
            return Ok(params);
        };

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value)?;
            match key {
                "kw" => params.kw = value,
                "channels" => params.channels = split_list(&value),
                "plugins" => params.plugins = split_list(&value),
                "refresh" => params.refresh = matches!(value.as_str(), "true" | "1"),
                _ => {}
            }
        }
        Ok(params)
    }

    fn from_json(body: &[u8]) -> Result<Self, String> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| format!("invalid JSON body: {e}"))
    }

    /// Validate and fill defaults
    fn into_query(self, defaults: &SearchConfig) -> Result<SearchQuery, String> {
        let kw = self.kw.trim();
        if kw.is_empty() {
            return Err("kw is required".to_string());
        }

        let channels = clean_list(self.channels);
        Ok(SearchQuery {
            kw: kw.to_string(),
            channels: if channels.is_empty() {
                defaults.default_channels.clone()
            } else {
                channels
            },
            plugins: clean_list(self.plugins),
            refresh: self.refresh,
        })
    }
}

fn decode_component(raw: &str) -> Result<String, String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| format!("invalid query encoding: {e}"))
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(ToString::to_string).collect()
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Handler shared by both search bindings
pub struct SearchEndpoint {
    config: Arc<SearchConfig>,
    backend: Arc<dyn SearchBackend>,
}

impl SearchEndpoint {
    pub fn new(config: Arc<SearchConfig>, backend: Arc<dyn SearchBackend>) -> Self {
        Self { config, backend }
    }

    fn parse(&self, req: &HttpRequest) -> Result<SearchQuery, String> {
        let params = if req.method() == Method::POST {
            SearchParams::from_json(req.body())?
        } else {
            SearchParams::from_query_string(req.uri().query())?
        };
        params.into_query(&self.config)
    }
}

#[async_trait]
impl Handler for SearchEndpoint {
    async fn call(&self, req: HttpRequest) -> HttpResponse {
        let query = match self.parse(&req) {
            Ok(q) => q,
            Err(message) => return http::build_error_response(StatusCode::BAD_REQUEST, &message),
        };

        match self.backend.search(&query).await {
            Ok(outcome) => http::json_response(StatusCode::OK, &outcome),
            Err(e) => {
                logger::log_error(&format!("Search for '{}' failed: {e}", query.kw));
                let status = match e {
                    SearchError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                    SearchError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                http::build_error_response(status, &e.to_string())
            }
        }
    }
}
