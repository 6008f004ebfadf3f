//! Health report
//!
//! The payload shape depends on configuration: plugin keys exist only when
//! async plugins are enabled, and are zeroed (not omitted) when the plugin
//! subsystem is missing.

use std::sync::Arc;

use async_trait::async_trait;
use hyper::StatusCode;
use serde_json::{json, Map, Value};

use super::Handler;
use crate::config::SearchConfig;
use crate::http::{self, HttpRequest, HttpResponse};
use crate::search::SearchBackend;

/// Assemble the health payload
pub fn build_health_status(
    config: &SearchConfig,
    backend: Option<&dyn SearchBackend>,
) -> Map<String, Value> {
    let plugins_enabled = config.async_plugin_enabled;

    let mut status = Map::new();
    status.insert("status".into(), json!("ok"));
    status.insert("plugins_enabled".into(), json!(plugins_enabled));
    status.insert("channels".into(), json!(config.default_channels));
    status.insert("channels_count".into(), json!(config.default_channels.len()));

    if plugins_enabled {
        let names: Vec<String> = backend
            .and_then(|b| b.plugin_manager())
            .map(|manager| {
                manager
                    .plugins()
                    .iter()
                    .map(|p| p.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        status.insert("plugin_count".into(), json!(names.len()));
        status.insert("plugins".into(), json!(names));
    }

    status
}

/// `GET /api/health`
pub struct HealthHandler {
    config: Arc<SearchConfig>,
    backend: Option<Arc<dyn SearchBackend>>,
}

impl HealthHandler {
    pub fn new(config: Arc<SearchConfig>, backend: Option<Arc<dyn SearchBackend>>) -> Self {
        Self { config, backend }
    }
}

#[async_trait]
impl Handler for HealthHandler {
    async fn call(&self, _req: HttpRequest) -> HttpResponse {
        let status = build_health_status(&self.config, self.backend.as_deref());
        http::json_response(StatusCode::OK, &status)
    }
}
