//! Search backend seam
//!
//! The gateway does not compute results or run plugins. It talks to the
//! backend through these traits, injected once at startup.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// A search plugin as seen from the HTTP boundary
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

/// Registry of loaded plugins
pub trait PluginManager: Send + Sync {
    /// Plugins in registration order
    fn plugins(&self) -> Vec<Arc<dyn Plugin>>;
}

/// Handle to the search subsystem
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// `None` when the plugin subsystem was never started
    fn plugin_manager(&self) -> Option<Arc<dyn PluginManager>>;

    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError>;
}

/// Normalized search parameters, independent of how they were transmitted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    pub kw: String,
    pub channels: Vec<String>,
    pub plugins: Vec<String>,
    /// Bypass any backend-side cache
    pub refresh: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub total: usize,
    pub results: Vec<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search backend unavailable")]
    Unavailable,
    #[error("search failed: {0}")]
    Backend(String),
}

/// Backend with no plugin subsystem that finds nothing
///
/// Used when the gateway runs standalone; embedders inject a real backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyBackend;

#[async_trait]
impl SearchBackend for EmptyBackend {
    fn plugin_manager(&self) -> Option<Arc<dyn PluginManager>> {
        None
    }

    async fn search(&self, _query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        Ok(SearchOutcome::default())
    }
}

/// Fixed plugin list, in the order given
#[derive(Default)]
pub struct StaticPluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl StaticPluginManager {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }
}

impl PluginManager for StaticPluginManager {
    fn plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins.clone()
    }
}

/// Plugin known only by name
#[derive(Debug, Clone)]
pub struct NamedPlugin(pub String);

impl Plugin for NamedPlugin {
    fn name(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_backend() {
        let backend = EmptyBackend;
        assert!(backend.plugin_manager().is_none());
        let outcome = backend.search(&SearchQuery::default()).await.unwrap();
        assert_eq!(outcome.total, 0);
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn test_static_manager_keeps_order() {
        let manager = StaticPluginManager::new(vec![
            Arc::new(NamedPlugin("zeta".into())),
            Arc::new(NamedPlugin("alpha".into())),
        ]);
        let names: Vec<String> = manager
            .plugins()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }
}
