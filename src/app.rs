//! Application assembly
//!
//! Everything a connection task needs, built once before the listener starts
//! accepting and shared read-only afterwards.

use std::sync::Arc;

use hyper::header::{HeaderValue, SERVER};
use hyper::Method;

use crate::asset::AssetStore;
use crate::config::Config;
use crate::handler::{Handler, HealthHandler, SearchEndpoint, StaticFallback};
use crate::http::{HttpRequest, HttpResponse};
use crate::middleware::{Compression, Cors, MiddlewareChain, RequestLogger};
use crate::routing::{RouteTable, Router};
use crate::search::SearchBackend;

pub const SEARCH_PATH: &str = "/api/search";
pub const HEALTH_PATH: &str = "/api/health";

pub struct App {
    chain: MiddlewareChain,
    router: Router,
    server_name: Option<HeaderValue>,
}

impl App {
    /// Wire the interceptors (CORS, access log, compression) around the
    /// route table and the static fallback
    pub fn build(
        config: &Config,
        assets: Arc<AssetStore>,
        backend: Arc<dyn SearchBackend>,
    ) -> Self {
        Self::with_logger(config, assets, backend, RequestLogger::new(&config.logging))
    }

    /// Same as [`App::build`] with the access logger supplied by the caller
    pub fn with_logger(
        config: &Config,
        assets: Arc<AssetStore>,
        backend: Arc<dyn SearchBackend>,
        logger: RequestLogger,
    ) -> Self {
        let search_config = Arc::new(config.search.clone());

        let search: Arc<dyn Handler> = Arc::new(SearchEndpoint::new(
            Arc::clone(&search_config),
            Arc::clone(&backend),
        ));
        let health = Arc::new(HealthHandler::new(search_config, Some(backend)));

        let table = RouteTable::builder()
            .route_many([Method::POST, Method::GET], SEARCH_PATH, &search)
            .route(Method::GET, HEALTH_PATH, health)
            .build();

        let chain = MiddlewareChain::new()
            .with(Cors::new(&config.http.cors))
            .with(logger)
            .with(Compression::new(config.http.compression));

        Self {
            chain,
            router: Router::new(table, StaticFallback::new(assets)),
            server_name: HeaderValue::from_str(&config.http.server_name).ok(),
        }
    }

    pub const fn router(&self) -> &Router {
        &self.router
    }

    /// Run one request through the whole pipeline
    pub async fn handle(&self, req: HttpRequest) -> HttpResponse {
        let mut resp = self.chain.run(req, &self.router).await;
        if let Some(name) = &self.server_name {
            resp.headers_mut().insert(SERVER, name.clone());
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{WebAssets, DIST_PREFIX};
    use crate::handler::static_files::FALLBACK_CONTENT_TYPE;
    use crate::logger::AccessLogEntry;
    use crate::search::{
        EmptyBackend, NamedPlugin, Plugin, PluginManager, SearchError, SearchOutcome, SearchQuery,
        StaticPluginManager,
    };
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use hyper::body::Bytes;
    use hyper::header::{
        ACCEPT_ENCODING, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD,
        CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ORIGIN,
    };
    use hyper::{HeaderMap, Request, StatusCode};
    use serde_json::Value;
    use std::sync::Mutex;

    const INDEX: &[u8] = b"<!doctype html><div id=app></div>";

    struct Recording {
        queries: Mutex<Vec<SearchQuery>>,
        manager: Option<Arc<dyn PluginManager>>,
    }

    impl Recording {
        fn new(plugins: Option<&[&str]>) -> Self {
            let manager = plugins.map(|names| {
                let plugins = names
                    .iter()
                    .map(|n| Arc::new(NamedPlugin(n.to_string())) as Arc<dyn Plugin>)
                    .collect();
                Arc::new(StaticPluginManager::new(plugins)) as Arc<dyn PluginManager>
            });
            Self {
                queries: Mutex::default(),
                manager,
            }
        }
    }

    #[async_trait]
    impl SearchBackend for Recording {
        fn plugin_manager(&self) -> Option<Arc<dyn PluginManager>> {
            self.manager.clone()
        }

        async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(SearchOutcome::default())
        }
    }

    fn config(plugins_enabled: bool) -> Config {
        let mut cfg = Config::load_from("does-not-exist/config").unwrap();
        cfg.logging.access_log = false;
        cfg.search.async_plugin_enabled = plugins_enabled;
        cfg.search.default_channels = vec!["tg".into(), "web".into()];
        cfg
    }

    fn assets() -> Arc<AssetStore> {
        Arc::new(AssetStore::from_files([
            ("index.html", INDEX),
            ("assets/app.js", &b"console.log('app');"[..]),
            ("favicon.ico", &b"\x00\x00\x01\x00"[..]),
        ]))
    }

    fn app_with(cfg: &Config, backend: Arc<dyn SearchBackend>) -> App {
        App::build(cfg, assets(), backend)
    }

    async fn send(app: &App, req: HttpRequest) -> (StatusCode, HeaderMap, Bytes) {
        let resp = app.handle(req).await;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }

    async fn get(app: &App, path: &str) -> (StatusCode, HeaderMap, Bytes) {
        send(app, Request::get(path).body(Bytes::new()).unwrap()).await
    }

    async fn health(app: &App) -> serde_json::Map<String, Value> {
        let (status, headers, body) = get(app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers[CONTENT_TYPE].to_str().unwrap().starts_with("application/json"));
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_assets_served_byte_exact() {
        let app = app_with(&config(false), Arc::new(EmptyBackend));

        let (status, headers, body) = get(&app, "/assets/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log('app');");
        assert_eq!(headers[CONTENT_LENGTH], "19");

        let (_, headers, body) = get(&app, "/favicon.ico").await;
        assert_eq!(body, &[0u8, 0, 1, 0][..]);
        assert_eq!(headers[CONTENT_TYPE], "image/x-icon");
    }

    #[tokio::test]
    async fn test_unknown_paths_serve_spa() {
        let app = app_with(&config(false), Arc::new(EmptyBackend));
        for path in ["/search/rust", "/settings/profile", "/nope.png", "/api/other"] {
            let (status, headers, body) = get(&app, path).await;
            assert_eq!(status, StatusCode::OK, "{path}");
            assert_eq!(headers[CONTENT_TYPE], FALLBACK_CONTENT_TYPE, "{path}");
            assert_eq!(body, INDEX, "{path}");
        }
    }

    #[tokio::test]
    async fn test_missing_fallback_document_answers_404() {
        let assets = Arc::new(AssetStore::from_files([("assets/app.js", &b"1"[..])]));
        let app = App::build(&config(false), assets, Arc::new(EmptyBackend));
        let (status, _, body) = get(&app, "/client/route").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_root_equals_index() {
        let app = app_with(&config(false), Arc::new(EmptyBackend));
        let root = get(&app, "/").await;
        let index = get(&app, "/index.html").await;
        assert_eq!(root, index);
    }

    #[tokio::test]
    async fn test_health_disabled_omits_plugin_keys() {
        let app = app_with(&config(false), Arc::new(Recording::new(Some(&["A"][..]))));
        let report = health(&app).await;

        assert_eq!(report["status"], "ok");
        assert_eq!(report["plugins_enabled"], false);
        assert_eq!(report["channels"], serde_json::json!(["tg", "web"]));
        assert_eq!(report["channels_count"], 2);
        assert!(!report.contains_key("plugin_count"));
        assert!(!report.contains_key("plugins"));
    }

    #[tokio::test]
    async fn test_health_enabled_lists_plugins() {
        let app = app_with(&config(true), Arc::new(Recording::new(Some(&["A", "B"][..]))));
        let report = health(&app).await;

        assert_eq!(report["plugins_enabled"], true);
        assert_eq!(report["plugin_count"], 2);
        assert_eq!(report["plugins"], serde_json::json!(["A", "B"]));
    }

    #[tokio::test]
    async fn test_health_enabled_without_manager() {
        let app = app_with(&config(true), Arc::new(Recording::new(None)));
        let report = health(&app).await;

        assert_eq!(report["plugin_count"], 0);
        assert_eq!(report["plugins"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_post_health_falls_back() {
        let app = app_with(&config(true), Arc::new(EmptyBackend));
        let req = Request::post("/api/health").body(Bytes::new()).unwrap();
        let (status, headers, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], FALLBACK_CONTENT_TYPE);
        assert_eq!(body, INDEX);
    }

    #[tokio::test]
    async fn test_get_and_post_search_share_handler() {
        let backend = Arc::new(Recording::new(None));
        let app = app_with(&config(false), backend.clone());

        let (status, _, _) = get(&app, "/api/search?kw=rust&channels=a,b").await;
        assert_eq!(status, StatusCode::OK);

        let req = Request::post("/api/search")
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from_static(br#"{"kw":"rust","channels":["a","b"]}"#))
            .unwrap();
        let (status, _, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);

        let queries = backend.queries.lock().unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0], queries[1]);

        let router = app.router();
        let via_get = router.table().match_route(&Method::GET, SEARCH_PATH).unwrap();
        let via_post = router.table().match_route(&Method::POST, SEARCH_PATH).unwrap();
        assert!(Arc::ptr_eq(via_get, via_post));
    }

    #[tokio::test]
    async fn test_preflight_never_reaches_search() {
        let backend = Arc::new(Recording::new(None));
        let app = app_with(&config(false), backend.clone());

        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/search?kw=rust")
            .header(ORIGIN, "https://ui.example")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Bytes::new())
            .unwrap();
        let (status, headers, _) = send(&app, req).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(backend.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_passes_through_compression() {
        let big = "<p>client routed</p>".repeat(200);
        let assets = Arc::new(AssetStore::from_files([("index.html", big.clone())]));
        let app = App::build(&config(false), assets, Arc::new(EmptyBackend));

        let req = Request::get("/deep/link")
            .header(ACCEPT_ENCODING, "gzip")
            .header(ORIGIN, "https://ui.example")
            .body(Bytes::new())
            .unwrap();
        let (status, headers, body) = send(&app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_ENCODING], "gzip");
        assert_eq!(headers[CONTENT_TYPE], FALLBACK_CONTENT_TYPE);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[SERVER], "search-gateway");
        assert!(body.len() < big.len());
    }

    #[tokio::test]
    async fn test_route_miss_is_access_logged() {
        let entries: Arc<Mutex<Vec<AccessLogEntry>>> = Arc::default();
        let sink = entries.clone();
        let logger = RequestLogger::with_emitter(move |e| sink.lock().unwrap().push(e.clone()));
        let app = App::with_logger(&config(false), assets(), Arc::new(EmptyBackend), logger);

        let (status, _, body) = get(&app, "/deep/link").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, INDEX);

        let entries = entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].method, "GET");
        assert_eq!(entries[0].path, "/deep/link");
        assert_eq!(entries[0].status, 200);
        assert_eq!(entries[0].body_bytes, INDEX.len());
    }

    #[tokio::test]
    async fn test_embedded_bundle_boots() {
        let assets = Arc::new(AssetStore::mount::<WebAssets>(DIST_PREFIX).unwrap());
        let app = App::build(&config(false), assets, Arc::new(EmptyBackend));

        let (status, headers, body) = get(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], FALLBACK_CONTENT_TYPE);
        assert!(!body.is_empty());

        let (status, headers, _) = get(&app, "/assets/app.css").await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers[CONTENT_TYPE].to_str().unwrap().starts_with("text/css"));
    }
}
