use std::sync::Arc;

use search_gateway::asset::{AssetStore, WebAssets, DIST_PREFIX};
use search_gateway::config::{Config, DEFAULT_CONFIG_PATH};
use search_gateway::search::EmptyBackend;
use search_gateway::server::{self, ConnectionSettings, Shutdown};
use search_gateway::{logger, App, GatewayError};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg).map_err(GatewayError::Logger)?;

    // Worker count from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.socket_addr()?;

    // A bundle without the dist subtree is a packaging defect
    let assets = AssetStore::mount::<WebAssets>(DIST_PREFIX).map_err(GatewayError::from)?;
    let asset_count = assets.len();

    let app = Arc::new(App::build(&cfg, Arc::new(assets), Arc::new(EmptyBackend)));
    let listener = server::create_reusable_listener(addr).map_err(GatewayError::from)?;

    let shutdown = Arc::new(Shutdown::new());
    server::start_signal_handler(Arc::clone(&shutdown))?;

    logger::log_server_start(&addr, &cfg, asset_count);

    server::serve(listener, app, ConnectionSettings::from_config(&cfg), shutdown).await?;
    Ok(())
}
