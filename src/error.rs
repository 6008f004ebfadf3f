//! Startup error types.
//!
//! Request handling never fails at this layer; everything that can go wrong
//! while serving is turned into a response. These errors only abort startup.

use thiserror::Error;

use crate::asset::AssetError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("failed to mount embedded assets: {0}")]
    Assets(#[from] AssetError),

    #[error("failed to initialize logger: {0}")]
    Logger(#[source] std::io::Error),

    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}
