//! KickSight gateway server
//!
//! Entry point: loads configuration and serves the API.

use std::sync::Arc;

use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tracing::error;

use kicksight_gateway::config::AppConfig;
use kicksight_gateway::{server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before anything reads the environment
    let _ = dotenv();

    telemetry::init();

    let config = match AppConfig::load() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!(name: "config.invalid", error = %e, "Configuration error");
            return Err(e.into());
        }
    };

    server::start_server(config).await
}
