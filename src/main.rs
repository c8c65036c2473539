//! Pont Chaban-Delmas Server Entry Point
//!
//! Parses the command line, wraps the Bordeaux Métropole open-data client in
//! the schedule cache, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pontchaban::cache::RefreshingCache;
use pontchaban::cli::{Cli, ServerConfig};
use pontchaban::data::BridgeClient;
use pontchaban::web::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pontchaban=debug,info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::from_cli(&cli);

    let client = BridgeClient::new();
    let cache = Arc::new(RefreshingCache::new(config.cache.clone(), move || {
        let client = client.clone();
        async move { client.fetch_records().await }
    }));
    cache.start_auto_refresh();

    let state = AppState {
        cache: Arc::clone(&cache),
        base_url: config.base_url.clone(),
    };
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, base_url = %config.base_url, "Starting Pont Chaban-Delmas server");

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    cache.stop_auto_refresh();
    Ok(())
}
