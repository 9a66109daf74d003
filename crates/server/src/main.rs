//! tokicon server entry point.
//!
//! Boots the icon service and serves it over MCP on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use tokicon_client::{FetchConfig, HttpTransport, IconService};
use tokicon_core::{Ambient, AppConfig, IconCache, Poller, PollerConfig, StoreDb, poll_fn};

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = Arc::new(AppConfig::load()?);
    tracing::info!(db_path = %config.db_path.display(), "Starting tokicon server on stdio transport");

    let store = StoreDb::open(&config.db_path).await?;
    let transport = Arc::new(HttpTransport::new(FetchConfig::from(config.as_ref()))?);
    let cache = Arc::new(IconCache::new(config.cache_policy()));
    let service = Arc::new(IconService::new(config.clone(), transport, cache).with_store(store));

    if let Err(e) = service.warm_from_store().await {
        tracing::warn!(error = %e, "could not warm icon cache from store");
    }

    // The sweep runs regardless of host visibility or connectivity.
    let (_ambient_tx, ambient_rx) = watch::channel(Ambient::default());
    let sweep_config = PollerConfig {
        base_interval: config.cleanup_interval(),
        max_interval: config.cleanup_interval(),
        visibility_pause: false,
        network_pause: false,
        ..Default::default()
    };
    let sweep_service = service.clone();
    let sweep = Poller::new(
        "icon-cache-sweep",
        poll_fn(move || {
            let service = sweep_service.clone();
            async move { service.cleanup().await.map(|_| ()) }
        }),
        sweep_config,
        ambient_rx,
    );
    sweep.start();

    let handler = handler::IconServer::new(service);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    sweep.stop();

    Ok(())
}
