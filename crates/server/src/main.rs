//! swcache server entry point.
//!
//! Loads configuration, opens the cache store, resumes the versions recorded
//! by the previous run and brings up the configured one, then serves MCP on
//! stdio. Logging goes to stderr to
//! avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig, Fetcher};
use swcache_core::{AppConfig, CacheDb, CacheStore};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod platform;
mod startup;
mod tools;

use platform::ServiceWorkerHost;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = Arc::new(AppConfig::load().context("failed to load configuration")?);
    tracing::info!("Starting swcache for {} ({}) on stdio transport", config.origin, config.cache_name());

    let db = Arc::new(
        CacheDb::open(&config.db_path)
            .await
            .with_context(|| format!("failed to open cache at {}", config.db_path.display()))?,
    );
    let store: Arc<dyn CacheStore> = db.clone();
    let fetcher: Arc<dyn Fetcher> = Arc::new(FetchClient::new(FetchConfig::from(config.as_ref()))?);
    let host = Arc::new(ServiceWorkerHost::new(fetcher.clone(), db));

    startup::resume(&host, &config, store.clone(), fetcher.clone()).await?;

    let handler = handler::SwCacheServer::new(config, store, fetcher, host);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
