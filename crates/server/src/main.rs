//! netfirst server entry point.
//!
//! Loads configuration, registers the cache worker and boots the MCP server
//! on stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use netfirst_client::{FetchClient, FetchConfig, Network, Registration, ServiceWorker, fetch::parse_origin};
use netfirst_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = %config.cache_version,
        origin = %config.origin,
        db_path = %config.db_path.display(),
        "Starting netfirst server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let registration = Arc::new(Registration::new(network.clone()));

    match registration.resume(&db).await {
        Ok(Some(worker)) => tracing::info!(version = worker.version(), "previous worker resumed"),
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "could not resume previous worker"),
    }

    let worker = ServiceWorker::from_config(&config, db.clone(), network)?;
    if let Err(err) = registration.register(worker).await {
        tracing::error!(error = %err, "worker registration failed; keeping the previous worker if any");
    }

    let origin = parse_origin(&config.origin)?;
    let handler = handler::NetfirstServer::new(registration, db.clone(), origin);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    db.close().await?;

    Ok(())
}
