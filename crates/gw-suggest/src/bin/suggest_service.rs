use std::sync::Arc;

use gw_store::{MemoryStateStore, MemoryStudyProvider, MemoryTrialSink};
use gw_suggest::{serve, GridCache, GridSuggestService, ServiceConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env()?;

    let provider = match &config.studies_path {
        Some(path) => MemoryStudyProvider::from_json_file(path)?,
        None => {
            warn!("no study catalog configured; every request will fail with study not found");
            MemoryStudyProvider::new()
        }
    };

    let service = Arc::new(GridSuggestService::with_cache(
        provider,
        MemoryStateStore::new(),
        MemoryTrialSink::new(),
        GridCache::with_capacity(config.grid_cache_capacity),
    ));

    let listener = TcpListener::bind(&config.addr).await?;
    info!(addr = %config.addr, "grid suggestion service listening");

    serve(listener, service).await?;
    Ok(())
}
