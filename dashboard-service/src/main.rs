use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use dashboard_service::{
    api::{self, ApiState},
    config::AppConfig,
    load_snapshot, metrics_server, observability,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // The API only starts once the dataset has loaded cleanly.
    let dataset_path = cfg.dataset.path.display();
    let snapshot = load_snapshot(&cfg.dataset.path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load dataset '{dataset_path}': {e}"))?;

    let addr: SocketAddr = cfg
        .server
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.bind_addr: {e}"))?;

    let state = Arc::new(ApiState {
        snapshot: Arc::new(snapshot),
        heading: cfg.dataset.heading.clone(),
        max_page_size: cfg.server.max_page_size,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dashboard API listening");
    axum::serve(listener, api::router(state).into_make_service()).await?;

    Ok(())
}
