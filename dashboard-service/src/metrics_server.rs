use std::net::SocketAddr;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder and serve `/metrics` on `bind_addr`.
pub fn init(bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics.bind_addr '{bind_addr}': {e}"))?;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus metrics recorder: {e}"))?;
    // Only the first install wins; a second call keeps the existing handle.
    let _ = PROM_HANDLE.set(handle);

    describe();

    tokio::spawn(async move {
        let app = Router::new().route("/metrics", get(metrics_handler));

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(%addr, "metrics listener bound");
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    tracing::error!(error = %e, "metrics server error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to bind metrics listener");
            }
        }
    });

    Ok(())
}

fn describe() {
    metrics::describe_counter!(
        "dataset_records_loaded_total",
        "Benchmark records accepted into the snapshot"
    );
    metrics::describe_counter!(
        "dataset_records_rejected_total",
        "Benchmark records that failed parsing or validation"
    );
    metrics::describe_gauge!("dataset_unified_rows", "Rows in the unified table, rollups included");
    metrics::describe_gauge!("dataset_entities", "Distinct buildings in the snapshot");
    metrics::describe_counter!("api_requests_total", "Query API requests by route");
    metrics::describe_counter!("api_query_errors_total", "Query API requests rejected as invalid");
    metrics::describe_histogram!("api_query_latency_seconds", "Time spent answering a query");
}

async fn metrics_handler() -> String {
    PROM_HANDLE.get().map(|h| h.render()).unwrap_or_default()
}
