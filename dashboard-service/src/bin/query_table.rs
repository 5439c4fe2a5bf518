use std::path::PathBuf;

use anyhow::{Context, Result};
use dashboard_service::{config::DEFAULT_HEADING, load_snapshot, observability};
use energy_client::{TableRequest, ViewKind};

/// Usage: query_table <csv> <view> [filter-query]
///
/// Loads the CSV, runs one table query over every period and prints the
/// first page (10 rows) as JSON.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let mut args = std::env::args().skip(1);
    let (Some(path), Some(view)) = (args.next(), args.next()) else {
        anyhow::bail!("usage: query_table <csv> <view> [filter-query]");
    };
    let filter_query = args.next().unwrap_or_default();

    let view: ViewKind = view.parse()?;
    let snapshot = load_snapshot(&PathBuf::from(&path))
        .await
        .with_context(|| format!("failed to load dataset '{path}'"))?;

    let request = TableRequest {
        filter_query,
        ..TableRequest::default()
    };
    let page = request.execute(snapshot.dataset().view(view), DEFAULT_HEADING)?;

    tracing::info!(view = %view, rows = page.rows.len(), "query finished");
    println!("{}", serde_json::to_string_pretty(&page)?);

    Ok(())
}
