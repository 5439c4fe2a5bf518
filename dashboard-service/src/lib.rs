pub mod api;
pub mod config;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod transform;

use std::path::Path;

use energy_client::domain::BenchmarkRecord;

pub use pipeline::{Envelope, Pipeline, PipelineError};
pub use sinks::Snapshot;

/// Read, validate and freeze the dataset at `path`. Any bad record fails the
/// whole load.
pub async fn load_snapshot(path: &Path) -> Result<Snapshot, PipelineError> {
    tracing::info!(path = %path.display(), "loading dataset");
    let source = sources::EnergyCsvFileSource::new(path);
    Pipeline::<_, BenchmarkRecord, _>::new(source, sinks::SnapshotSink)
        .with_transform(transform::BenchmarkValidation)
        .run()
        .await
}
