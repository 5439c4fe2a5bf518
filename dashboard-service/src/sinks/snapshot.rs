use std::collections::BTreeMap;

use energy_client::{
    domain::{BenchmarkRecord, Metric, Record},
    Dataset, ViewKind,
};
use futures::StreamExt;
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{
    pipeline::{Envelope, PipelineError, Sink},
    transform::normalize,
};

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    let len = s.len() as u32;
    hasher.update(&len.to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_i64(hasher: &mut blake3::Hasher, v: i64) {
    hasher.update(&v.to_le_bytes());
}

fn hash_f64(hasher: &mut blake3::Hasher, v: f64) {
    hasher.update(&v.to_bits().to_le_bytes());
}

fn hash_record(hasher: &mut blake3::Hasher, r: &Record) {
    let b = &r.building;
    hash_i64(hasher, b.property_id);
    hash_str(hasher, &b.property_name);
    hash_i64(hasher, b.bbl);
    hash_str(hasher, &b.address);
    hash_str(hasher, &b.city);
    hash_str(hasher, &b.postcode);
    hash_str(hasher, &b.property_type);
    hash_str(hasher, &b.borough);
    hash_i64(hasher, b.council_district);
    hash_str(hasher, &b.census_tract);
    hash_str(hasher, &b.is_lowrise);
    hash_f64(hasher, b.latitude);
    hash_f64(hasher, b.longitude);
    hash_i64(hasher, b.year_built);
    hash_str(hasher, &b.community_board);
    hash_str(hasher, &b.nta);
    hash_i64(hasher, i64::from(r.period.tag()));
    for m in Metric::ALL {
        hash_f64(hasher, r.metrics[m]);
    }
}

/// The frozen dataset the API serves, plus where it came from.
#[derive(Debug)]
pub struct Snapshot {
    dataset: Dataset,
    records: usize,
    fingerprint: String,
    built_at: String,
}

/// What `/health` reports about the loaded snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotInfo {
    pub records: usize,
    pub unified_rows: usize,
    pub entities: usize,
    pub views: BTreeMap<&'static str, usize>,
    pub fingerprint: String,
    pub built_at: String,
}

impl Snapshot {
    /// Materialize and project normalized concrete-year records.
    pub fn from_records(records: Vec<Record>) -> Result<Self, PipelineError> {
        let mut hasher = blake3::Hasher::new();
        for r in &records {
            hash_record(&mut hasher, r);
        }
        let fingerprint = hasher.finalize().to_hex().to_string();

        let built_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| PipelineError::Sink(format!("failed to format build time: {e}")))?;

        let count = records.len();
        let dataset = Dataset::build(records);

        Ok(Self {
            dataset,
            records: count,
            fingerprint,
            built_at,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn info(&self) -> SnapshotInfo {
        let unified = self.dataset.unified();
        SnapshotInfo {
            records: self.records,
            unified_rows: unified.len(),
            entities: unified.entities(),
            views: ViewKind::ALL
                .into_iter()
                .map(|k| (k.name(), self.dataset.view(k).len()))
                .collect(),
            fingerprint: self.fingerprint.clone(),
            built_at: self.built_at.clone(),
        }
    }
}

/// Terminal stage of the load: normalizes every record and freezes the
/// result into a [`Snapshot`]. The first upstream error aborts the load.
#[derive(Clone, Default)]
pub struct SnapshotSink;

#[async_trait::async_trait]
impl Sink<BenchmarkRecord> for SnapshotSink {
    type Output = Snapshot;

    async fn run<S>(&self, mut input: S) -> Result<Snapshot, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<BenchmarkRecord>, PipelineError>>
            + Send
            + Unpin
            + 'static,
    {
        let mut records = Vec::new();

        while let Some(item) = input.next().await {
            match item {
                Ok(env) => records.push(normalize(env.payload)),
                Err(e) => {
                    tracing::error!(error = %e, loaded = records.len(), "dataset load aborted");
                    return Err(e);
                }
            }
        }

        metrics::counter!("dataset_records_loaded_total").increment(records.len() as u64);

        let snapshot = Snapshot::from_records(records)?;
        if snapshot.dataset().unified().is_empty() {
            tracing::warn!("dataset has no records; every query will return empty results");
        }
        let info = snapshot.info();
        metrics::gauge!("dataset_unified_rows").set(info.unified_rows as f64);
        metrics::gauge!("dataset_entities").set(info.entities as f64);

        tracing::info!(
            records = info.records,
            unified_rows = info.unified_rows,
            entities = info.entities,
            fingerprint = %info.fingerprint,
            "dataset snapshot built"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::tests::raw;
    use energy_client::domain::Period;
    use futures::stream;

    fn input(
        items: Vec<Result<Envelope<BenchmarkRecord>, PipelineError>>,
    ) -> impl futures::Stream<Item = Result<Envelope<BenchmarkRecord>, PipelineError>>
           + Send
           + Unpin
           + 'static {
        stream::iter(items)
    }

    #[tokio::test]
    async fn builds_snapshot_with_rollup_rows() {
        let mut second = raw(2019);
        second.property_id = Some(2.0);

        let snapshot = SnapshotSink
            .run(input(vec![
                Ok(Envelope::new(raw(2018))),
                Ok(Envelope::new(raw(2019))),
                Ok(Envelope::new(second)),
            ]))
            .await
            .unwrap();

        let info = snapshot.info();
        assert_eq!(info.records, 3);
        assert_eq!(info.entities, 2);
        // 3 concrete rows + a Total and a Mean per building
        assert_eq!(info.unified_rows, 7);
        assert_eq!(info.views["recent"], 2);
        assert_eq!(info.fingerprint.len(), 64);
        assert!(!info.built_at.is_empty());
    }

    #[tokio::test]
    async fn upstream_error_aborts_load() {
        let res = SnapshotSink
            .run(input(vec![
                Ok(Envelope::new(raw(2018))),
                Err(PipelineError::Transform("bad year".to_string())),
                Ok(Envelope::new(raw(2019))),
            ]))
            .await;
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }

    #[test]
    fn star_score_default_leaves_mean_of_reported_years() {
        let mut rated = raw(2016);
        rated.metrics[Metric::EnergyStarScore] = 80.0;
        let records = vec![normalize(rated), normalize(raw(2017))];
        let snapshot = Snapshot::from_records(records).unwrap();

        let score = |period: Period| {
            snapshot
                .dataset()
                .unified()
                .rows()
                .iter()
                .find(|r| r.period == period)
                .map(|r| r.metrics[Metric::EnergyStarScore])
        };
        assert_eq!(score(Period::Mean), Some(80.0));
        assert_eq!(score(Period::Total), Some(80.0));
        assert_eq!(score(Period::Year(2016)), Some(80.0));
        assert_eq!(score(Period::Year(2017)), Some(0.0));
    }

    #[test]
    fn fingerprint_is_deterministic_and_content_sensitive() {
        let a = Snapshot::from_records(vec![normalize(raw(2018))]).unwrap();
        let b = Snapshot::from_records(vec![normalize(raw(2018))]).unwrap();
        let c = Snapshot::from_records(vec![normalize(raw(2019))]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
