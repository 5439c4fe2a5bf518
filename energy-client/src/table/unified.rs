use std::{collections::HashMap, sync::Arc};

use crate::domain::{Building, BuildingKey, Metric, Metrics, Period, Record};

/// Concrete-year rows followed by one Total and one Mean row per building.
#[derive(Debug, Clone, Default)]
pub struct UnifiedTable {
    rows: Vec<Arc<Record>>,
    entities: usize,
}

impl UnifiedTable {
    pub fn rows(&self) -> &[Arc<Record>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of distinct grouping keys (buildings).
    pub fn entities(&self) -> usize {
        self.entities
    }
}

/// Build the Total and Mean rows for one building from its concrete-year
/// metrics. An empty slice yields an all-zero Total and an all-NaN Mean.
pub fn rollup_rows(building: &Building, concrete: &[&Metrics]) -> (Record, Record) {
    let total = Record {
        building: building.clone(),
        period: Period::Total,
        metrics: Metrics::sum(concrete.iter().copied()),
    };
    // Intensities are averaged directly, not re-derived from mean totals.
    let mean = Record {
        building: building.clone(),
        period: Period::Mean,
        metrics: Metrics::mean(concrete.iter().copied()),
    };
    (total, mean)
}

/// A building without an ENERGY STAR Score is listed with 0. Applied after
/// the rollups so the Mean only averages reported scores.
fn score_unrated(record: &mut Record) {
    let score = &mut record.metrics[Metric::EnergyStarScore];
    if score.is_nan() {
        *score = 0.0;
    }
}

/// Group normalized concrete-year rows by the full building key and append
/// the synthetic Total and Mean rows. Groups keep first-appearance order.
pub fn materialize(concrete: Vec<Record>) -> UnifiedTable {
    let mut index: HashMap<BuildingKey, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (i, record) in concrete.iter().enumerate() {
        let slot = *index.entry(record.building.key()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(i);
    }

    let mut totals = Vec::with_capacity(groups.len());
    let mut means = Vec::with_capacity(groups.len());
    for members in &groups {
        let building = &concrete[members[0]].building;
        let metrics: Vec<&Metrics> = members.iter().map(|i| &concrete[*i].metrics).collect();
        let (total, mean) = rollup_rows(building, &metrics);
        totals.push(total);
        means.push(mean);
    }

    let entities = groups.len();
    let rows: Vec<Arc<Record>> = concrete
        .into_iter()
        .chain(totals)
        .chain(means)
        .map(|mut record| {
            score_unrated(&mut record);
            Arc::new(record)
        })
        .collect();

    tracing::debug!(rows = rows.len(), entities, "materialized unified table");

    UnifiedTable { rows, entities }
}
