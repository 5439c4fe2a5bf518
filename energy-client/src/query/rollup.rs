//! Grouped sums and means over a view, shaped for chart and KPI-card
//! consumers.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{
    domain::{Category, Column, Metric, Period, Record, Value, CONCRETE_YEARS},
    query::{select, CategoryFilter, QueryError},
    table::View,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// NaN-skipping sum; nothing to add gives 0.
    Sum,
    /// NaN-skipping mean; nothing to average gives NaN.
    Mean,
}

impl Aggregation {
    pub fn apply<I: IntoIterator<Item = f64>>(&self, values: I) -> f64 {
        let (sum, n) = values
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        match self {
            Aggregation::Sum => sum,
            Aggregation::Mean if n == 0 => f64::NAN,
            Aggregation::Mean => sum / n as f64,
        }
    }
}

/// Resolve metric column names against a view.
pub fn resolve_metrics(view: &View, names: &[String]) -> Result<Vec<Metric>, QueryError> {
    names
        .iter()
        .map(|name| match view.resolve(name)? {
            Column::Metric(m) => Ok(m),
            _ => Err(QueryError::InvalidRequest(format!("'{name}' is not a metric column"))),
        })
        .collect()
}

fn aggregate(rows: &[Arc<Record>], metrics: &[Metric], agg: Aggregation) -> Vec<f64> {
    metrics
        .iter()
        .map(|m| agg.apply(rows.iter().map(|r| r.metrics[*m])))
        .collect()
}

/// Headline numbers for the KPI cards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub properties: usize,
    pub total_source_energy: f64,
    pub total_ghg_emissions: f64,
    pub mean_source_eui: f64,
    pub mean_ghg_intensity: f64,
}

pub fn summarize(view: &View, periods: &[Period], category: Option<&CategoryFilter>) -> Summary {
    let rows = select(view, periods, category);
    let metric = |m: Metric, agg: Aggregation| {
        if view.has_column(Column::Metric(m)) {
            agg.apply(rows.iter().map(|r| r.metrics[m]))
        } else {
            f64::NAN
        }
    };

    Summary {
        properties: rows
            .iter()
            .map(|r| r.building.property_id)
            .collect::<HashSet<_>>()
            .len(),
        total_source_energy: metric(Metric::SourceEnergyUse, Aggregation::Sum),
        total_ghg_emissions: metric(Metric::TotalGhg, Aggregation::Sum),
        mean_source_eui: metric(Metric::SourceEui, Aggregation::Mean),
        mean_ghg_intensity: metric(Metric::TotalGhgIntensity, Aggregation::Mean),
    }
}

/// Rows sharing one category value; `values` follow the requested metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub key: Value,
    pub values: Vec<f64>,
}

fn group_by(rows: Vec<Arc<Record>>, dimension: Category) -> Vec<(Value, Vec<Arc<Record>>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Value, Vec<Arc<Record>>)> = Vec::new();
    for row in rows {
        let key = row.value(dimension.into());
        let slot = *index.entry(key.to_text().into_owned()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }
    groups.sort_by(|a, b| a.0.cmp_present(&b.0));
    groups
}

/// Aggregate the selected rows per value of `dimension`, keys ascending.
pub fn rollup_by_category(
    view: &View,
    periods: &[Period],
    category: Option<&CategoryFilter>,
    dimension: Category,
    metrics: &[Metric],
    agg: Aggregation,
) -> Vec<CategoryGroup> {
    group_by(select(view, periods, category), dimension)
        .into_iter()
        .map(|(key, rows)| CategoryGroup {
            values: aggregate(&rows, metrics, agg),
            key,
        })
        .collect()
}

/// One year of a trend line, optionally split by a category value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: Period,
    pub key: Option<Value>,
    pub values: Vec<f64>,
}

/// Aggregate the concrete years of a view, one point per year (and per
/// `split` value when given), ordered by year then key.
pub fn trend(
    view: &View,
    category: Option<&CategoryFilter>,
    split: Option<Category>,
    metrics: &[Metric],
    agg: Aggregation,
) -> Vec<TrendPoint> {
    let mut points = Vec::new();
    for year in CONCRETE_YEARS {
        let rows = select(view, &[Period::Year(year)], category);
        match split {
            None => points.push(TrendPoint {
                period: Period::Year(year),
                key: None,
                values: aggregate(&rows, metrics, agg),
            }),
            Some(dimension) => {
                points.extend(group_by(rows, dimension).into_iter().map(|(key, rows)| TrendPoint {
                    period: Period::Year(year),
                    key: Some(key),
                    values: aggregate(&rows, metrics, agg),
                }))
            }
        }
    }
    points
}

/// A trend value in long form, labelled with its source type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownPoint {
    pub period: Period,
    pub key: Option<Value>,
    pub source: &'static str,
    pub value: f64,
}

/// Melt trend points into one row per (period, metric).
pub fn source_breakdown(points: &[TrendPoint], metrics: &[Metric]) -> Vec<BreakdownPoint> {
    points
        .iter()
        .flat_map(|p| {
            metrics.iter().zip(&p.values).map(move |(m, v)| BreakdownPoint {
                period: p.period,
                key: p.key.clone(),
                source: m.label(),
                value: *v,
            })
        })
        .collect()
}

/// Distinct values of a dimension within a view, in first-appearance order.
pub fn category_values(view: &View, dimension: Category) -> Vec<Value> {
    let mut seen = HashSet::new();
    view.rows()
        .iter()
        .map(|r| r.value(dimension.into()))
        .filter(|v| seen.insert(v.to_text().into_owned()))
        .collect()
}
