use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use super::UnifiedTable;
use crate::{
    domain::{Attribute, Category, Column, Metric, MetricKind, Record},
    query::QueryError,
};

/// Named projections of the unified table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    /// Every column, every row; backs the paginated data table.
    Table,
    Usage,
    Emission,
    Totals,
    Intensity,
    /// Latest period per property.
    Recent,
}

impl ViewKind {
    pub const ALL: [ViewKind; 6] = [
        ViewKind::Table,
        ViewKind::Usage,
        ViewKind::Emission,
        ViewKind::Totals,
        ViewKind::Intensity,
        ViewKind::Recent,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ViewKind::Table => "table",
            ViewKind::Usage => "usage",
            ViewKind::Emission => "emission",
            ViewKind::Totals => "totals",
            ViewKind::Intensity => "intensity",
            ViewKind::Recent => "recent",
        }
    }

    pub fn columns(&self) -> Vec<Column> {
        let head = [
            Column::Attribute(Attribute::PropertyId),
            Column::Attribute(Attribute::PropertyName),
            Column::YearEnding,
        ];
        let location = [
            Column::Attribute(Attribute::Latitude),
            Column::Attribute(Attribute::Longitude),
        ];
        let categories = Category::ALL.map(Column::from);
        let metrics = |kinds: &[MetricKind]| -> Vec<Column> {
            kinds
                .iter()
                .flat_map(|k| Metric::of_kind(*k))
                .map(Column::Metric)
                .collect()
        };

        let body = match self {
            ViewKind::Table | ViewKind::Recent => {
                let mut all: Vec<Column> = Attribute::ALL.map(Column::from).to_vec();
                all.push(Column::YearEnding);
                all.extend(Metric::ALL.map(Column::from));
                return all;
            }
            ViewKind::Usage => [
                location.to_vec(),
                metrics(&[MetricKind::UsageIntensity, MetricKind::UsageTotal]),
            ]
            .concat(),
            ViewKind::Emission => [
                location.to_vec(),
                metrics(&[MetricKind::EmissionIntensity, MetricKind::EmissionTotal]),
            ]
            .concat(),
            ViewKind::Totals => metrics(&[MetricKind::UsageTotal, MetricKind::EmissionTotal]),
            ViewKind::Intensity => {
                metrics(&[MetricKind::UsageIntensity, MetricKind::EmissionIntensity])
            }
        };

        [head.to_vec(), body, categories.to_vec()].concat()
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ViewKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| QueryError::InvalidRequest(format!("unknown view '{s}'")))
    }
}

/// A read-only projection: a column subset over shared rows.
#[derive(Debug, Clone)]
pub struct View {
    kind: ViewKind,
    columns: Vec<Column>,
    rows: Vec<Arc<Record>>,
}

impl View {
    pub fn new(kind: ViewKind, rows: Vec<Arc<Record>>) -> Self {
        Self {
            kind,
            columns: kind.columns(),
            rows,
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Arc<Record>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Resolve a column name against this view.
    pub fn resolve(&self, name: &str) -> Result<Column, QueryError> {
        Column::from_name(name)
            .filter(|c| self.has_column(*c))
            .ok_or_else(|| QueryError::UnknownColumn {
                column: name.to_string(),
                view: self.kind,
            })
    }

    /// Flat field-name to value map restricted to this view's columns.
    pub fn to_json_row(&self, record: &Record) -> serde_json::Map<String, serde_json::Value> {
        self.columns
            .iter()
            .map(|c| (c.name().to_string(), record.value(*c).into()))
            .collect()
    }
}

/// Derive every view from the unified table.
pub fn project(unified: &UnifiedTable) -> HashMap<ViewKind, View> {
    let all = unified.rows();
    let keep_where = |metric: Metric| -> Vec<Arc<Record>> {
        all.iter()
            .filter(|r| !r.metrics[metric].is_nan())
            .cloned()
            .collect()
    };

    let views = [
        View::new(ViewKind::Table, all.to_vec()),
        View::new(ViewKind::Usage, keep_where(Metric::SourceEui)),
        View::new(ViewKind::Emission, keep_where(Metric::TotalGhg)),
        View::new(ViewKind::Totals, all.to_vec()),
        View::new(ViewKind::Intensity, all.to_vec()),
        View::new(ViewKind::Recent, most_recent(all)),
    ];

    for v in &views {
        tracing::debug!(view = %v.kind(), rows = v.len(), "projected view");
    }

    views.into_iter().map(|v| (v.kind(), v)).collect()
}

/// One row per property: the highest period tag wins, earlier input wins ties.
pub fn most_recent(rows: &[Arc<Record>]) -> Vec<Arc<Record>> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut latest: Vec<Arc<Record>> = Vec::new();

    for row in rows {
        match index.get(&row.building.property_id) {
            Some(&slot) => {
                if row.period.tag() > latest[slot].period.tag() {
                    latest[slot] = row.clone();
                }
            }
            None => {
                index.insert(row.building.property_id, latest.len());
                latest.push(row.clone());
            }
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Period,
        table::{materialize, unified::tests::record},
    };

    fn names(kind: ViewKind) -> Vec<&'static str> {
        kind.columns().iter().map(|c| c.name()).collect()
    }

    #[test]
    fn usage_view_drops_rows_without_source_eui() {
        let unified = materialize(vec![
            record(1, "MANHATTAN", 2016, &[(Metric::SourceEui, 80.0)]),
            record(2, "BRONX", 2016, &[(Metric::SiteEui, 10.0)]),
        ]);
        let views = project(&unified);
        let usage = &views[&ViewKind::Usage];
        // building 2 has no concrete EUI and a NaN mean; its zero total is kept
        assert!(usage
            .rows()
            .iter()
            .all(|r| r.building.property_id == 1 || r.period == Period::Total));
        assert_eq!(usage.len(), 3 + 1);
        assert_eq!(views[&ViewKind::Table].len(), unified.len());
    }

    #[test]
    fn emission_view_drops_rows_without_total_ghg() {
        let unified = materialize(vec![
            record(1, "MANHATTAN", 2016, &[(Metric::TotalGhg, 3.0)]),
            record(1, "MANHATTAN", 2017, &[]),
        ]);
        let views = project(&unified);
        let periods: Vec<Period> =
            views[&ViewKind::Emission].rows().iter().map(|r| r.period).collect();
        assert_eq!(periods, vec![Period::Year(2016), Period::Total, Period::Mean]);
    }

    #[test]
    fn view_columns() {
        let usage = names(ViewKind::Usage);
        assert_eq!(
            &usage[..5],
            &["Property Id", "Property Name", "Year Ending", "Latitude", "Longitude"]
        );
        assert_eq!(usage.len(), 5 + 18 + 5);
        assert_eq!(names(ViewKind::Emission).len(), 5 + 8 + 5);
        assert_eq!(names(ViewKind::Totals).len(), 3 + 13 + 5);
        assert_eq!(names(ViewKind::Intensity).len(), 3 + 13 + 5);
        assert_eq!(names(ViewKind::Table).len(), 16 + 1 + 27);
        assert!(!names(ViewKind::Totals).contains(&"Source EUI (kBtu/ft²)"));
    }

    #[test]
    fn most_recent_picks_highest_tag_per_property() {
        let unified = materialize(vec![
            record(1, "MANHATTAN", 2018, &[(Metric::SourceEui, 1.0)]),
            record(1, "MANHATTAN", 2020, &[(Metric::SourceEui, 2.0)]),
            record(2, "BRONX", 2016, &[]),
        ]);
        let recent = most_recent(unified.rows());
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].period, Period::Year(2020));
        assert_eq!(recent[0].metrics[Metric::SourceEui], 2.0);
        assert_eq!(recent[1].period, Period::Year(2016));
    }

    #[test]
    fn most_recent_ties_keep_input_order() {
        let mut first = record(1, "MANHATTAN", 2019, &[(Metric::SourceEui, 1.0)]);
        first.building.property_name = "first".into();
        let mut second = record(1, "MANHATTAN", 2019, &[(Metric::SourceEui, 2.0)]);
        second.building.property_name = "second".into();
        let rows = vec![Arc::new(first), Arc::new(second)];
        let recent = most_recent(&rows);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].building.property_name, "first");
    }

    #[test]
    fn resolve_rejects_columns_outside_the_view() {
        let view = View::new(ViewKind::Totals, Vec::new());
        assert!(view.resolve("Borough").is_ok());
        let err = view.resolve("Source EUI (kBtu/ft²)").unwrap_err();
        assert!(matches!(err, QueryError::UnknownColumn { .. }));
        assert!(view.resolve("Nope").is_err());
    }

    #[test]
    fn view_names_parse() {
        assert_eq!("recent".parse::<ViewKind>().unwrap(), ViewKind::Recent);
        assert!("bogus".parse::<ViewKind>().is_err());
    }
}
