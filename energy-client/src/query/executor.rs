use std::{cmp::Ordering, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    domain::{Category, Column, Literal, Period, Record},
    query::{FilterQuery, Operator, QueryError},
    table::View,
};

pub const DEFAULT_PAGE_SIZE: usize = 10;

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One entry of the table's sort specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub column_id: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Equality filter on one category dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFilter {
    pub dimension: Category,
    pub value: Literal,
}

impl CategoryFilter {
    fn matches(&self, record: &Record) -> bool {
        Operator::Eq.evaluate(&record.value(self.dimension.into()), &self.value)
    }
}

/// A paginated table query against one view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRequest {
    #[serde(default = "Period::all")]
    pub periods: Vec<Period>,
    #[serde(default)]
    pub category: Option<CategoryFilter>,
    #[serde(default)]
    pub filter_query: String,
    #[serde(default)]
    pub sort_by: Vec<SortKey>,
    #[serde(default)]
    pub page_current: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for TableRequest {
    fn default() -> Self {
        Self {
            periods: Period::all(),
            category: None,
            filter_query: String::new(),
            sort_by: Vec::new(),
            page_current: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of rows. No total count is reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePage {
    pub title: String,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Rows of `view` whose period is in `periods` and, if given, whose category
/// value equals the filter value. View order is preserved.
pub fn select(
    view: &View,
    periods: &[Period],
    category: Option<&CategoryFilter>,
) -> Vec<Arc<Record>> {
    view.rows()
        .iter()
        .filter(|r| periods.contains(&r.period))
        .filter(|r| category.map_or(true, |c| c.matches(r)))
        .cloned()
        .collect()
}

fn compare(a: &Record, b: &Record, keys: &[(Column, SortDirection)]) -> Ordering {
    for (column, direction) in keys {
        let (x, y) = (a.value(*column), b.value(*column));
        // missing values sink to the bottom in both directions
        let ord = match (x.is_missing(), y.is_missing()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match direction {
                SortDirection::Asc => x.cmp_present(&y),
                SortDirection::Desc => x.cmp_present(&y).reverse(),
            },
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl TableRequest {
    /// Title naming the first selected period and the category filter.
    pub fn title(&self, heading: &str) -> String {
        let mut title = heading.to_string();
        if let Some(period) = self.periods.first() {
            title.push_str(&format!(" for {}", period.label()));
        }
        if let Some(c) = &self.category {
            title.push_str(&format!(" ({}: {})", c.dimension.name(), c.value));
        }
        title
    }

    /// Filter by period and category, apply the filter query, sort, then cut
    /// out the requested page. A page past the end is empty.
    pub fn execute(&self, view: &View, heading: &str) -> Result<TablePage, QueryError> {
        if self.page_size == 0 {
            return Err(QueryError::InvalidRequest("page_size must be positive".to_string()));
        }

        let keys = self
            .sort_by
            .iter()
            .map(|k| Ok((view.resolve(&k.column_id)?, k.direction)))
            .collect::<Result<Vec<_>, QueryError>>()?;
        let filter = FilterQuery::parse(&self.filter_query).compile(view)?;

        let mut rows = select(view, &self.periods, self.category.as_ref());
        rows = filter.apply(rows);
        if !keys.is_empty() {
            rows.sort_by(|a, b| compare(a, b, &keys));
        }

        let start = self.page_current.saturating_mul(self.page_size);
        let page: Vec<_> = rows
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|r| view.to_json_row(r))
            .collect();

        tracing::debug!(
            view = %view.kind(),
            matched = rows.len(),
            returned = page.len(),
            page = self.page_current,
            "table query executed"
        );

        Ok(TablePage {
            title: self.title(heading),
            rows: page,
        })
    }
}
