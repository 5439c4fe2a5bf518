pub mod executor;
pub mod filter;
pub mod rollup;

pub use executor::{
    select, CategoryFilter, SortDirection, SortKey, TablePage, TableRequest, DEFAULT_PAGE_SIZE,
};
pub use filter::{parse_clause, Clause, CompiledFilter, FilterQuery, Operator, CLAUSE_DELIMITER};
pub use rollup::{
    category_values, resolve_metrics, rollup_by_category, source_breakdown, summarize, trend,
    Aggregation, BreakdownPoint, CategoryGroup, Summary, TrendPoint,
};

use crate::table::ViewKind;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("unknown column '{column}' for view '{view}'")]
    UnknownColumn { column: String, view: ViewKind },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
