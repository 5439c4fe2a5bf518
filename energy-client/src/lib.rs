//! Aggregation and query engine for the building energy benchmarking
//! dashboard: Total/Mean rollups, per-purpose views, and paginated,
//! filtered, sorted table queries.

pub mod domain;
pub mod query;
pub mod table;

pub use query::{QueryError, TablePage, TableRequest};
pub use table::{Dataset, View, ViewKind};
