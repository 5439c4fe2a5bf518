pub mod benchmark;
pub mod building;
pub mod metric;
pub mod period;
pub mod value;

pub use benchmark::BenchmarkRecord;
pub use building::{Attribute, Building, BuildingKey, Category, Column, Record, YEAR_ENDING};
pub use metric::{Metric, MetricKind, Metrics, METRIC_COUNT};
pub use period::{Period, CONCRETE_YEARS, MEAN_TAG, TOTAL_TAG};
pub use value::{format_number, Literal, Value};
