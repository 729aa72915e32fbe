//! Metric schema and row parsing

mod parse;
mod schema;

pub use parse::{parse_metrics, parse_row, parse_value};
pub use schema::{MetricColumn, MetricKind, MetricRecord, METRIC_COLUMNS};
