//! Raw cell text to typed metric values
//!
//! Parsing never fails: blank and malformed cells both become `None` so a
//! single bad cell cannot sink a snapshot. Range checks happen later, in the
//! snapshot builder, as warnings.

use std::collections::HashMap;

use super::schema::{MetricColumn, MetricRecord};

/// Parse one cell
///
/// Accepts an optional trailing `%`. Non-finite numbers are treated as
/// malformed.
pub fn parse_value(raw: &str) -> Option<f64> {
    let text = raw.trim();
    let text = text.strip_suffix('%').map(str::trim_end).unwrap_or(text);
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse every metric column using `cell` to fetch raw text by column name
pub fn parse_metrics<'r>(cell: impl Fn(&'static str) -> Option<&'r str>) -> MetricRecord {
    MetricRecord::from_lookup(|column: &'static MetricColumn| {
        cell(column.name).and_then(parse_value)
    })
}

/// Parse a row given as a column-name to raw-text mapping
///
/// Column names are matched ignoring case and surrounding whitespace.
pub fn parse_row(row: &HashMap<String, String>) -> MetricRecord {
    let normalized: HashMap<String, &str> = row
        .iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v.as_str()))
        .collect();
    parse_metrics(|name| normalized.get(&name.to_lowercase()).copied())
}
