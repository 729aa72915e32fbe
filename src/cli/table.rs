//! Table output for CLI commands
//!
//! Commands build a [`Table`] of typed cells once and render it in whichever
//! format was requested. Human output goes through `tabled`; TSV and ID
//! output stay plain so they pipe cleanly.

use tabled::{builder::Builder, settings::Style};

use crate::cli::OutputFormat;
use crate::core::period::PeriodKey;
use crate::metrics::{MetricColumn, METRIC_COLUMNS};

/// Columns shown when a command is not told which metrics to display
pub const DEFAULT_METRICS: [&str; 4] = [
    "Total_Users_pct",
    "Total_Prefer_pct",
    "Total_Consider_pct",
    "Total_Index_C",
];

/// A typed cell value
#[derive(Debug, Clone)]
pub enum CellValue {
    Text(String),
    Period(PeriodKey),
    /// A metric value rendered with its unit
    Metric(&'static MetricColumn, Option<f64>),
    Number(usize),
    /// A ratio already scaled to 0..=100
    Percent(f64),
    Empty,
}

impl CellValue {
    /// Human-readable form
    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Period(p) => p.to_string(),
            CellValue::Metric(column, value) => column.kind.format(*value),
            CellValue::Number(n) => n.to_string(),
            CellValue::Percent(p) => format!("{:.1}%", p),
            CellValue::Empty => "-".to_string(),
        }
    }

    /// Unformatted value for TSV; absent values are empty
    pub fn raw(&self) -> String {
        match self {
            CellValue::Metric(_, value) => value.map(|v| v.to_string()).unwrap_or_default(),
            CellValue::Percent(p) => format!("{:.2}", p),
            CellValue::Empty => String::new(),
            other => other.display().replace('\t', " "),
        }
    }

    /// Markdown-safe form
    pub fn format_md(&self) -> String {
        self.display().replace('|', "\\|")
    }
}

/// Rows of typed cells under a header
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render in the requested format (JSON is handled by the caller)
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Tsv => self.render_tsv(),
            OutputFormat::Id => self
                .rows
                .iter()
                .filter_map(|r| r.first())
                .map(|c| c.raw())
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Md => self.render_tabled(CellValue::format_md, true),
            OutputFormat::Auto | OutputFormat::Json => self.render_tabled(CellValue::display, false),
        }
    }

    fn render_tsv(&self) -> String {
        let mut lines = vec![self.headers.join("\t")];
        lines.extend(
            self.rows
                .iter()
                .map(|r| r.iter().map(CellValue::raw).collect::<Vec<_>>().join("\t")),
        );
        lines.join("\n")
    }

    fn render_tabled(&self, cell: fn(&CellValue) -> String, markdown: bool) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers.clone());
        for row in &self.rows {
            builder.push_record(row.iter().map(cell));
        }
        let mut table = builder.build();
        if markdown {
            table.with(Style::markdown());
        } else {
            table.with(Style::rounded());
        }
        table.to_string()
    }
}

/// Resolve `--metric` arguments to schema columns
///
/// An empty selection means [`DEFAULT_METRICS`]; `all` selects every column.
pub fn select_metrics(requested: &[String]) -> Result<Vec<&'static MetricColumn>, String> {
    if requested.iter().any(|r| r.eq_ignore_ascii_case("all")) {
        return Ok(METRIC_COLUMNS.iter().collect());
    }
    let names: Vec<&str> = if requested.is_empty() {
        DEFAULT_METRICS.to_vec()
    } else {
        requested.iter().map(String::as_str).collect()
    };

    names
        .into_iter()
        .map(|name| MetricColumn::find(name).ok_or_else(|| format!("unknown metric column: {}", name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> &'static MetricColumn {
        MetricColumn::find(name).unwrap()
    }

    fn sample() -> Table {
        let mut table = Table::new(["Period", "Total_Users_pct"]);
        table.push(vec![
            CellValue::Period(PeriodKey::normalize("2010Q1")),
            CellValue::Metric(column("Total_Users_pct"), Some(61.18)),
        ]);
        table.push(vec![
            CellValue::Period(PeriodKey::normalize("2010Q2")),
            CellValue::Metric(column("Total_Users_pct"), None),
        ]);
        table
    }

    #[test]
    fn test_tsv_is_raw() {
        assert_eq!(
            sample().render(OutputFormat::Tsv),
            "Period\tTotal_Users_pct\n2010Q1\t61.18\n2010Q2\t"
        );
    }

    #[test]
    fn test_auto_shows_units_and_dashes() {
        let out = sample().render(OutputFormat::Auto);
        assert!(out.contains("61.18%"));
        assert!(out.contains(" - "));
    }

    #[test]
    fn test_id_lists_first_column() {
        assert_eq!(sample().render(OutputFormat::Id), "2010Q1\n2010Q2");
    }

    #[test]
    fn test_select_metrics() {
        assert_eq!(select_metrics(&[]).unwrap().len(), DEFAULT_METRICS.len());
        assert_eq!(select_metrics(&["all".to_string()]).unwrap().len(), 85);
        let picked = select_metrics(&["female_buzz_pct".to_string()]).unwrap();
        assert_eq!(picked[0].name, "Female_Buzz_pct");
        assert!(select_metrics(&["Total_Nope_pct".to_string()]).is_err());
    }
}
