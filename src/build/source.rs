//! Source file discovery and CSV access

use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Column holding the brand display name
pub const NAME_COLUMN: &str = "Brand name";
/// Column holding the source's own brand identifier
pub const SOURCE_ID_COLUMN: &str = "Brand ID";
/// Column holding the brand category
pub const CATEGORY_COLUMN: &str = "Category";
/// Metric columns every file must carry
pub const KEY_METRIC_COLUMNS: [&str; 2] = ["Total_Users_pct", "Total_Prefer_pct"];

/// Columns whose absence makes a file unusable
pub fn required_columns() -> Vec<&'static str> {
    let mut columns = vec![NAME_COLUMN, SOURCE_ID_COLUMN, CATEGORY_COLUMN];
    columns.extend(KEY_METRIC_COLUMNS);
    columns
}

/// Source files directly inside `dir`, sorted by file name
pub fn discover_sources(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_source_file(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect()
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("csv") || e.eq_ignore_ascii_case("tsv"))
}

/// Field delimiter for a source file
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// Open a CSV/TSV reader over a source file
pub fn open_reader(path: &Path) -> std::io::Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter_for(path))
        .from_reader(BufReader::new(file)))
}

/// Case-insensitive map from header name to column index
#[derive(Debug, Default)]
pub struct HeaderMap {
    columns: HashMap<String, usize>,
}

impl HeaderMap {
    pub fn new(headers: &StringRecord) -> Self {
        let mut columns = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            // Repeated headers: the first column wins
            columns.entry(h.trim().to_lowercase()).or_insert(i);
        }
        Self { columns }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(&column.trim().to_lowercase())
    }

    /// Required columns that are absent
    pub fn missing<'c>(&self, required: &[&'c str]) -> Vec<&'c str> {
        required
            .iter()
            .copied()
            .filter(|c| !self.contains(c))
            .collect()
    }

    /// Raw cell text, `None` if the column is absent or the cell is blank
    pub fn get<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.columns
            .get(&column.trim().to_lowercase())
            .and_then(|&idx| record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
