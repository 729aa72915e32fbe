//! Snapshot builder - the offline half of the pipeline
//!
//! Turns each quarterly source file into a period document by linking its
//! rows to the registry by name, then writes the period index. A bad file is
//! reported and skipped; it never stops the run.

mod report;
mod source;

use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::document::{self, PeriodDocument, PeriodIndex, SnapshotRecord};
use crate::core::matcher::{self, NameIndex};
use crate::core::period::PeriodKey;
use crate::core::registry::Registry;
use crate::metrics::{parse_metrics, MetricKind};

pub use report::{BuildError, BuildReport, BuildWarning, FileOutcome, FileReport, RunError};
pub use source::{
    discover_sources, required_columns, HeaderMap, CATEGORY_COLUMN, KEY_METRIC_COLUMNS,
    NAME_COLUMN, SOURCE_ID_COLUMN,
};

/// Options controlling a build run
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory of source files
    pub sources_dir: PathBuf,
    /// Data root; documents land in `<data_dir>/quarters/`
    pub data_dir: PathBuf,
    /// Files above this size produce a warning
    pub large_file_bytes: u64,
    /// Parse and match without writing anything
    pub dry_run: bool,
}

/// A parsed source file, not yet written
#[derive(Debug, Clone)]
pub struct FileBuild {
    pub document: PeriodDocument,
    pub warnings: Vec<BuildWarning>,
}

/// Builds period documents against one registry snapshot
pub struct SnapshotBuilder<'a> {
    names: NameIndex<'a>,
    options: BuildOptions,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(registry: &'a Registry, options: BuildOptions) -> Self {
        Self {
            names: NameIndex::new(registry),
            options,
        }
    }

    /// Build every discovered source file, then write the index
    pub fn run(&self) -> Result<BuildReport, RunError> {
        if !self.options.sources_dir.is_dir() {
            return Err(RunError::SourcesNotFound(
                self.options.sources_dir.display().to_string(),
            ));
        }

        for (name, shadowed) in self.names.collisions() {
            tracing::warn!(
                name = %name,
                shadowed_ids = %shadowed.join(","),
                "registry names collide; first entry wins"
            );
        }

        let sources = discover_sources(&self.options.sources_dir);
        tracing::info!(
            files = sources.len(),
            dir = %self.options.sources_dir.display(),
            "building period documents"
        );

        let mut report = BuildReport {
            dry_run: self.options.dry_run,
            ..Default::default()
        };
        let mut indexed: BTreeMap<PeriodKey, String> = BTreeMap::new();

        for path in &sources {
            let file = file_name(path);
            let outcome = match self.build_file(path).and_then(|built| self.write(path, built)) {
                Ok(built) => {
                    let doc = &built.document;
                    let is_indexed = !doc.period_key.is_unknown();
                    if is_indexed {
                        if let Some(previous) = indexed.insert(doc.period_key.clone(), file.clone()) {
                            tracing::warn!(
                                period = %doc.period_key,
                                replaced = %previous,
                                by = %file,
                                "period built from more than one file; later file wins"
                            );
                        }
                    } else {
                        tracing::warn!(file = %file, "no YYYYQ# token in file name; not indexed");
                    }

                    report.total_rows += doc.total_row_count;
                    report.matched_rows += doc.matched_count;
                    report.unmatched_names += doc.unmatched_names.len();

                    FileOutcome::Written {
                        period_key: doc.period_key.clone(),
                        indexed: is_indexed,
                        total_row_count: doc.total_row_count,
                        matched_count: doc.matched_count,
                        unmatched_count: doc.unmatched_names.len(),
                        warnings: built.warnings,
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %file, error = %e, "skipping source file");
                    FileOutcome::Skipped {
                        reason: e.to_string(),
                    }
                }
            };
            report.files.push(FileReport { file, outcome });
        }

        let index = PeriodIndex::new(indexed, Utc::now());
        report.periods = index.periods.clone();

        if !self.options.dry_run {
            let path = self.options.data_dir.join(document::index_path());
            write_json(&path, &index).map_err(|e| RunError::IndexWrite {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        tracing::info!(
            written = report.files_written(),
            skipped = report.files_skipped(),
            periods = report.periods.len(),
            match_rate = %format!("{:.1}%", report.match_rate() * 100.0),
            "build finished"
        );

        Ok(report)
    }

    /// Parse and match one source file without writing anything
    pub fn build_file(&self, path: &Path) -> Result<FileBuild, BuildError> {
        let file = file_name(path);
        let period_key = PeriodKey::from_filename(&file).unwrap_or_else(PeriodKey::unknown);
        let mut warnings = Vec::new();

        let metadata = fs::metadata(path).map_err(|e| BuildError::Unreadable {
            file: file.clone(),
            reason: e.to_string(),
        })?;
        if metadata.len() == 0 {
            return Err(BuildError::EmptyFile { file });
        }
        if metadata.len() > self.options.large_file_bytes {
            warnings.push(BuildWarning::LargeFile {
                bytes: metadata.len(),
                threshold: self.options.large_file_bytes,
            });
        }

        let unreadable = |e: &dyn std::fmt::Display| BuildError::Unreadable {
            file: file.clone(),
            reason: e.to_string(),
        };
        let mut rdr = source::open_reader(path).map_err(|e| unreadable(&e))?;
        let headers = HeaderMap::new(rdr.headers().map_err(|e| unreadable(&e))?);

        let missing = headers.missing(&required_columns());
        if !missing.is_empty() {
            return Err(BuildError::MissingColumns {
                file,
                columns: missing.into_iter().map(String::from).collect(),
            });
        }

        let mut total_row_count = 0;
        let mut records = Vec::new();
        let mut unmatched_names: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();
        let mut duplicate_rows = 0;

        for (row_idx, result) in rdr.records().enumerate() {
            let row = row_idx + 2; // 1-indexed plus header row
            total_row_count += 1;

            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warnings.push(BuildWarning::RowParse {
                        row,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let Some(name) = headers.get(&record, NAME_COLUMN) else {
                continue;
            };

            let normalized = matcher::normalize(name);
            if !seen.insert(normalized) {
                duplicate_rows += 1;
                if !duplicates.iter().any(|d| matcher::matches(d, name)) {
                    duplicates.push(name.to_string());
                }
                continue;
            }

            let metrics = parse_metrics(|column| headers.get(&record, column));

            for (column, value) in metrics.values() {
                if let Some(value) = value {
                    if column.kind == MetricKind::Percent && !column.kind.in_range(value) {
                        warnings.push(BuildWarning::OutOfRange {
                            row,
                            brand: name.to_string(),
                            column: column.name.to_string(),
                            value,
                        });
                    }
                }
            }

            match self.names.find(name) {
                Some(brand) => records.push(SnapshotRecord {
                    entity_id: brand.id.clone(),
                    entity_name_as_matched: name.to_string(),
                    source_entity_id: headers
                        .get(&record, SOURCE_ID_COLUMN)
                        .unwrap_or_default()
                        .to_string(),
                    source_category: headers
                        .get(&record, CATEGORY_COLUMN)
                        .unwrap_or_default()
                        .to_string(),
                    metrics,
                }),
                None => unmatched_names.push(name.to_string()),
            }
        }

        if !duplicates.is_empty() {
            warnings.push(BuildWarning::DuplicateNames {
                names: duplicates,
                extra_rows: duplicate_rows,
            });
        }

        for warning in &warnings {
            tracing::warn!(file = %file, "{}", warning);
        }

        let document = PeriodDocument {
            period_key,
            source_file_name: file,
            generated_at: Utc::now(),
            total_row_count,
            matched_count: records.len(),
            unmatched_names,
            records,
        };

        tracing::debug!(
            file = %document.source_file_name,
            period = %document.period_key,
            rows = document.total_row_count,
            matched = document.matched_count,
            "parsed source file"
        );

        Ok(FileBuild { document, warnings })
    }

    fn write(&self, source: &Path, built: FileBuild) -> Result<FileBuild, BuildError> {
        if self.options.dry_run {
            return Ok(built);
        }

        let relative = if built.document.period_key.is_unknown() {
            document::unknown_document_path(&file_name(source))
        } else {
            document::document_path(&built.document.period_key)
        };

        let path = self.options.data_dir.join(relative);
        write_json(&path, &built.document).map_err(|e| BuildError::Write {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(built)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)
}
