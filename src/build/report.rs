//! Build outcomes: warnings, per-file results and the run summary

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::core::period::PeriodKey;

/// Non-fatal finding while building one file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BuildWarning {
    /// File exceeds the configured size threshold
    LargeFile { bytes: u64, threshold: u64 },
    /// A percentage metric outside [0, 100]
    #[serde(rename_all = "camelCase")]
    OutOfRange { row: usize, brand: String, column: String, value: f64 },
    /// Names that appeared more than once; only their first row was used
    #[serde(rename_all = "camelCase")]
    DuplicateNames { names: Vec<String>, extra_rows: usize },
    /// A row the CSV reader could not decode
    RowParse { row: usize, message: String },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::LargeFile { bytes, threshold } => {
                write!(f, "large file: {} bytes (threshold {})", bytes, threshold)
            }
            BuildWarning::OutOfRange {
                row,
                brand,
                column,
                value,
            } => write!(
                f,
                "row {}: {} = {} for '{}' is outside [0, 100]",
                row, column, value, brand
            ),
            BuildWarning::DuplicateNames { names, extra_rows } => write!(
                f,
                "{} duplicate row(s) ignored for: {}",
                extra_rows,
                names.join(", ")
            ),
            BuildWarning::RowParse { row, message } => {
                write!(f, "row {}: unreadable row skipped: {}", row, message)
            }
        }
    }
}

/// Reasons a single source file is skipped
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("cannot read {file}: {reason}")]
    Unreadable { file: String, reason: String },

    #[error("{file} is empty")]
    EmptyFile { file: String },

    #[error("{file} is missing required column(s): {}", .columns.join(", "))]
    MissingColumns { file: String, columns: Vec<String> },

    #[error("cannot write {path}: {reason}")]
    Write { path: String, reason: String },
}

/// Errors that stop a whole build run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("sources directory not found: {0}")]
    SourcesNotFound(String),

    #[error("cannot write period index {path}: {reason}")]
    IndexWrite { path: String, reason: String },
}

/// What happened to one source file
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FileOutcome {
    #[serde(rename_all = "camelCase")]
    Written {
        period_key: PeriodKey,
        indexed: bool,
        total_row_count: usize,
        matched_count: usize,
        unmatched_count: usize,
        warnings: Vec<BuildWarning>,
    },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Summary of a build run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub dry_run: bool,
    pub files: Vec<FileReport>,
    /// Periods written to the index
    pub periods: Vec<PeriodKey>,
    pub total_rows: usize,
    pub matched_rows: usize,
    pub unmatched_names: usize,
}

impl BuildReport {
    pub fn files_written(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Written { .. }))
            .count()
    }

    pub fn files_skipped(&self) -> usize {
        self.files.len() - self.files_written()
    }

    pub fn warning_count(&self) -> usize {
        self.files
            .iter()
            .map(|f| match &f.outcome {
                FileOutcome::Written { warnings, .. } => warnings.len(),
                FileOutcome::Skipped { .. } => 0,
            })
            .sum()
    }

    /// Matched rows over total rows across all written files
    pub fn match_rate(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            self.matched_rows as f64 / self.total_rows as f64
        }
    }
}
