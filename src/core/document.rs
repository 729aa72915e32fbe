//! Period documents and the period index
//!
//! These are the build artifacts handed from the offline builder to the
//! online store. Both are plain JSON at well-known relative paths:
//!
//! - `quarters/<PERIOD>.json` for each period document
//! - `quarters/index.json` for the index
//! - `quarters/unknown/<file-name>.json` for files with no period token

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::period::PeriodKey;
use crate::core::registry::BrandId;
use crate::metrics::MetricRecord;

/// Directory (relative to the data root) holding all build artifacts
pub const QUARTERS_DIR: &str = "quarters";

/// Index file name inside [`QUARTERS_DIR`]
pub const INDEX_FILE: &str = "index.json";

/// Relative path of a period's document
pub fn document_path(period: &PeriodKey) -> String {
    format!("{}/{}.json", QUARTERS_DIR, period.as_str().to_uppercase())
}

/// Relative path of the period index
pub fn index_path() -> String {
    format!("{}/{}", QUARTERS_DIR, INDEX_FILE)
}

/// Relative path used for inspection copies of unindexable files
///
/// Keyed by the full source file name, so two sources in one directory never
/// share a path.
pub fn unknown_document_path(source_file_name: &str) -> String {
    let name: String = source_file_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
        .collect();
    format!("{}/unknown/{}.json", QUARTERS_DIR, name)
}

/// One matched source row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub entity_id: BrandId,
    /// Brand name text as it appeared in the source row
    pub entity_name_as_matched: String,
    pub source_entity_id: String,
    pub source_category: String,
    pub metrics: MetricRecord,
}

/// Everything extracted from one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDocument {
    pub period_key: PeriodKey,
    #[serde(default)]
    pub source_file_name: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub total_row_count: usize,
    #[serde(default)]
    pub matched_count: usize,
    #[serde(default)]
    pub unmatched_names: Vec<String>,
    pub records: Vec<SnapshotRecord>,
}

impl PeriodDocument {
    /// The record for a brand, if it appears in this period
    pub fn record_for(&self, id: &BrandId) -> Option<&SnapshotRecord> {
        self.records.iter().find(|r| &r.entity_id == id)
    }

    /// Brand ids present in this period, in record order
    pub fn entity_ids(&self) -> Vec<BrandId> {
        self.records.iter().map(|r| r.entity_id.clone()).collect()
    }

    /// `matchedCount == records.len() <= totalRowCount`
    pub fn is_consistent(&self) -> bool {
        self.matched_count == self.records.len() && self.records.len() <= self.total_row_count
    }
}

/// Master list of queryable periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodIndex {
    /// Sorted ascending, unique, never contains the unknown sentinel
    pub periods: Vec<PeriodKey>,
    #[serde(default)]
    pub period_source_files: BTreeMap<PeriodKey, String>,
    pub generated_at: DateTime<Utc>,
}

impl PeriodIndex {
    /// Build an index from period → source file pairs
    ///
    /// Unknown and malformed keys are dropped; ordering comes from the map.
    pub fn new(sources: BTreeMap<PeriodKey, String>, generated_at: DateTime<Utc>) -> Self {
        let period_source_files: BTreeMap<PeriodKey, String> = sources
            .into_iter()
            .filter(|(k, _)| !k.is_unknown() && k.is_well_formed())
            .collect();
        Self {
            periods: period_source_files.keys().cloned().collect(),
            period_source_files,
            generated_at,
        }
    }

    pub fn contains(&self, period: &PeriodKey) -> bool {
        self.periods.binary_search(period).is_ok()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> PeriodKey {
        PeriodKey::normalize(s)
    }

    #[test]
    fn test_paths() {
        assert_eq!(document_path(&key("2010q1")), "quarters/2010Q1.json");
        assert_eq!(index_path(), "quarters/index.json");
        assert_eq!(
            unknown_document_path("brands latest (v2).csv"),
            "quarters/unknown/brands latest (v2).csv.json"
        );
    }

    #[test]
    fn test_unknown_paths_do_not_collide() {
        let paths: std::collections::HashSet<String> = ["a b.csv", "a_b.csv", "a_b.tsv"]
            .into_iter()
            .map(unknown_document_path)
            .collect();
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn test_index_sorts_and_drops_unknown() {
        let mut sources = BTreeMap::new();
        sources.insert(key("2010Q4"), "d.csv".to_string());
        sources.insert(key("2010Q1"), "a.csv".to_string());
        sources.insert(PeriodKey::unknown(), "x.csv".to_string());

        let index = PeriodIndex::new(sources, Utc::now());
        assert_eq!(index.periods, vec![key("2010Q1"), key("2010Q4")]);
        assert!(!index.period_source_files.contains_key(&PeriodKey::unknown()));
        assert!(index.contains(&key("2010Q4")));
        assert!(!index.contains(&key("2010Q2")));
    }

    #[test]
    fn test_document_json_shape() {
        let doc = PeriodDocument {
            period_key: key("2010Q1"),
            source_file_name: "tracker_2010Q1.csv".to_string(),
            generated_at: Utc::now(),
            total_row_count: 3,
            matched_count: 1,
            unmatched_names: vec!["Globex".to_string()],
            records: vec![SnapshotRecord {
                entity_id: BrandId::new("7"),
                entity_name_as_matched: "7UP".to_string(),
                source_entity_id: "1001".to_string(),
                source_category: "Beverages".to_string(),
                metrics: MetricRecord::default(),
            }],
        };
        assert!(doc.is_consistent());

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["periodKey"], "2010Q1");
        assert_eq!(json["matchedCount"], 1);
        assert_eq!(json["records"][0]["entityId"], "7");
        assert_eq!(json["records"][0]["sourceCategory"], "Beverages");
        assert!(json["records"][0]["metrics"]["Total_Users_pct"].is_null());
    }

    #[test]
    fn test_record_lookup() {
        let doc: PeriodDocument = serde_json::from_str(
            r#"{
                "periodKey": "2010Q1",
                "generatedAt": "2024-01-01T00:00:00Z",
                "records": [
                    {"entityId": "7", "entityNameAsMatched": "7UP", "sourceEntityId": "1",
                     "sourceCategory": "Beverages", "metrics": {"Total_Users_pct": 61.18}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(
            doc.record_for(&BrandId::new("7")).unwrap().metrics.total_users_pct,
            Some(61.18)
        );
        assert!(doc.record_for(&BrandId::new("8")).is_none());
        assert_eq!(doc.entity_ids(), vec![BrandId::new("7")]);
    }
}
