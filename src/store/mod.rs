//! Period store - read-through cache over built documents
//!
//! Each period key moves through `not requested -> loading -> cached`, or
//! back to not requested on error so a later call retries. Concurrent
//! requests for a key that is still loading share one fetch.

pub mod flight;
#[cfg(test)]
mod memory;
mod source;
mod stats;

use futures_util::future::try_join_all;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::core::document::{self, PeriodDocument, PeriodIndex};
use crate::core::period::PeriodKey;
use flight::{Flights, Joined};

#[cfg(feature = "http")]
pub use source::HttpSource;
pub use source::{DocumentSource, FsSource};
#[cfg(test)]
pub(crate) use memory::MemorySource;
pub use stats::LoadStats;
use stats::Telemetry;

/// Store errors
///
/// `Clone` so one failed fetch can be handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("no document at {path}")]
    NotFound { path: String },

    #[error("invalid document {path}: {reason}")]
    InvalidDocument { path: String, reason: String },

    #[error("invalid period index {path}: {reason}")]
    InvalidIndex { path: String, reason: String },

    #[error("failed to fetch {path}: {message}")]
    Fetch { path: String, message: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Cached access to the period index and period documents
#[derive(Clone)]
pub struct PeriodStore {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn DocumentSource>,
    slow_threshold: Duration,
    documents: RwLock<HashMap<PeriodKey, Arc<PeriodDocument>>>,
    index: RwLock<Option<Arc<PeriodIndex>>>,
    period_flights: Arc<Flights<PeriodKey, Arc<PeriodDocument>>>,
    index_flight: Arc<Flights<(), Arc<PeriodIndex>>>,
    telemetry: Telemetry,
}

impl PeriodStore {
    pub fn new(source: Arc<dyn DocumentSource>, slow_threshold: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                slow_threshold,
                documents: RwLock::new(HashMap::new()),
                index: RwLock::new(None),
                period_flights: Flights::new(),
                index_flight: Flights::new(),
                telemetry: Telemetry::default(),
            }),
        }
    }

    /// Store over a local data directory
    pub fn open_dir(data_dir: impl Into<std::path::PathBuf>, slow_threshold: Duration) -> Self {
        Self::new(Arc::new(FsSource::new(data_dir)), slow_threshold)
    }

    /// Where documents are read from
    pub fn describe(&self) -> String {
        self.inner.source.describe()
    }

    /// Load the period index
    pub async fn load_index(&self) -> Result<Arc<PeriodIndex>, StoreError> {
        let inner = &self.inner;
        inner.telemetry.request();

        let cached = inner.index.read().clone();
        if let Some(index) = cached {
            inner.telemetry.hit();
            return Ok(index);
        }

        let task = Arc::clone(inner);
        let joined = inner.index_flight.join_or_start(
            &(),
            || inner.index.read().clone(),
            move || task.fetch_index(),
        );
        self.await_joined(joined).await
    }

    /// Load one period document
    pub async fn load_period(&self, key: &PeriodKey) -> Result<Arc<PeriodDocument>, StoreError> {
        let inner = &self.inner;
        let key = PeriodKey::normalize(key.as_str());
        inner.telemetry.request();

        if let Some(doc) = inner.cached(&key) {
            inner.telemetry.hit();
            return Ok(doc);
        }

        let task = Arc::clone(inner);
        let load_key = key.clone();
        let joined = inner.period_flights.join_or_start(
            &key,
            || inner.cached(&key),
            move || task.fetch_period(load_key),
        );
        self.await_joined(joined).await
    }

    /// Load several periods in parallel
    ///
    /// All or nothing: the first failure fails the whole call. Keys are
    /// normalized; the result is ordered by key regardless of completion order.
    pub async fn load_periods(
        &self,
        keys: &[PeriodKey],
    ) -> Result<BTreeMap<PeriodKey, Arc<PeriodDocument>>, StoreError> {
        let loads = keys.iter().map(|key| async move {
            let doc = self.load_period(key).await?;
            Ok::<_, StoreError>((PeriodKey::normalize(key.as_str()), doc))
        });
        Ok(try_join_all(loads).await?.into_iter().collect())
    }

    pub fn is_cached(&self, key: &PeriodKey) -> bool {
        self.inner
            .documents
            .read()
            .contains_key(&PeriodKey::normalize(key.as_str()))
    }

    /// Drop every cached document and the cached index
    ///
    /// Loads already in flight still complete; telemetry is kept.
    pub fn clear_cache(&self) {
        self.inner.documents.write().clear();
        *self.inner.index.write() = None;
        tracing::debug!(source = %self.describe(), "period cache cleared");
    }

    /// Periods listed in the index
    pub async fn list_available_periods(&self) -> Result<Vec<PeriodKey>, StoreError> {
        Ok(self.load_index().await?.periods.clone())
    }

    pub fn stats(&self) -> LoadStats {
        self.inner.telemetry.snapshot()
    }

    pub fn reset_stats(&self) {
        self.inner.telemetry.reset();
    }

    async fn await_joined<V: Clone>(&self, joined: Joined<V>) -> Result<V, StoreError> {
        match joined {
            Joined::Ready(value) => {
                self.inner.telemetry.hit();
                Ok(value)
            }
            Joined::Flight { load, coalesced } => {
                if coalesced {
                    self.inner.telemetry.coalesced();
                } else {
                    self.inner.telemetry.miss();
                }
                load.await
            }
        }
    }
}

impl Inner {
    fn cached(&self, key: &PeriodKey) -> Option<Arc<PeriodDocument>> {
        self.documents.read().get(key).cloned()
    }

    async fn fetch_index(self: Arc<Self>) -> Result<Arc<PeriodIndex>, StoreError> {
        let path = document::index_path();
        let started = Instant::now();
        let result = self.read(&path).await.and_then(|bytes| parse_index(&path, &bytes));
        self.finish(&path, started, result.is_ok());

        let index = Arc::new(result?);
        *self.index.write() = Some(Arc::clone(&index));
        Ok(index)
    }

    async fn fetch_period(self: Arc<Self>, key: PeriodKey) -> Result<Arc<PeriodDocument>, StoreError> {
        let path = document::document_path(&key);
        let started = Instant::now();
        let result = self
            .read(&path)
            .await
            .and_then(|bytes| parse_document(&path, &key, &bytes));
        self.finish(&path, started, result.is_ok());

        let doc = Arc::new(result?);
        self.documents.write().insert(key, Arc::clone(&doc));
        Ok(doc)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        tracing::debug!(path, source = %self.source.describe(), "fetching");
        self.source
            .fetch(path)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })
    }

    fn finish(&self, path: &str, started: Instant, ok: bool) {
        let elapsed = started.elapsed();
        if self.telemetry.fetched(elapsed, ok, self.slow_threshold) {
            tracing::warn!(
                path,
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = self.slow_threshold.as_millis() as u64,
                "slow load"
            );
        }
    }
}

fn parse_json(bytes: &[u8]) -> Result<serde_json::Value, String> {
    serde_json::from_slice(bytes).map_err(|e| e.to_string())
}

fn parse_document(path: &str, key: &PeriodKey, bytes: &[u8]) -> Result<PeriodDocument, StoreError> {
    let invalid = |reason: String| StoreError::InvalidDocument {
        path: path.to_string(),
        reason,
    };

    let value = parse_json(bytes).map_err(invalid)?;
    for field in ["periodKey", "records"] {
        if value.get(field).is_none() {
            return Err(invalid(format!("missing `{}`", field)));
        }
    }

    let doc: PeriodDocument = serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
    if PeriodKey::normalize(doc.period_key.as_str()) != *key {
        return Err(invalid(format!(
            "document is for period {}, expected {}",
            doc.period_key, key
        )));
    }
    Ok(doc)
}

fn parse_index(path: &str, bytes: &[u8]) -> Result<PeriodIndex, StoreError> {
    let invalid = |reason: String| StoreError::InvalidIndex {
        path: path.to_string(),
        reason,
    };

    let value = parse_json(bytes).map_err(invalid)?;
    if value.get("periods").is_none() {
        return Err(invalid("missing `periods`".to_string()));
    }

    let mut index: PeriodIndex = serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
    // Hand-edited indexes may be unsorted
    index.periods = index
        .periods
        .iter()
        .map(|p| PeriodKey::normalize(p.as_str()))
        .filter(|p| !p.is_unknown())
        .collect();
    index.periods.sort();
    index.periods.dedup();
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GENERATED: &str = "2024-01-01T00:00:00Z";

    fn doc_json(key: &str, users: f64) -> String {
        json!({
            "periodKey": key,
            "sourceFileName": format!("tracker_{key}.csv"),
            "generatedAt": GENERATED,
            "totalRowCount": 1,
            "matchedCount": 1,
            "unmatchedNames": [],
            "records": [{
                "entityId": "7",
                "entityNameAsMatched": "7UP",
                "sourceEntityId": "1001",
                "sourceCategory": "Beverages",
                "metrics": { "Total_Users_pct": users }
            }]
        })
        .to_string()
    }

    fn store_with(source: Arc<MemorySource>) -> PeriodStore {
        PeriodStore::new(source, Duration::from_secs(5))
    }

    fn seeded(delay: Option<Duration>) -> Arc<MemorySource> {
        let mut source = MemorySource::new();
        if let Some(d) = delay {
            source = source.with_delay(d);
        }
        source.insert(
            "quarters/index.json",
            json!({ "periods": ["2010Q2", "2010Q1"], "generatedAt": GENERATED }).to_string(),
        );
        source.insert("quarters/2010Q1.json", doc_json("2010Q1", 61.18));
        source.insert("quarters/2010Q2.json", doc_json("2010Q2", 63.0));
        Arc::new(source)
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_fetch() {
        let source = seeded(Some(Duration::from_millis(30)));
        let store = store_with(source.clone());
        let key = PeriodKey::normalize("2010Q1");
        let key_spaced = PeriodKey::normalize(" 2010q1 ");

        let (a, b, c) = tokio::join!(
            store.load_period(&key),
            store.load_period(&key),
            store.load_period(&key_spaced)
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(source.fetch_count(), 1);

        let stats = store.stats();
        assert_eq!(stats.requests, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.coalesced, 2);
        assert_eq!(stats.fetches, 1);
    }

    #[tokio::test]
    async fn test_cached_load_does_not_refetch() {
        let source = seeded(None);
        let store = store_with(source.clone());
        let key = PeriodKey::normalize("2010Q1");

        assert!(!store.is_cached(&key));
        let first = store.load_period(&key).await.unwrap();
        assert!(store.is_cached(&key));
        let second = store.load_period(&key).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(store.stats().hits, 1);
        assert_eq!(
            first.records[0].metrics.total_users_pct,
            Some(61.18)
        );
    }

    #[tokio::test]
    async fn test_clear_cache_refetches_and_keeps_stats() {
        let source = seeded(None);
        let store = store_with(source.clone());
        let key = PeriodKey::normalize("2010Q1");

        store.load_period(&key).await.unwrap();
        store.load_index().await.unwrap();
        store.clear_cache();
        assert!(!store.is_cached(&key));
        assert_eq!(store.stats().fetches, 2);

        store.load_period(&key).await.unwrap();
        assert_eq!(source.fetch_count(), 3);

        store.reset_stats();
        assert_eq!(store.stats(), LoadStats::default());
    }

    #[tokio::test]
    async fn test_error_is_not_cached() {
        let source = seeded(None);
        source.fail("quarters/2010Q1.json", "connection reset");
        let store = store_with(source.clone());
        let key = PeriodKey::normalize("2010Q1");

        let err = store.load_period(&key).await.unwrap_err();
        assert!(matches!(err, StoreError::Fetch { .. }));
        assert!(!store.is_cached(&key));

        source.clear_failure("quarters/2010Q1.json");
        assert!(store.load_period(&key).await.is_ok());
        assert_eq!(source.fetch_count(), 2);
        assert_eq!(store.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_not_found_vs_invalid_document() {
        let source = seeded(None);
        source.insert("quarters/2011Q1.json", r#"{"periodKey": "2011Q1"}"#);
        source.insert("quarters/2011Q2.json", "not json");
        source.insert("quarters/2011Q3.json", doc_json("2011Q4", 1.0));
        let store = store_with(source);

        let missing = store.load_period(&PeriodKey::normalize("2009Q4")).await;
        assert!(missing.unwrap_err().is_not_found());

        for key in ["2011Q1", "2011Q2", "2011Q3"] {
            let err = store.load_period(&PeriodKey::normalize(key)).await.unwrap_err();
            assert!(
                matches!(err, StoreError::InvalidDocument { .. }),
                "{key}: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_index_sorted_and_validated() {
        let store = store_with(seeded(None));
        assert_eq!(
            store.list_available_periods().await.unwrap(),
            vec![PeriodKey::normalize("2010Q1"), PeriodKey::normalize("2010Q2")]
        );

        let bad = MemorySource::new();
        bad.insert("quarters/index.json", r#"{"generatedAt": "2024-01-01T00:00:00Z"}"#);
        let store = store_with(Arc::new(bad));
        assert!(matches!(
            store.load_index().await,
            Err(StoreError::InvalidIndex { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_periods_is_all_or_nothing() {
        let source = seeded(None);
        let store = store_with(source);

        let keys = vec![PeriodKey::normalize("2010Q2"), PeriodKey::normalize("2010q1")];
        let docs = store.load_periods(&keys).await.unwrap();
        let order: Vec<&str> = docs.keys().map(|k| k.as_str()).collect();
        assert_eq!(order, vec!["2010Q1", "2010Q2"]);

        let with_missing = vec![PeriodKey::normalize("2010Q1"), PeriodKey::normalize("2010Q3")];
        assert!(store.load_periods(&with_missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_slow_loads_are_counted() {
        let source = seeded(Some(Duration::from_millis(20)));
        let store = PeriodStore::new(source, Duration::from_millis(1));
        store.load_period(&PeriodKey::normalize("2010Q1")).await.unwrap();
        assert_eq!(store.stats().slow_loads, 1);
    }

    #[tokio::test]
    async fn test_fs_store_reads_built_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let quarters = tmp.path().join("quarters");
        std::fs::create_dir_all(&quarters).unwrap();
        std::fs::write(quarters.join("2010Q1.json"), doc_json("2010Q1", 61.18)).unwrap();

        let store = PeriodStore::open_dir(tmp.path(), Duration::from_secs(1));
        let doc = store.load_period(&PeriodKey::normalize("2010Q1")).await.unwrap();
        assert_eq!(doc.source_file_name, "tracker_2010Q1.csv");
    }
}
