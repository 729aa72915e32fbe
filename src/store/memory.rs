//! Scripted in-memory document source for store and query tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{DocumentSource, StoreError};

/// In-memory source with a fetch counter and optional latency
#[derive(Debug, Default)]
pub struct MemorySource {
    files: Mutex<HashMap<String, Vec<u8>>>,
    failing: Mutex<HashMap<String, String>>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.lock().insert(path.into(), content.into());
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().remove(path);
    }

    /// Make fetches of `path` fail with an I/O error until cleared
    pub fn fail(&self, path: impl Into<String>, message: impl Into<String>) {
        self.failing.lock().insert(path.into(), message.into());
    }

    pub fn clear_failure(&self, path: &str) {
        self.failing.lock().remove(path);
    }

    /// Number of fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failing.lock().get(path).cloned();
        if let Some(message) = failure {
            return Err(StoreError::Fetch {
                path: path.to_string(),
                message,
            });
        }
        Ok(self.files.lock().get(path).cloned())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_source_counts_and_fails() {
        let source = MemorySource::new();
        source.insert("a.json", "{}");
        assert!(source.fetch("a.json").await.unwrap().is_some());
        assert!(source.fetch("b.json").await.unwrap().is_none());

        source.fail("a.json", "disk on fire");
        assert!(matches!(
            source.fetch("a.json").await,
            Err(StoreError::Fetch { .. })
        ));
        assert_eq!(source.fetch_count(), 3);
    }
}
