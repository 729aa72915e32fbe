//! Where built documents are read from

use async_trait::async_trait;
use std::path::PathBuf;

use super::StoreError;

/// A static location holding `quarters/*.json`
///
/// Absence is `Ok(None)`; `Err` is reserved for I/O failures.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Documents on the local filesystem under a data root
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentSource for FsSource {
    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let full = self.root.join(path);
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Fetch {
                path: full.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Documents served over HTTP from a base URL
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let url = format!("{}/{}", self.base_url, path);
        let fetch_err = |e: reqwest::Error| StoreError::Fetch {
            path: url.clone(),
            message: e.to_string(),
        };

        let response = self.client.get(&url).send().await.map_err(fetch_err)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status().map_err(fetch_err)?;
        let bytes = response.bytes().await.map_err(fetch_err)?;
        Ok(Some(bytes.to_vec()))
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
