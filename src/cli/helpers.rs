//! Shared helper functions for CLI commands

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

use crate::cli::GlobalOpts;
use crate::core::period::PeriodKey;
use crate::core::registry::{Brand, Registry};
use crate::core::{Config, Workspace};
use crate::query::BrandQuery;
use crate::store::{DocumentSource, FsSource, PeriodStore};

/// Workspace plus its merged configuration
pub struct Context {
    pub workspace: Workspace,
    pub config: Config,
}

impl Context {
    pub fn load(global: &GlobalOpts) -> Result<Self> {
        let workspace = match &global.workspace {
            Some(root) => Workspace::discover_from(root),
            None => Workspace::discover(),
        }
        .map_err(|e| miette::miette!("{}", e))?;
        let config = Config::load(&workspace);
        Ok(Self { workspace, config })
    }

    pub fn registry(&self) -> Result<Registry> {
        let path = self.config.registry_path(&self.workspace);
        let registry = Registry::load(&path).map_err(|e| miette::miette!("{}", e))?;
        tracing::debug!(path = %path.display(), brands = registry.len(), "registry loaded");
        Ok(registry)
    }

    pub fn store(&self) -> PeriodStore {
        PeriodStore::new(self.source(), self.config.slow_load_threshold())
    }

    #[cfg(feature = "http")]
    fn source(&self) -> Arc<dyn DocumentSource> {
        match &self.config.base_url {
            Some(url) => Arc::new(crate::store::HttpSource::new(url.clone())),
            None => Arc::new(FsSource::new(self.config.data_dir(&self.workspace))),
        }
    }

    #[cfg(not(feature = "http"))]
    fn source(&self) -> Arc<dyn DocumentSource> {
        if self.config.base_url.is_some() {
            tracing::warn!("base_url is set but bqt was built without the `http` feature; reading local data");
        }
        Arc::new(FsSource::new(self.config.data_dir(&self.workspace)))
    }

    pub fn query(&self) -> Result<BrandQuery> {
        Ok(BrandQuery::new(Arc::new(self.registry()?), self.store()))
    }
}

/// Run a future to completion on a fresh multi-thread runtime
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    Ok(runtime.block_on(future))
}

/// Resolve a brand argument given as an id or a name
pub fn resolve_brand<'q>(query: &'q BrandQuery, id_or_name: &str) -> Result<&'q Brand> {
    query
        .find_brand(id_or_name)
        .ok_or_else(|| miette::miette!("Brand not found in registry: {}", id_or_name))
}

/// Parse period arguments strictly (`YYYYQ#`, any case)
pub fn parse_periods(raw: &[String]) -> Result<Vec<PeriodKey>> {
    raw.iter()
        .map(|p| p.parse::<PeriodKey>().map_err(|e| miette::miette!("{}", e)))
        .collect()
}

/// Pretty-print a value as JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{}", json);
    Ok(())
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("Crème brûlée", 8), "Crème...");
    }

    #[test]
    fn test_parse_periods() {
        let keys = parse_periods(&["2010q1".to_string(), " 2011Q4".to_string()]).unwrap();
        assert_eq!(keys[0].as_str(), "2010Q1");
        assert_eq!(keys[1].as_str(), "2011Q4");
        assert!(parse_periods(&["2010-Q1".to_string()]).is_err());
    }
}
