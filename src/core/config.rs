//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::project::Workspace;

const DEFAULT_SOURCES_DIR: &str = "sources";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_REGISTRY: &str = "registry.json";
const DEFAULT_SLOW_LOAD_MS: u64 = 500;
const DEFAULT_LARGE_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// BQT configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory of quarterly source files
    pub sources_dir: Option<PathBuf>,

    /// Root of the built documents (the store reads `quarters/` under it)
    pub data_dir: Option<PathBuf>,

    /// Brand registry file
    pub registry: Option<PathBuf>,

    /// Slow-load warning threshold in milliseconds
    pub slow_load_ms: Option<u64>,

    /// Size above which a source file triggers a build warning
    pub large_file_bytes: Option<u64>,

    /// Base URL for serving documents over HTTP (`http` feature)
    pub base_url: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(workspace: &Workspace) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (applied by the accessors)

        // 2. Global user config (~/.config/bqt/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Workspace config (.bqt/config.yaml)
        if let Some(local) = Self::read_file(&workspace.bqt_dir().join("config.yaml")) {
            config.merge(local);
        }

        // 4. Environment variables
        config.merge(Self::from_env(|key| std::env::var(key).ok()));

        config
    }

    fn read_file(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        // The generated config is all comments
        if contents
            .lines()
            .all(|l| l.trim().is_empty() || l.trim_start().starts_with('#'))
        {
            return None;
        }
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Build the environment layer from a variable lookup
    fn from_env(var: impl Fn(&str) -> Option<String>) -> Config {
        Config {
            sources_dir: var("BQT_SOURCES_DIR").map(PathBuf::from),
            data_dir: var("BQT_DATA_DIR").map(PathBuf::from),
            registry: var("BQT_REGISTRY").map(PathBuf::from),
            slow_load_ms: var("BQT_SLOW_LOAD_MS").and_then(|v| v.trim().parse().ok()),
            large_file_bytes: None,
            base_url: var("BQT_BASE_URL"),
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "bqt")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.sources_dir.is_some() {
            self.sources_dir = other.sources_dir;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.registry.is_some() {
            self.registry = other.registry;
        }
        if other.slow_load_ms.is_some() {
            self.slow_load_ms = other.slow_load_ms;
        }
        if other.large_file_bytes.is_some() {
            self.large_file_bytes = other.large_file_bytes;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
    }

    pub fn sources_dir(&self, workspace: &Workspace) -> PathBuf {
        workspace.resolve(
            self.sources_dir
                .as_deref()
                .unwrap_or(std::path::Path::new(DEFAULT_SOURCES_DIR)),
        )
    }

    pub fn data_dir(&self, workspace: &Workspace) -> PathBuf {
        workspace.resolve(
            self.data_dir
                .as_deref()
                .unwrap_or(std::path::Path::new(DEFAULT_DATA_DIR)),
        )
    }

    pub fn registry_path(&self, workspace: &Workspace) -> PathBuf {
        workspace.resolve(
            self.registry
                .as_deref()
                .unwrap_or(std::path::Path::new(DEFAULT_REGISTRY)),
        )
    }

    pub fn slow_load_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_load_ms.unwrap_or(DEFAULT_SLOW_LOAD_MS))
    }

    pub fn large_file_bytes(&self) -> u64 {
        self.large_file_bytes.unwrap_or(DEFAULT_LARGE_FILE_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_resolve_under_workspace() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();
        let config = Config::default();

        assert_eq!(config.sources_dir(&ws), ws.root().join("sources"));
        assert_eq!(config.data_dir(&ws), ws.root().join("data"));
        assert_eq!(config.registry_path(&ws), ws.root().join("registry.json"));
        assert_eq!(config.slow_load_threshold(), Duration::from_millis(500));
        assert_eq!(config.large_file_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_workspace_config_overrides_defaults() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();
        std::fs::write(
            ws.bqt_dir().join("config.yaml"),
            "sources_dir: raw\nslow_load_ms: 25\nlarge_file_bytes: 1024\n",
        )
        .unwrap();

        let local = Config::read_file(&ws.bqt_dir().join("config.yaml")).unwrap();
        let mut config = Config::default();
        config.merge(local);

        assert_eq!(config.sources_dir(&ws), ws.root().join("raw"));
        assert_eq!(config.slow_load_threshold(), Duration::from_millis(25));
        assert_eq!(config.large_file_bytes(), 1024);
    }

    #[test]
    fn test_env_layer_takes_precedence() {
        let mut config = Config {
            data_dir: Some(PathBuf::from("data")),
            slow_load_ms: Some(100),
            ..Default::default()
        };
        config.merge(Config::from_env(|key| match key {
            "BQT_DATA_DIR" => Some("/srv/quarters".to_string()),
            "BQT_SLOW_LOAD_MS" => Some("not a number".to_string()),
            _ => None,
        }));

        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/quarters")));
        assert_eq!(config.slow_load_ms, Some(100));
    }

    #[test]
    fn test_malformed_config_is_ignored() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "slow_load_ms: [not, a, number]\n").unwrap();
        assert!(Config::read_file(&path).is_none());
    }
}
