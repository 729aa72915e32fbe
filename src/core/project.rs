//! Workspace discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Marker directory identifying a workspace root
pub const WORKSPACE_DIR: &str = ".bqt";

/// Represents a BQT data workspace
///
/// A workspace holds the raw quarterly source files, the brand registry and
/// the built period documents side by side.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Root directory of the workspace (parent of .bqt/)
    root: PathBuf,
}

impl Workspace {
    /// Find workspace root by walking up from the current directory
    pub fn discover() -> Result<Self, WorkspaceError> {
        let current =
            std::env::current_dir().map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, WorkspaceError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        loop {
            if current.join(WORKSPACE_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(WorkspaceError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new workspace structure at the given path
    pub fn init(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(WORKSPACE_DIR).exists() {
            return Err(WorkspaceError::AlreadyExists(root));
        }

        Self::create_structure(&root)?;
        Ok(Self { root })
    }

    /// Initialize even if .bqt/ exists; an existing registry is left alone
    pub fn init_force(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create_structure(&root)?;
        Ok(Self { root })
    }

    fn create_structure(root: &Path) -> Result<(), WorkspaceError> {
        let io = |e: std::io::Error| WorkspaceError::IoError(e.to_string());

        let bqt_dir = root.join(WORKSPACE_DIR);
        std::fs::create_dir_all(&bqt_dir).map_err(io)?;
        std::fs::write(bqt_dir.join("config.yaml"), Self::default_config()).map_err(io)?;

        for dir in ["sources", "data/quarters"] {
            std::fs::create_dir_all(root.join(dir)).map_err(io)?;
        }

        let registry = root.join("registry.json");
        if !registry.exists() {
            std::fs::write(&registry, "[]\n").map_err(io)?;
        }

        Ok(())
    }

    fn default_config() -> &'static str {
        r#"# BQT Workspace Configuration

# Directory holding quarterly source files (*.csv, *.tsv)
# sources_dir: sources

# Directory receiving built period documents (quarters/*.json)
# data_dir: data

# Brand registry (JSON array of {id, name} or CSV with id,name columns)
# registry: registry.json

# Loads slower than this many milliseconds are logged as warnings
# slow_load_ms: 500

# Source files larger than this many bytes produce a build warning
# large_file_bytes: 10485760
"#
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .bqt configuration directory
    pub fn bqt_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    /// Resolve a configured path against the workspace root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("not a BQT workspace (searched from {searched_from:?}). Run 'bqt init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("BQT workspace already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
