//! Read-only brand registry
//!
//! The registry is owned elsewhere; this module only loads an ordered
//! snapshot of `{id, name, ...}` records and answers lookups by id.
//! Iteration order is the file order and is significant for name matching.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Stable brand identifier from the external registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandId(String);

impl BrandId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BrandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BrandId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: BrandId,
    pub name: String,
    /// Any other registry attributes, carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Brand {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: BrandId::new(id),
            name: name.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Registries exported from databases often carry numeric ids
fn deserialize_id<'de, D>(deserializer: D) -> Result<BrandId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => BrandId(s),
        RawId::Int(n) => BrandId(n.to_string()),
    })
}

/// Ordered, read-only collection of brands
#[derive(Debug, Default, Clone)]
pub struct Registry {
    brands: Vec<Brand>,
    by_id: HashMap<BrandId, usize>,
}

impl Registry {
    /// Build a registry from brands in iteration order
    ///
    /// A repeated id keeps its first entry; later ones remain iterable but
    /// are not reachable by id.
    pub fn from_brands(brands: Vec<Brand>) -> Self {
        let mut by_id = HashMap::with_capacity(brands.len());
        for (idx, brand) in brands.iter().enumerate() {
            if by_id.contains_key(&brand.id) {
                tracing::warn!(id = %brand.id, "duplicate brand id in registry; keeping first entry");
                continue;
            }
            by_id.insert(brand.id.clone(), idx);
        }
        Self { brands, by_id }
    }

    /// Load from `.json` (array of objects) or `.csv` (`id,name` header)
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        if !path.exists() {
            return Err(RegistryError::NotFound(path.display().to_string()));
        }

        let is_csv = path
            .extension()
            .map_or(false, |e| e.eq_ignore_ascii_case("csv"));

        let brands = if is_csv {
            Self::read_csv(path)?
        } else {
            let content = fs::read_to_string(path).map_err(|e| RegistryError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            serde_json::from_str::<Vec<Brand>>(&content).map_err(|e| RegistryError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        };

        tracing::debug!(path = %path.display(), brands = brands.len(), "loaded registry");
        Ok(Self::from_brands(brands))
    }

    fn read_csv(path: &Path) -> Result<Vec<Brand>, RegistryError> {
        let parse_err = |message: String| RegistryError::Parse {
            path: path.display().to_string(),
            message,
        };

        let file = File::open(path).map_err(|e| RegistryError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));

        let headers = rdr.headers().map_err(|e| parse_err(e.to_string()))?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let (Some(id_col), Some(name_col)) = (column("id"), column("name")) else {
            return Err(parse_err("registry CSV needs 'id' and 'name' columns".to_string()));
        };

        let mut brands = Vec::new();
        for (row_idx, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| parse_err(format!("row {}: {}", row_idx + 2, e)))?;
            let id = record.get(id_col).unwrap_or("").trim();
            let name = record.get(name_col).unwrap_or("").trim();
            if id.is_empty() || name.is_empty() {
                continue;
            }
            brands.push(Brand::new(id, name));
        }
        Ok(brands)
    }

    pub fn get(&self, id: &BrandId) -> Option<&Brand> {
        self.by_id.get(id).map(|&idx| &self.brands[idx])
    }

    /// Entry at a position in registry order
    pub fn at(&self, idx: usize) -> Option<&Brand> {
        self.brands.get(idx)
    }

    pub fn contains(&self, id: &BrandId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Brand> {
        self.brands.iter()
    }

    pub fn len(&self) -> usize {
        self.brands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }
}

/// Errors loading the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry not found: {0}")]
    NotFound(String),

    #[error("failed to read registry {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid registry {path}: {message}")]
    Parse { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_json_with_mixed_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(
            &path,
            r#"[
                {"id": 7, "name": "7UP", "sector": "Beverages"},
                {"id": "yt", "name": "YouTube"}
            ]"#,
        )
        .unwrap();

        let registry = Registry::load(&path).unwrap();
        assert_eq!(registry.len(), 2);

        let seven_up = registry.get(&BrandId::new("7")).unwrap();
        assert_eq!(seven_up.name, "7UP");
        assert_eq!(seven_up.extra["sector"], "Beverages");
        assert!(registry.contains(&BrandId::new("yt")));
    }

    #[test]
    fn test_load_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.csv");
        fs::write(&path, "ID,Name\n1,Acme\n2, Globex \n,Nameless\n").unwrap();

        let registry = Registry::load(&path).unwrap();
        let names: Vec<&str> = registry.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Globex"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Registry::load(Path::new("/nonexistent/registry.json")).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let registry = Registry::from_brands(vec![
            Brand::new("1", "First"),
            Brand::new("1", "Second"),
        ]);
        assert_eq!(registry.get(&BrandId::new("1")).unwrap().name, "First");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Registry::load(&path).unwrap_err(),
            RegistryError::Parse { .. }
        ));
    }
}
