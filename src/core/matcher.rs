//! Brand name matching
//!
//! Source rows carry no registry key, only a display name. Matching is exact
//! after trimming and lower-casing: "Acme" matches " ACME " but never
//! "Acme Inc.".

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::core::registry::{Brand, Registry};

/// Canonical form used for every name comparison
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn matches(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// First brand (in iteration order) whose name matches `candidate`
pub fn find<'a>(brands: impl IntoIterator<Item = &'a Brand>, candidate: &str) -> Option<&'a Brand> {
    let wanted = normalize(candidate);
    brands.into_iter().find(|b| normalize(&b.name) == wanted)
}

/// Precomputed normalized-name lookup over a registry
///
/// Gives the same first-wins answer as [`find`] without rescanning the
/// registry for every source row.
pub struct NameIndex<'a> {
    registry: &'a Registry,
    positions: HashMap<String, usize>,
    collisions: Vec<(String, Vec<String>)>,
}

impl<'a> NameIndex<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(registry.len());
        let mut shadowed: HashMap<String, Vec<String>> = HashMap::new();

        for (idx, brand) in registry.iter().enumerate() {
            match positions.entry(normalize(&brand.name)) {
                Entry::Vacant(slot) => {
                    slot.insert(idx);
                }
                Entry::Occupied(slot) => {
                    shadowed
                        .entry(slot.key().clone())
                        .or_default()
                        .push(brand.id.to_string());
                }
            }
        }

        let mut collisions: Vec<(String, Vec<String>)> = shadowed.into_iter().collect();
        collisions.sort();

        Self {
            registry,
            positions,
            collisions,
        }
    }

    pub fn find(&self, candidate: &str) -> Option<&'a Brand> {
        let idx = *self.positions.get(&normalize(candidate))?;
        self.registry.at(idx)
    }

    /// Normalized names shared by more than one registry entry, with the ids
    /// of the entries that lose to the first one
    pub fn collisions(&self) -> &[(String, Vec<String>)] {
        &self.collisions
    }
}
