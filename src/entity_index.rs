//! Entity Lookup Index
//!
//! Maps normalized company/department names to their canonical spelling in
//! the placement store. Built once at startup and shared read-only.

use crate::error::Result;
use crate::store::PlacementStore;
use std::collections::HashMap;
use tracing::info;

/// Lower-case and drop every character that is not an ASCII letter or digit.
///
/// "Tata Consultancy Services Ltd." -> "tataconsultancyservicesltd"
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Normalized key -> canonical name, iterated in first-insertion order.
///
/// Two canonical names that normalize to the same key collide; the one seen
/// last wins, but the key keeps the position of its first insertion.
#[derive(Debug, Clone, Default)]
pub struct EntityLookup {
    entries: Vec<(String, String)>,
    positions: HashMap<String, usize>,
}

impl EntityLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lookup = Self::new();
        for name in names {
            lookup.insert(name.as_ref());
        }
        lookup
    }

    pub fn insert(&mut self, canonical: &str) {
        let key = normalize(canonical);
        match self.positions.get(&key) {
            Some(&idx) => self.entries[idx].1 = canonical.to_string(),
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, canonical.to_string()));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.positions.get(key).map(|&idx| self.entries[idx].1.as_str())
    }

    /// (normalized key, canonical name) pairs in lookup order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Company and department lookups for the placement store
#[derive(Debug, Clone, Default)]
pub struct EntityLookups {
    pub companies: EntityLookup,
    pub departments: EntityLookup,
}

impl EntityLookups {
    pub fn build(store: &PlacementStore) -> Result<Self> {
        let companies = EntityLookup::from_names(store.distinct_values("Company")?);
        let departments = EntityLookup::from_names(store.distinct_values("Department")?);

        info!(
            "Built entity lookups: {} companies, {} departments",
            companies.len(),
            departments.len()
        );

        Ok(Self {
            companies,
            departments,
        })
    }
}
