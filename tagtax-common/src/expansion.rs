//! Query-time tag expansion over the compiled mapping file

use crate::ledger::read_json_file;
use crate::models::FinalMapping;
use crate::normalize::normalize_tag;
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct TagExpander {
    updated_at: Option<DateTime<Utc>>,
    mappings: BTreeMap<String, Vec<String>>,
}

impl TagExpander {
    pub fn load(path: &Path) -> Result<Self> {
        let mapping: FinalMapping = read_json_file(path)?;
        Ok(Self::from_mapping(mapping))
    }

    pub fn from_mapping(mapping: FinalMapping) -> Self {
        Self {
            updated_at: Some(mapping.updated_at),
            mappings: mapping.mappings,
        }
    }

    /// Expansion terms for a free-text tag
    ///
    /// Unmapped tags expand to their own normalized form; an empty tag
    /// expands to nothing.
    pub fn expand(&self, tag: &str) -> Vec<String> {
        let normalized = normalize_tag(tag);
        if normalized.is_empty() {
            return Vec::new();
        }
        match self.mappings.get(&normalized) {
            Some(terms) => terms.clone(),
            None => vec![normalized],
        }
    }

    pub fn is_mapped(&self, tag: &str) -> bool {
        self.mappings.contains_key(&normalize_tag(tag))
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
