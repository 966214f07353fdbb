//! Taxonomy outputs: genre/subgenre view, genre summary, tag mappings

use crate::ledger::LedgerRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyKind {
    Genre,
    Subgenre,
}

/// Derived view of a hierarchy entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleTaxonomyEntry {
    pub style: String,
    pub total_count: u64,
    pub kind: TaxonomyKind,
    /// `[parent]` for a subgenre, empty for a genre
    pub parent_genres: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

impl LedgerRecord for StyleTaxonomyEntry {
    fn key(&self) -> &str {
        &self.style
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgenreRecord {
    pub name: String,
    pub total_count: u64,
}

/// A top-level genre with the subgenres that name it as parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreSummaryEntry {
    pub genre: String,
    /// Own total plus every attached subgenre's total
    pub total_count: u64,
    pub subgenres: Vec<SubgenreRecord>,
}

impl LedgerRecord for GenreSummaryEntry {
    fn key(&self) -> &str {
        &self.genre
    }
}

/// Resolved bridge between a tag and the taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagStyleMapEntry {
    pub normalized: String,
    pub total_count: u64,
    pub canonical_styles: Vec<String>,
    pub parent_genres: Vec<String>,
    pub descriptors: Vec<String>,
}

impl TagStyleMapEntry {
    /// Deduplicated canonical styles followed by parent genres
    pub fn expansion_terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for term in self.canonical_styles.iter().chain(&self.parent_genres) {
            if !terms.contains(term) {
                terms.push(term.clone());
            }
        }
        terms
    }
}

impl LedgerRecord for TagStyleMapEntry {
    fn key(&self) -> &str {
        &self.normalized
    }
}

/// The single mapping file consumed by the application at query time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalMapping {
    pub updated_at: DateTime<Utc>,
    pub mappings: BTreeMap<String, Vec<String>>,
}
