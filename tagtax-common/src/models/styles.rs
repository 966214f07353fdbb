//! Style-level records: harvested styles, canonical map, hierarchy

use crate::ledger::LedgerRecord;
use serde::{Deserialize, Serialize};

/// Usage statistics for one raw style string across all tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStyleEntry {
    pub style: String,
    /// Sum of the totalCount of every tag containing this style
    pub total_count: u64,
    /// Number of distinct tags containing this style
    pub tag_count: u64,
    pub example_tags: Vec<String>,
}

impl LedgerRecord for RawStyleEntry {
    fn key(&self) -> &str {
        &self.style
    }
}

/// Canonicalization decision for a raw style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleAction {
    /// Already canonical
    Keep,
    /// Another spelling or synonym of `canonicalStyle`
    Alias,
    /// Not a style at all
    Reject,
}

impl StyleAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Some(StyleAction::Keep),
            "alias" => Some(StyleAction::Alias),
            "reject" => Some(StyleAction::Reject),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleAction::Keep => "keep",
            StyleAction::Alias => "alias",
            StyleAction::Reject => "reject",
        }
    }
}

/// One canonical-map ledger line, keyed by the raw style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalStyleEntry {
    pub style: String,
    pub canonical_style: String,
    pub action: StyleAction,
    #[serde(default)]
    pub reason: String,
    pub total_count: u64,
}

impl LedgerRecord for CanonicalStyleEntry {
    fn key(&self) -> &str {
        &self.style
    }
}

/// Genre/subgenre decision for one canonical style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleHierarchyEntry {
    pub style: String,
    pub total_count: u64,
    pub is_subgenre: bool,
    #[serde(default)]
    pub parent_genre: String,
    #[serde(default)]
    pub reason: String,
}

impl StyleHierarchyEntry {
    /// Parent genre when this style is a subgenre with a named parent
    pub fn parent(&self) -> Option<&str> {
        if self.is_subgenre && !self.parent_genre.is_empty() {
            Some(&self.parent_genre)
        } else {
            None
        }
    }
}

impl LedgerRecord for StyleHierarchyEntry {
    fn key(&self) -> &str {
        &self.style
    }
}
