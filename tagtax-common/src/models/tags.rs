//! Tag-level records: collection, aggregation, interpretation, postprocessing

use crate::ledger::LedgerRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One tag occurrence harvested from one entity and one source field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTagRecord {
    pub entity_id: String,
    pub raw_tag: String,
    pub normalized_tag: String,
    /// `container:field`, e.g. `lastfm:tags`
    pub source: String,
}

/// A tag occurrence dropped by the collector, kept for auditing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedTagRecord {
    #[serde(flatten)]
    pub record: RawTagRecord,
    pub reason: String,
}

/// Per-tag occurrence statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTagEntry {
    pub normalized: String,
    pub total_count: u64,
    pub entity_count: u64,
    /// Sorted by source label so rewrites are byte-stable
    pub source_counts: BTreeMap<String, u64>,
    /// Up to five distinct pre-normalization spellings, first seen first
    pub example_raw_tags: Vec<String>,
}

impl LedgerRecord for NormalizedTagEntry {
    fn key(&self) -> &str {
        &self.normalized
    }
}

/// Semantic type of one segment of a compound tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Style,
    Descriptor,
    Invalid,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Style => "style",
            SegmentKind::Descriptor => "descriptor",
            SegmentKind::Invalid => "invalid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "style" => Some(SegmentKind::Style),
            "descriptor" => Some(SegmentKind::Descriptor),
            "invalid" => Some(SegmentKind::Invalid),
            _ => None,
        }
    }
}

/// One decomposed unit of a compound tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSegment {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    #[serde(default)]
    pub reason: String,
}

impl TagSegment {
    pub fn new(text: impl Into<String>, kind: SegmentKind, reason: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
            reason: reason.into(),
        }
    }
}

/// Interpretation of one normalized tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundTagEntry {
    pub normalized: String,
    /// Curated override lines may omit it
    #[serde(default)]
    pub total_count: u64,
    pub segments: Vec<TagSegment>,
}

impl LedgerRecord for CompoundTagEntry {
    fn key(&self) -> &str {
        &self.normalized
    }
}

/// Routing class of a tag, derived from which segment kinds it contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bucket {
    StyleOnly,
    StyleWithDescriptors,
    DescriptorsOnly,
    PureInvalid,
}

impl Bucket {
    /// Bucket is a pure function of which partitions are non-empty
    pub fn classify(has_styles: bool, has_descriptors: bool) -> Self {
        match (has_styles, has_descriptors) {
            (true, true) => Bucket::StyleWithDescriptors,
            (true, false) => Bucket::StyleOnly,
            (false, true) => Bucket::DescriptorsOnly,
            (false, false) => Bucket::PureInvalid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::StyleOnly => "STYLE_ONLY",
            Bucket::StyleWithDescriptors => "STYLE_WITH_DESCRIPTORS",
            Bucket::DescriptorsOnly => "DESCRIPTORS_ONLY",
            Bucket::PureInvalid => "PURE_INVALID",
        }
    }
}

/// Compound entry partitioned by segment kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostprocessedTagEntry {
    pub normalized: String,
    pub total_count: u64,
    pub styles: Vec<String>,
    pub descriptors: Vec<String>,
    pub invalid_segments: Vec<String>,
    pub bucket: Bucket,
}

impl LedgerRecord for PostprocessedTagEntry {
    fn key(&self) -> &str {
        &self.normalized
    }
}

/// Review-queue entry for a tag with no usable segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistCandidate {
    pub normalized: String,
    pub total_count: u64,
    pub segments: Vec<TagSegment>,
    pub reason: String,
}

impl LedgerRecord for BlacklistCandidate {
    fn key(&self) -> &str {
        &self.normalized
    }
}
