//! Stage 4: merge manual overrides, partition segments, bucket tags
//!
//! The compound ledger is the base layer and the curated override ledger
//! the override layer of a [`LayeredMap`], so an override entry replaces
//! the interpreted one wholesale. Tags with no style and no descriptor go
//! to the blacklist-candidate review queue; nothing is applied to the live
//! blacklist here.

use super::{by_total_then_key, push_distinct, Stage, StageReport};
use crate::error::StageResult;
use std::collections::BTreeMap;
use tagtax_common::layered::{Layer, LayeredMap};
use tagtax_common::ledger::{read_keyed_ledger, read_ledger_if_exists, write_ledger};
use tagtax_common::models::{
    BlacklistCandidate, Bucket, CompoundTagEntry, PostprocessedTagEntry, SegmentKind, TagSegment,
};
use tagtax_common::paths::LedgerPaths;
use tagtax_common::normalize::normalize_non_empty;
use tagtax_common::{normalize_tag, Error};
use tracing::info;

pub const OVERRIDE_REASON: &str = "manual override";
pub const CANDIDATE_REASON: &str = "no style or descriptor segments";

pub fn postprocess(paths: &LedgerPaths) -> StageResult<StageReport> {
    let mut report = StageReport::new(Stage::Postprocess);

    let base_path = paths.compound_tags();
    if !base_path.exists() {
        return Err(Error::NotFound(base_path).into());
    }
    let (base, _) = read_keyed_ledger::<CompoundTagEntry>(&base_path)?;
    let overrides: Vec<CompoundTagEntry> = read_ledger_if_exists(&paths.compound_overrides())?;
    info!(
        "Merging {} interpreted entries with {} override entries",
        base.len(),
        overrides.len()
    );

    let merged = merge_layers(base, overrides);
    report.total = merged.len();

    let mut entries = Vec::with_capacity(merged.len());
    let mut candidates = Vec::new();
    for compound in &merged {
        let entry = partition(compound);
        if entry.bucket == Bucket::PureInvalid {
            candidates.push(BlacklistCandidate {
                normalized: compound.normalized.clone(),
                total_count: compound.total_count,
                segments: compound.segments.clone(),
                reason: CANDIDATE_REASON.to_string(),
            });
        }
        entries.push(entry);
    }
    report.succeeded = entries.len();

    entries.sort_by(|a, b| {
        by_total_then_key(
            (a.total_count, a.normalized.as_str()),
            (b.total_count, b.normalized.as_str()),
        )
    });
    candidates.sort_by(|a, b| {
        by_total_then_key(
            (a.total_count, a.normalized.as_str()),
            (b.total_count, b.normalized.as_str()),
        )
    });

    report.written = write_ledger(&paths.postprocessed_tags(), &entries)?;
    report.written += write_ledger(&paths.blacklist_candidates(), &candidates)?;

    info!(
        "Postprocessed {} tags, {} blacklist candidates",
        entries.len(),
        candidates.len()
    );
    for (bucket, count) in bucket_counts(&entries) {
        info!(bucket, "{} tags", count);
    }
    Ok(report)
}

/// Tags per bucket, keyed by the bucket's ledger name
pub fn bucket_counts(entries: &[PostprocessedTagEntry]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.bucket.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Resolve the two layers into one entry per key
///
/// Override entries get their segment reasons marked as manual and carry
/// the interpreted totalCount when the tag was interpreted.
pub fn merge_layers(
    base: Vec<CompoundTagEntry>,
    overrides: Vec<CompoundTagEntry>,
) -> Vec<CompoundTagEntry> {
    let overrides = overrides.into_iter().map(|mut entry| {
        entry.normalized = normalize_tag(&entry.normalized);
        entry
    });
    let map = LayeredMap::new(base, overrides);
    if map.override_count() > 0 {
        info!(
            "{} override entries, {} of them replace interpreted entries",
            map.override_count(),
            map.shadowed_count()
        );
    }

    map.resolved()
        .map(|(entry, layer)| match layer {
            Layer::Base => entry.clone(),
            Layer::Override => {
                let total_count = map
                    .base_value(&entry.normalized)
                    .map(|b| b.total_count)
                    .unwrap_or(entry.total_count);
                CompoundTagEntry {
                    normalized: entry.normalized.clone(),
                    total_count,
                    segments: entry.segments.iter().map(mark_manual).collect(),
                }
            }
        })
        .collect()
}

fn mark_manual(segment: &TagSegment) -> TagSegment {
    let reason = if segment.reason.trim().is_empty() {
        OVERRIDE_REASON.to_string()
    } else {
        format!("{}: {}", OVERRIDE_REASON, segment.reason.trim())
    };
    TagSegment::new(segment.text.clone(), segment.kind, reason)
}

/// Split segments by kind (deduplicated, order kept) and bucket the tag
pub fn partition(entry: &CompoundTagEntry) -> PostprocessedTagEntry {
    let mut styles = Vec::new();
    let mut descriptors = Vec::new();
    let mut invalid_segments = Vec::new();

    for segment in &entry.segments {
        let Some(text) = normalize_non_empty(&segment.text) else {
            continue;
        };
        let target = match segment.kind {
            SegmentKind::Style => &mut styles,
            SegmentKind::Descriptor => &mut descriptors,
            SegmentKind::Invalid => &mut invalid_segments,
        };
        push_distinct(target, &text, None);
    }

    let bucket = Bucket::classify(!styles.is_empty(), !descriptors.is_empty());
    PostprocessedTagEntry {
        normalized: entry.normalized.clone(),
        total_count: entry.total_count,
        styles,
        descriptors,
        invalid_segments,
        bucket,
    }
}
