//! Stage 1: harvest tags from per-entity metadata records
//!
//! Entity records are JSON objects; provider containers hold tag fields:
//!
//! ```json
//! { "id": "e1",
//!   "tags": ["Chill"],
//!   "lastfm": { "tags": ["Lo-Fi Hip-Hop"] },
//!   "musicbrainz": { "genres": [{ "name": "hip hop", "count": 3 }] } }
//! ```
//!
//! A field value may be a string, a list of strings, or a list of objects
//! with a `name`. Both output ledgers are rewritten on every run.

use super::{Stage, StageReport};
use crate::blacklist::Blacklist;
use crate::error::StageResult;
use serde_json::Value;
use std::path::Path;
use tagtax_common::config::CollectorConfig;
use tagtax_common::ledger::write_ledger;
use tagtax_common::models::{RawTagRecord, RemovedTagRecord};
use tagtax_common::normalize::normalize_non_empty;
use tagtax_common::paths::LedgerPaths;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const REMOVED_REASON: &str = "blacklisted";

/// Source label prefix for entity-local tag lists
const ENTITY_CONTAINER: &str = "entity";

/// Tag occurrences harvested from one entity, split by blacklist
#[derive(Debug, Default)]
pub struct CollectedTags {
    pub kept: Vec<RawTagRecord>,
    pub removed: Vec<RemovedTagRecord>,
}

/// Scan the entity directory and rewrite the raw and removed ledgers
pub fn collect(
    paths: &LedgerPaths,
    config: &CollectorConfig,
    blacklist: Blacklist,
) -> StageResult<StageReport> {
    let mut report = StageReport::new(Stage::Collect);
    let mut collected = CollectedTags::default();

    let files = entity_files(paths.entities_dir());
    report.total = files.len();
    info!(
        "Scanning {} entity files in {} ({} blacklisted tags)",
        files.len(),
        paths.entities_dir().display(),
        blacklist.len()
    );

    for path in &files {
        let record = match read_entity(path) {
            Ok(record) => record,
            Err(e) => {
                report.failed += 1;
                warn!("Skipping unparseable entity file {}: {}", path.display(), e);
                continue;
            }
        };
        let entity_id = entity_id(&record, path);
        extract_entity_tags(&entity_id, &record, config, &blacklist, &mut collected);
        report.succeeded += 1;
    }

    let kept = write_ledger(&paths.raw_tags(), &collected.kept)?;
    let removed = write_ledger(&paths.removed_tags(), &collected.removed)?;
    report.written = kept + removed;

    info!("Collected {} tag occurrences, {} removed by blacklist", kept, removed);
    Ok(report)
}

/// Every `*.json` file under `dir`, sorted by path; a missing dir is empty
pub fn entity_files(dir: &Path) -> Vec<std::path::PathBuf> {
    if !dir.is_dir() {
        warn!("Entity directory {} does not exist", dir.display());
        return Vec::new();
    }

    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error walking entity directory: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .map(|entry| entry.into_path())
        .collect()
}

fn read_entity(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    if !value.is_object() {
        anyhow::bail!("top-level value is not an object");
    }
    Ok(value)
}

/// `id` field when present, otherwise the file stem
fn entity_id(record: &Value, path: &Path) -> String {
    match record.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

/// Extract, normalize and blacklist-route every tag of one entity
pub fn extract_entity_tags(
    entity_id: &str,
    record: &Value,
    config: &CollectorConfig,
    blacklist: &Blacklist,
    out: &mut CollectedTags,
) {
    for source in &config.source_fields {
        let Some((container, field)) = source.split_once(':') else {
            warn!("Ignoring source field without container prefix: {}", source);
            continue;
        };
        if let Some(value) = record.get(container).and_then(|c| c.get(field)) {
            route(entity_id, source, tag_strings(value), blacklist, out);
        }
    }

    if let Some(value) = record.get(&config.entity_tag_field) {
        let source = format!("{}:{}", ENTITY_CONTAINER, config.entity_tag_field);
        route(entity_id, &source, tag_strings(value), blacklist, out);
    }
}

fn route(
    entity_id: &str,
    source: &str,
    raw_tags: Vec<&str>,
    blacklist: &Blacklist,
    out: &mut CollectedTags,
) {
    for raw_tag in raw_tags {
        let Some(normalized) = normalize_non_empty(raw_tag) else {
            continue;
        };
        let record = RawTagRecord {
            entity_id: entity_id.to_string(),
            raw_tag: raw_tag.to_string(),
            normalized_tag: normalized,
            source: source.to_string(),
        };
        if blacklist.contains(&record.normalized_tag) {
            debug!(entity = entity_id, tag = %record.normalized_tag, "Blacklisted");
            out.removed.push(RemovedTagRecord {
                record,
                reason: REMOVED_REASON.to_string(),
            });
        } else {
            out.kept.push(record);
        }
    }
}

/// Tag strings of one field value
fn tag_strings(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.as_str()),
                Value::Object(_) => item.get("name").and_then(Value::as_str),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
