//! Stage 2: group raw tag occurrences by normalized tag

use super::{by_total_then_key, push_distinct, Stage, StageReport};
use crate::error::StageResult;
use std::collections::{BTreeMap, HashMap, HashSet};
use tagtax_common::ledger::{read_ledger_contents, write_ledger};
use tagtax_common::models::{NormalizedTagEntry, RawTagRecord};
use tagtax_common::paths::LedgerPaths;
use tracing::info;

pub const MAX_EXAMPLE_RAW_TAGS: usize = 5;

#[derive(Default)]
struct TagAccumulator {
    total: u64,
    entities: HashSet<String>,
    sources: BTreeMap<String, u64>,
    examples: Vec<String>,
}

pub fn aggregate(paths: &LedgerPaths) -> StageResult<StageReport> {
    let mut report = StageReport::new(Stage::Aggregate);
    let contents = read_ledger_contents::<RawTagRecord>(&paths.raw_tags())?;
    report.total = contents.records.len() + contents.malformed_lines;
    report.failed = contents.malformed_lines;
    report.succeeded = contents.records.len();

    let entries = aggregate_records(&contents.records);
    report.written = write_ledger(&paths.normalized_tags(), &entries)?;

    info!(
        "Aggregated {} occurrences into {} distinct tags",
        contents.records.len(),
        entries.len()
    );
    Ok(report)
}

/// Pure reduction; output sorted by descending total, ties by tag
pub fn aggregate_records(records: &[RawTagRecord]) -> Vec<NormalizedTagEntry> {
    let mut groups: HashMap<&str, TagAccumulator> = HashMap::new();

    for record in records {
        if record.normalized_tag.is_empty() {
            continue;
        }
        let acc = groups.entry(record.normalized_tag.as_str()).or_default();
        acc.total += 1;
        acc.entities.insert(record.entity_id.clone());
        *acc.sources.entry(record.source.clone()).or_insert(0) += 1;
        push_distinct(&mut acc.examples, &record.raw_tag, Some(MAX_EXAMPLE_RAW_TAGS));
    }

    let mut entries: Vec<NormalizedTagEntry> = groups
        .into_iter()
        .map(|(tag, acc)| NormalizedTagEntry {
            normalized: tag.to_string(),
            total_count: acc.total,
            entity_count: acc.entities.len() as u64,
            source_counts: acc.sources,
            example_raw_tags: acc.examples,
        })
        .collect();

    entries.sort_by(|a, b| {
        by_total_then_key(
            (a.total_count, a.normalized.as_str()),
            (b.total_count, b.normalized.as_str()),
        )
    });
    entries
}
