//! Stage 5: per-style usage statistics from postprocessed tags

use super::{by_total_then_key, push_distinct, Stage, StageReport};
use crate::error::StageResult;
use std::collections::{HashMap, HashSet};
use tagtax_common::ledger::{read_ledger, write_ledger};
use tagtax_common::models::{PostprocessedTagEntry, RawStyleEntry};
use tagtax_common::paths::LedgerPaths;
use tracing::info;

pub const MAX_EXAMPLE_TAGS: usize = 5;

pub fn harvest(paths: &LedgerPaths) -> StageResult<StageReport> {
    let mut report = StageReport::new(Stage::HarvestStyles);
    let tags: Vec<PostprocessedTagEntry> = read_ledger(&paths.postprocessed_tags())?;
    report.total = tags.len();

    let styles = harvest_styles(&tags);
    report.succeeded = tags.iter().filter(|t| !t.styles.is_empty()).count();
    report.skipped = report.total - report.succeeded;
    report.written = write_ledger(&paths.raw_styles(), &styles)?;

    info!(
        "Harvested {} distinct styles from {} tags",
        styles.len(),
        report.succeeded
    );
    Ok(report)
}

/// Each unique style of a tag gains the tag's total and one tag count
pub fn harvest_styles(tags: &[PostprocessedTagEntry]) -> Vec<RawStyleEntry> {
    let mut styles: HashMap<&str, RawStyleEntry> = HashMap::new();

    for tag in tags {
        let unique: HashSet<&str> = tag.styles.iter().map(String::as_str).collect();
        for style in unique {
            let entry = styles.entry(style).or_insert_with(|| RawStyleEntry {
                style: style.to_string(),
                total_count: 0,
                tag_count: 0,
                example_tags: Vec::new(),
            });
            entry.total_count += tag.total_count;
            entry.tag_count += 1;
            push_distinct(&mut entry.example_tags, &tag.normalized, Some(MAX_EXAMPLE_TAGS));
        }
    }

    let mut styles: Vec<RawStyleEntry> = styles.into_values().collect();
    styles.sort_by(|a, b| {
        by_total_then_key(
            (a.total_count, a.style.as_str()),
            (b.total_count, b.style.as_str()),
        )
    });
    styles
}
