//! Stage 9: compile the final tag → expansion-terms mapping file

use super::{Stage, StageReport};
use crate::error::StageResult;
use chrono::Utc;
use std::collections::BTreeMap;
use tagtax_common::ledger::{read_ledger, write_json_file};
use tagtax_common::models::{FinalMapping, TagStyleMapEntry};
use tagtax_common::paths::LedgerPaths;
use tracing::info;

pub fn compile(paths: &LedgerPaths) -> StageResult<StageReport> {
    let mut report = StageReport::new(Stage::CompileMapping);
    let entries: Vec<TagStyleMapEntry> = read_ledger(&paths.tag_style_map())?;
    report.total = entries.len();

    let mapping = compile_mapping(&entries);
    report.succeeded = mapping.mappings.len();
    report.skipped = entries.len() - mapping.mappings.len();

    let target = paths.final_mapping();
    write_json_file(&target, &mapping)?;
    report.written = 1;

    info!(
        "Wrote {} tag mappings to {}",
        mapping.mappings.len(),
        target.display()
    );
    Ok(report)
}

/// Entries with an empty expansion list are dropped
pub fn compile_mapping(entries: &[TagStyleMapEntry]) -> FinalMapping {
    let mappings: BTreeMap<String, Vec<String>> = entries
        .iter()
        .filter_map(|entry| {
            let terms = entry.expansion_terms();
            (!terms.is_empty()).then(|| (entry.normalized.clone(), terms))
        })
        .collect();

    FinalMapping {
        updated_at: Utc::now(),
        mappings,
    }
}
