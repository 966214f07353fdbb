//! Stage 3: compound tag interpretation
//!
//! Highest-impact tags go first. Each interpreted tag is appended to the
//! compound ledger as soon as its reply decodes.

use super::enrichment::{run_enrichment, EnrichmentTask};
use super::{by_total_then_key, Stage, StageReport};
use crate::classifier::{Classifier, CompoundReply};
use crate::error::StageResult;
use crate::policy::ErrorPolicy;
use crate::prompts::interpret_prompt;
use tagtax_common::checkpoint::LedgerCheckpoint;
use tagtax_common::ledger::read_ledger;
use tagtax_common::models::{CompoundTagEntry, NormalizedTagEntry, TagSegment};
use tagtax_common::paths::LedgerPaths;
use tracing::debug;

pub struct InterpretTask;

impl EnrichmentTask for InterpretTask {
    type Input = NormalizedTagEntry;
    type Reply = CompoundReply;
    type Record = CompoundTagEntry;

    fn stage(&self) -> Stage {
        Stage::Interpret
    }

    fn key<'a>(&self, input: &'a NormalizedTagEntry) -> &'a str {
        &input.normalized
    }

    fn prompt(&self, input: &NormalizedTagEntry) -> String {
        interpret_prompt(&input.normalized)
    }

    fn record(&self, input: &NormalizedTagEntry, reply: CompoundReply) -> CompoundTagEntry {
        debug!(tag = %input.normalized, parts = %describe_parts(&reply.parts), "Interpreted");
        CompoundTagEntry {
            normalized: input.normalized.clone(),
            total_count: input.total_count,
            segments: reply.parts,
        }
    }
}

/// `text (kind)` list for log lines
pub fn describe_parts(parts: &[TagSegment]) -> String {
    parts
        .iter()
        .map(|part| format!("{} ({})", part.text, part.kind.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn interpret(
    paths: &LedgerPaths,
    classifier: &dyn Classifier,
    policy: ErrorPolicy,
    limit: Option<usize>,
) -> StageResult<StageReport> {
    let mut tags: Vec<NormalizedTagEntry> = read_ledger(&paths.normalized_tags())?;
    tags.sort_by(|a, b| {
        by_total_then_key(
            (a.total_count, a.normalized.as_str()),
            (b.total_count, b.normalized.as_str()),
        )
    });

    let mut checkpoint = LedgerCheckpoint::<CompoundTagEntry>::open(&paths.compound_tags())?;
    run_enrichment(&InterpretTask, tags, &mut checkpoint, classifier, policy, limit).await
}
