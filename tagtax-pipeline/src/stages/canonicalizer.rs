//! Stage 6: keep / alias / reject each raw style

use super::enrichment::{run_enrichment, EnrichmentTask};
use super::{by_total_then_key, Stage, StageReport};
use crate::classifier::{CanonicalReply, Classifier};
use crate::error::StageResult;
use crate::policy::ErrorPolicy;
use crate::prompts::canonicalize_prompt;
use tagtax_common::checkpoint::LedgerCheckpoint;
use tagtax_common::ledger::read_ledger;
use tagtax_common::models::{CanonicalStyleEntry, RawStyleEntry, StyleAction};
use tagtax_common::paths::LedgerPaths;
use tracing::debug;

pub struct CanonicalizeTask;

impl EnrichmentTask for CanonicalizeTask {
    type Input = RawStyleEntry;
    type Reply = CanonicalReply;
    type Record = CanonicalStyleEntry;

    fn stage(&self) -> Stage {
        Stage::Canonicalize
    }

    fn key<'a>(&self, input: &'a RawStyleEntry) -> &'a str {
        &input.style
    }

    fn prompt(&self, input: &RawStyleEntry) -> String {
        canonicalize_prompt(input)
    }

    fn record(&self, input: &RawStyleEntry, reply: CanonicalReply) -> CanonicalStyleEntry {
        canonical_entry(input, reply)
    }
}

/// Ledger record for a decision
///
/// `keep` records the style itself; an alias onto itself is a `keep`;
/// `reject` records an empty canonical name.
pub fn canonical_entry(input: &RawStyleEntry, reply: CanonicalReply) -> CanonicalStyleEntry {
    let (action, canonical_style) = match reply.action {
        StyleAction::Keep => (StyleAction::Keep, input.style.clone()),
        StyleAction::Alias if reply.canonical_style == input.style => {
            (StyleAction::Keep, input.style.clone())
        }
        StyleAction::Alias => (StyleAction::Alias, reply.canonical_style),
        StyleAction::Reject => (StyleAction::Reject, String::new()),
    };
    debug!(
        style = %input.style,
        action = action.as_str(),
        canonical = %canonical_style,
        "Canonical decision"
    );

    CanonicalStyleEntry {
        style: input.style.clone(),
        canonical_style,
        action,
        reason: reply.reason,
        total_count: input.total_count,
    }
}

pub async fn canonicalize(
    paths: &LedgerPaths,
    classifier: &dyn Classifier,
    policy: ErrorPolicy,
    limit: Option<usize>,
) -> StageResult<StageReport> {
    let mut styles: Vec<RawStyleEntry> = read_ledger(&paths.raw_styles())?;
    styles.sort_by(|a, b| {
        by_total_then_key(
            (a.total_count, a.style.as_str()),
            (b.total_count, b.style.as_str()),
        )
    });

    let mut checkpoint = LedgerCheckpoint::<CanonicalStyleEntry>::open(&paths.canonical_styles())?;
    run_enrichment(&CanonicalizeTask, styles, &mut checkpoint, classifier, policy, limit).await
}
