//! Stage 7: genre / subgenre classification of canonical styles
//!
//! Raw style statistics are folded onto canonical names through the
//! [`CanonicalResolver`] first, so each canonical style is asked about once
//! with the combined usage of all its spellings.

use super::enrichment::{run_enrichment, EnrichmentTask};
use super::{by_total_then_key, push_distinct, Stage, StageReport};
use crate::classifier::{Classifier, HierarchyReply};
use crate::error::StageResult;
use crate::policy::ErrorPolicy;
use crate::prompts::hierarchy_prompt;
use std::collections::HashMap;
use tagtax_common::canonical::{CanonicalResolver, StyleResolution};
use tagtax_common::checkpoint::LedgerCheckpoint;
use tagtax_common::ledger::{read_keyed_ledger, read_ledger};
use tagtax_common::models::{CanonicalStyleEntry, RawStyleEntry, StyleHierarchyEntry};
use tagtax_common::paths::LedgerPaths;
use tracing::{info, warn};

pub const MAX_EXAMPLE_TAGS: usize = 5;

/// Raw styles folded onto canonical names
#[derive(Debug, Clone, Default)]
pub struct CanonicalAggregate {
    /// One entry per canonical style, sorted by descending total
    pub styles: Vec<RawStyleEntry>,
    /// Raw styles with no canonical decision yet
    pub pending: usize,
    pub rejected: usize,
    /// Alias cycles the resolver collapsed onto one name
    pub alias_cycles: usize,
}

pub fn aggregate_canonical(
    raw: &[RawStyleEntry],
    resolver: &CanonicalResolver,
) -> CanonicalAggregate {
    let mut aggregate = CanonicalAggregate {
        alias_cycles: resolver.alias_cycles(),
        ..CanonicalAggregate::default()
    };
    let mut by_name: HashMap<String, RawStyleEntry> = HashMap::new();

    for entry in raw {
        match resolver.resolve_detailed(&entry.style) {
            StyleResolution::Unmapped => aggregate.pending += 1,
            StyleResolution::Rejected => aggregate.rejected += 1,
            StyleResolution::Canonical(name) => {
                let acc = by_name.entry(name.clone()).or_insert_with(|| RawStyleEntry {
                    style: name,
                    total_count: 0,
                    tag_count: 0,
                    example_tags: Vec::new(),
                });
                acc.total_count += entry.total_count;
                acc.tag_count += entry.tag_count;
                for example in &entry.example_tags {
                    push_distinct(&mut acc.example_tags, example, Some(MAX_EXAMPLE_TAGS));
                }
            }
        }
    }

    aggregate.styles = by_name.into_values().collect();
    aggregate.styles.sort_by(|a, b| {
        by_total_then_key(
            (a.total_count, a.style.as_str()),
            (b.total_count, b.style.as_str()),
        )
    });
    aggregate
}

pub struct HierarchyTask<'r> {
    resolver: &'r CanonicalResolver,
}

impl<'r> HierarchyTask<'r> {
    pub fn new(resolver: &'r CanonicalResolver) -> Self {
        Self { resolver }
    }

    /// Ledger record for a reply
    ///
    /// The parent is resolved to its canonical name when it has one. A
    /// style named as its own parent, a subgenre without a parent, or one
    /// whose parent was rejected as a style is recorded as a genre.
    pub fn hierarchy_entry(
        &self,
        input: &RawStyleEntry,
        reply: HierarchyReply,
    ) -> StyleHierarchyEntry {
        let parent = if reply.is_subgenre && !reply.parent_genre.is_empty() {
            match self.resolver.resolve_detailed(&reply.parent_genre) {
                StyleResolution::Canonical(name) => name,
                StyleResolution::Unmapped => reply.parent_genre,
                StyleResolution::Rejected => String::new(),
            }
        } else {
            String::new()
        };

        let (is_subgenre, parent_genre) = if parent.is_empty() || parent == input.style {
            (false, String::new())
        } else {
            (true, parent)
        };

        StyleHierarchyEntry {
            style: input.style.clone(),
            total_count: input.total_count,
            is_subgenre,
            parent_genre,
            reason: reply.reason,
        }
    }
}

impl EnrichmentTask for HierarchyTask<'_> {
    type Input = RawStyleEntry;
    type Reply = HierarchyReply;
    type Record = StyleHierarchyEntry;

    fn stage(&self) -> Stage {
        Stage::ClassifyHierarchy
    }

    fn key<'a>(&self, input: &'a RawStyleEntry) -> &'a str {
        &input.style
    }

    fn prompt(&self, input: &RawStyleEntry) -> String {
        hierarchy_prompt(input)
    }

    fn record(&self, input: &RawStyleEntry, reply: HierarchyReply) -> StyleHierarchyEntry {
        self.hierarchy_entry(input, reply)
    }
}

pub async fn classify(
    paths: &LedgerPaths,
    classifier: &dyn Classifier,
    policy: ErrorPolicy,
    limit: Option<usize>,
) -> StageResult<StageReport> {
    let raw: Vec<RawStyleEntry> = read_ledger(&paths.raw_styles())?;
    let (canonical, _) = read_keyed_ledger::<CanonicalStyleEntry>(&paths.canonical_styles())?;
    let resolver = CanonicalResolver::new(&canonical);

    let aggregate = aggregate_canonical(&raw, &resolver);
    info!(
        "{} canonical styles from {} raw styles ({} rejected)",
        aggregate.styles.len(),
        raw.len(),
        aggregate.rejected
    );
    if aggregate.alias_cycles > 0 {
        warn!(
            "{} alias cycles in the canonical map were collapsed; review canonical_styles",
            aggregate.alias_cycles
        );
    }
    if aggregate.pending > 0 {
        warn!(
            "{} raw styles are not canonicalized yet and are left out; run canonicalize first",
            aggregate.pending
        );
    }

    let task = HierarchyTask::new(&resolver);
    let mut checkpoint = LedgerCheckpoint::<StyleHierarchyEntry>::open(&paths.style_hierarchy())?;
    run_enrichment(&task, aggregate.styles, &mut checkpoint, classifier, policy, limit).await
}
