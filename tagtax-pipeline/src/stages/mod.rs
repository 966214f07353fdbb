//! Pipeline stages
//!
//! Each stage reads the ledgers of the stages before it and writes its own.
//! Reduction stages rewrite their output atomically every run; the three
//! classification-backed stages append one line per completed unit and
//! resume from whatever is already on disk.

pub mod aggregator;
pub mod canonicalizer;
pub mod collector;
pub mod enrichment;
pub mod finalizer;
pub mod hierarchy;
pub mod interpreter;
pub mod mapping_compiler;
pub mod postprocessor;
pub mod style_harvester;

use crate::blacklist::Blacklist;
use crate::classifier::Classifier;
use crate::error::{StageError, StageResult};
use crate::policy::ErrorPolicy;
use std::fmt;
use tagtax_common::config::TomlConfig;
use tagtax_common::paths::LedgerPaths;
use tracing::info;

/// The ordered, numbered stage list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Collect,
    Aggregate,
    Interpret,
    Postprocess,
    HarvestStyles,
    Canonicalize,
    ClassifyHierarchy,
    FinalizeTaxonomy,
    CompileMapping,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Collect,
        Stage::Aggregate,
        Stage::Interpret,
        Stage::Postprocess,
        Stage::HarvestStyles,
        Stage::Canonicalize,
        Stage::ClassifyHierarchy,
        Stage::FinalizeTaxonomy,
        Stage::CompileMapping,
    ];

    pub const LAST: u8 = Self::ALL.len() as u8;

    /// 1-based position in the pipeline
    pub fn number(self) -> u8 {
        match self {
            Stage::Collect => 1,
            Stage::Aggregate => 2,
            Stage::Interpret => 3,
            Stage::Postprocess => 4,
            Stage::HarvestStyles => 5,
            Stage::Canonicalize => 6,
            Stage::ClassifyHierarchy => 7,
            Stage::FinalizeTaxonomy => 8,
            Stage::CompileMapping => 9,
        }
    }

    /// CLI subcommand name
    pub fn name(self) -> &'static str {
        match self {
            Stage::Collect => "collect",
            Stage::Aggregate => "aggregate",
            Stage::Interpret => "interpret",
            Stage::Postprocess => "postprocess",
            Stage::HarvestStyles => "harvest-styles",
            Stage::Canonicalize => "canonicalize",
            Stage::ClassifyHierarchy => "classify-hierarchy",
            Stage::FinalizeTaxonomy => "finalize-taxonomy",
            Stage::CompileMapping => "compile-mapping",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::Collect => "Harvest and blacklist-filter tags from entity metadata",
            Stage::Aggregate => "Group raw tags into per-tag statistics",
            Stage::Interpret => "Split each tag into style / descriptor / invalid parts",
            Stage::Postprocess => "Merge manual overrides, bucket tags, list blacklist candidates",
            Stage::HarvestStyles => "Aggregate style parts into per-style statistics",
            Stage::Canonicalize => "Keep, alias or reject each raw style",
            Stage::ClassifyHierarchy => "Classify each canonical style as genre or subgenre",
            Stage::FinalizeTaxonomy => "Build taxonomy, genre summary and tag-to-style map",
            Stage::CompileMapping => "Write the final tag expansion mapping",
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.number() == number)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }

    /// Appends one line per unit and skips units already recorded
    pub fn is_resumable(self) -> bool {
        matches!(
            self,
            Stage::Interpret | Stage::Canonicalize | Stage::ClassifyHierarchy
        )
    }

    pub fn needs_classifier(self) -> bool {
        self.is_resumable()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.name())
    }
}

/// Everything a stage needs to locate and interpret its ledgers
#[derive(Debug, Clone)]
pub struct StageContext {
    pub paths: LedgerPaths,
    pub config: TomlConfig,
}

impl StageContext {
    pub fn new(paths: LedgerPaths, config: TomlConfig) -> Self {
        Self { paths, config }
    }

    pub fn policy(&self, stage: Stage) -> ErrorPolicy {
        ErrorPolicy::for_stage(stage, &self.config)
    }
}

/// Counts reported by one stage run
///
/// Display: "X units: Y succeeded, Z failed, W already done, V deferred, N lines written"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    /// Units considered this run
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Units already recorded by an earlier run
    pub skipped: usize,
    /// Pending units left for a later run by `--limit`
    pub deferred: usize,
    /// Output ledger lines written (or appended) this run
    pub written: usize,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            deferred: 0,
            written: 0,
        }
    }

    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} units: {} succeeded, {} failed, {} already done, {} deferred, {} lines written",
            self.total, self.succeeded, self.failed, self.skipped, self.deferred, self.written
        )
    }

    pub(crate) fn log_summary(&self) {
        info!(
            stage = self.stage.name(),
            processed = self.processed(),
            succeeded = self.succeeded,
            failed = self.failed,
            skipped = self.skipped,
            "Stage complete: {}",
            self.display_string()
        );
    }
}

/// Run one stage in-process
///
/// `limit` caps how many pending units a classification-backed stage
/// handles this run; reduction stages ignore it.
pub async fn run_stage(
    stage: Stage,
    ctx: &StageContext,
    classifier: Option<&dyn Classifier>,
    limit: Option<usize>,
) -> StageResult<StageReport> {
    info!(stage = stage.name(), "Starting stage {}: {}", stage, stage.description());

    let require = || classifier.ok_or(StageError::ClassifierRequired(stage.name()));

    let report = match stage {
        Stage::Collect => {
            let blacklist = Blacklist::load(&ctx.paths.blacklist())?;
            collector::collect(&ctx.paths, &ctx.config.collector, blacklist)?
        }
        Stage::Aggregate => aggregator::aggregate(&ctx.paths)?,
        Stage::Interpret => {
            interpreter::interpret(&ctx.paths, require()?, ctx.policy(stage), limit).await?
        }
        Stage::Postprocess => postprocessor::postprocess(&ctx.paths)?,
        Stage::HarvestStyles => style_harvester::harvest(&ctx.paths)?,
        Stage::Canonicalize => {
            canonicalizer::canonicalize(&ctx.paths, require()?, ctx.policy(stage), limit).await?
        }
        Stage::ClassifyHierarchy => {
            hierarchy::classify(&ctx.paths, require()?, ctx.policy(stage), limit).await?
        }
        Stage::FinalizeTaxonomy => finalizer::finalize(&ctx.paths)?,
        Stage::CompileMapping => mapping_compiler::compile(&ctx.paths)?,
    };

    report.log_summary();
    Ok(report)
}

/// Descending total, ties by key ascending
pub(crate) fn by_total_then_key(a: (u64, &str), b: (u64, &str)) -> std::cmp::Ordering {
    b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1))
}

/// Push `value` unless present or `cap` reached
pub(crate) fn push_distinct(list: &mut Vec<String>, value: &str, cap: Option<usize>) {
    if cap.is_some_and(|c| list.len() >= c) {
        return;
    }
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
