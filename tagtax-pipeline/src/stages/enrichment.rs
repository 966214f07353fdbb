//! Shared driver for the classification-backed stages
//!
//! One unit at a time: prompt, call, decode, record. A recorded unit is on
//! disk before the next call starts, so an interrupted run loses at most the
//! call in flight. Failures go through the stage's [`ErrorPolicy`].

use super::{Stage, StageReport};
use crate::classifier::{decode_response, Classifier, ServiceReply};
use crate::error::{StageError, StageResult};
use crate::policy::ErrorPolicy;
use std::collections::HashSet;
use tagtax_common::checkpoint::CheckpointStore;
use tagtax_common::config::ErrorAction;
use tracing::{debug, info, warn};

/// Progress is logged every this many units
const PROGRESS_INTERVAL: usize = 25;

/// What a stage contributes to the driver
pub trait EnrichmentTask {
    type Input;
    type Reply: ServiceReply;
    type Record;

    fn stage(&self) -> Stage;

    fn key<'a>(&self, input: &'a Self::Input) -> &'a str;

    fn prompt(&self, input: &Self::Input) -> String;

    /// Turn a validated reply into the ledger record for `input`
    fn record(&self, input: &Self::Input, reply: Self::Reply) -> Self::Record;
}

/// Process every input whose key is not yet in `checkpoint`
///
/// Inputs are handled in the order given; duplicate keys after the first
/// are ignored.
pub async fn run_enrichment<T, C>(
    task: &T,
    inputs: Vec<T::Input>,
    checkpoint: &mut C,
    classifier: &dyn Classifier,
    policy: ErrorPolicy,
    limit: Option<usize>,
) -> StageResult<StageReport>
where
    T: EnrichmentTask,
    C: CheckpointStore<T::Record>,
{
    let stage = task.stage();
    let mut report = StageReport::new(stage);

    let mut seen = HashSet::new();
    let mut pending = Vec::new();
    for input in inputs {
        let key = task.key(&input).to_string();
        if !seen.insert(key.clone()) {
            continue;
        }
        if checkpoint.has_processed(&key) {
            report.skipped += 1;
        } else {
            pending.push(input);
        }
    }
    report.total = seen.len();

    if let Some(limit) = limit {
        if pending.len() > limit {
            report.deferred = pending.len() - limit;
            pending.truncate(limit);
        }
    }

    info!(
        stage = stage.name(),
        model = classifier.model(),
        "{} pending, {} already done, {} deferred by limit",
        pending.len(),
        report.skipped,
        report.deferred
    );

    let batch = pending.len();
    for (index, input) in pending.iter().enumerate() {
        let key = task.key(input);
        debug!(stage = stage.name(), key = %key, "Classifying");

        let outcome = match classifier.complete(&task.prompt(input)).await {
            Ok(text) => decode_response::<T::Reply>(&text).map_err(|source| {
                (
                    policy.on_parse_error,
                    StageError::Decode {
                        key: key.to_string(),
                        source,
                    },
                )
            }),
            Err(source) => Err((
                policy.on_service_error,
                StageError::Service {
                    key: key.to_string(),
                    source,
                },
            )),
        };

        match outcome {
            Ok(reply) => {
                let record = task.record(input, reply);
                if checkpoint.record_result(key, &record)? {
                    report.succeeded += 1;
                    report.written += 1;
                } else {
                    report.skipped += 1;
                }
            }
            Err((ErrorAction::Skip, error)) => {
                report.failed += 1;
                warn!(stage = stage.name(), key = %key, "Skipped: {}", error);
            }
            Err((ErrorAction::Abort, error)) => {
                report.failed += 1;
                tracing::error!(
                    stage = stage.name(),
                    key = %key,
                    "Aborting after {} of {}: {}",
                    index,
                    batch,
                    report.display_string()
                );
                return Err(error);
            }
        }

        let done = index + 1;
        if done % PROGRESS_INTERVAL == 0 || done == batch {
            info!(stage = stage.name(), "Progress: {} / {}", done, batch);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierError;
    use crate::classifier::CanonicalReply;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tagtax_common::checkpoint::MemoryCheckpoint;
    use tagtax_common::models::{CanonicalStyleEntry, StyleAction};

    struct Echo;

    impl EnrichmentTask for Echo {
        type Input = String;
        type Reply = CanonicalReply;
        type Record = CanonicalStyleEntry;

        fn stage(&self) -> Stage {
            Stage::Canonicalize
        }

        fn key<'a>(&self, input: &'a String) -> &'a str {
            input
        }

        fn prompt(&self, input: &String) -> String {
            input.clone()
        }

        fn record(&self, input: &String, reply: CanonicalReply) -> CanonicalStyleEntry {
            CanonicalStyleEntry {
                style: input.clone(),
                canonical_style: reply.canonical_style,
                action: reply.action,
                reason: reply.reason,
                total_count: 1,
            }
        }
    }

    /// Answers by prompt text; a missing answer is a service error
    struct Table {
        answers: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl Table {
        fn new(answers: &[(&str, &str)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Classifier for Table {
        fn model(&self) -> &str {
            "table"
        }

        async fn complete(&self, prompt: &str) -> Result<String, ClassifierError> {
            self.calls.lock().unwrap().push(prompt.to_string());
            self.answers
                .get(prompt)
                .cloned()
                .ok_or_else(|| ClassifierError::Network("unreachable".to_string()))
        }
    }

    const KEEP: &str = r#"{"canonical_style":"","action":"keep"}"#;

    fn inputs(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn test_skips_recorded_keys_and_duplicates() {
        let classifier = Table::new(&[("a", KEEP), ("b", KEEP)]);
        let mut checkpoint = MemoryCheckpoint::new();
        checkpoint
            .record_result(
                "a",
                &Echo.record(&"a".to_string(), decode_response(KEEP).unwrap()),
            )
            .unwrap();

        let report = run_enrichment(
            &Echo,
            inputs(&["a", "b", "b"]),
            &mut checkpoint,
            &classifier,
            ErrorPolicy::ABORT_ALL,
            None,
        )
        .await
        .unwrap();

        assert_eq!(classifier.calls(), vec!["b"]);
        assert_eq!(report.total, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(
            report.total,
            report.succeeded + report.failed + report.skipped + report.deferred
        );
        assert_eq!(checkpoint.get("b").unwrap().action, StyleAction::Keep);
    }

    #[tokio::test]
    async fn test_limit_defers_remaining_units() {
        let classifier = Table::new(&[("a", KEEP), ("b", KEEP), ("c", KEEP)]);
        let mut checkpoint = MemoryCheckpoint::new();

        let report = run_enrichment(
            &Echo,
            inputs(&["a", "b", "c"]),
            &mut checkpoint,
            &classifier,
            ErrorPolicy::ABORT_ALL,
            Some(2),
        )
        .await
        .unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.deferred, 1);
        assert!(!checkpoint.has_processed("c"));
    }

    #[tokio::test]
    async fn test_skip_policy_continues_past_failures() {
        let classifier = Table::new(&[("a", "not json at all"), ("c", KEEP)]);
        let mut checkpoint = MemoryCheckpoint::new();

        let report = run_enrichment(
            &Echo,
            inputs(&["a", "b", "c"]),
            &mut checkpoint,
            &classifier,
            ErrorPolicy::SKIP_ALL,
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.failed, 2);
        assert_eq!(report.succeeded, 1);
        assert!(checkpoint.has_processed("c"));
        assert!(!checkpoint.has_processed("a"));
    }

    #[tokio::test]
    async fn test_abort_policy_stops_at_first_failure() {
        let classifier = Table::new(&[("a", KEEP), ("b", "```json\n{\"action\": 5}\n```"), ("c", KEEP)]);
        let mut checkpoint = MemoryCheckpoint::new();

        let result = run_enrichment(
            &Echo,
            inputs(&["a", "b", "c"]),
            &mut checkpoint,
            &classifier,
            ErrorPolicy::ABORT_ALL,
            None,
        )
        .await;

        assert!(matches!(result, Err(StageError::Decode { ref key, .. }) if key == "b"));
        assert!(checkpoint.has_processed("a"));
        assert_eq!(classifier.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_service_error_uses_service_policy() {
        let classifier = Table::new(&[]);
        let mut checkpoint = MemoryCheckpoint::<CanonicalStyleEntry>::new();
        let policy = ErrorPolicy {
            on_parse_error: ErrorAction::Skip,
            on_service_error: ErrorAction::Abort,
        };

        let result = run_enrichment(
            &Echo,
            inputs(&["a"]),
            &mut checkpoint,
            &classifier,
            policy,
            None,
        )
        .await;

        assert!(matches!(result, Err(StageError::Service { .. })));
    }
}
