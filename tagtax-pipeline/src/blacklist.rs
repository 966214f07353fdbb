//! Tag blacklist: loading, lookup and candidate application

use chrono::{SecondsFormat, Utc};
use std::collections::HashSet;
use std::path::Path;
use tagtax_common::ledger::{read_json_file, read_ledger_if_exists, write_json_file};
use tagtax_common::models::{BlacklistCandidate, BlacklistFile};
use tagtax_common::normalize::normalize_non_empty;
use tagtax_common::{normalize_tag, Error, Result};
use tracing::{info, warn};

/// Set of normalized tags the collector routes to the removed ledger
///
/// Built once and passed to the collector by value.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    tags: HashSet<String>,
}

impl Blacklist {
    /// Load the blacklist file; a missing file is an empty blacklist
    pub fn load(path: &Path) -> Result<Self> {
        match read_json_file::<BlacklistFile>(path) {
            Ok(file) => {
                let blacklist = Self::from_tags(&file.blacklisted_tags);
                info!(
                    "Blacklist loaded from {} ({} tags)",
                    path.display(),
                    blacklist.len()
                );
                Ok(blacklist)
            }
            Err(Error::NotFound(_)) => {
                warn!("No blacklist at {}, nothing will be filtered", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        let tags = tags
            .iter()
            .filter_map(|t| normalize_non_empty(t.as_ref()))
            .collect();
        Self { tags }
    }

    /// Case-insensitive match after normalization
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(&normalize_tag(tag))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Result of merging reviewed candidates into the blacklist file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistUpdate {
    pub candidates: usize,
    pub added: usize,
    pub total: usize,
}

/// Merge every candidate ledger entry into the blacklist file
///
/// Existing entries keep their order, new tags are appended in candidate
/// order. `lastUpdated` is set; other annotation keys are preserved.
pub fn apply_candidates(blacklist_path: &Path, candidates_path: &Path) -> Result<BlacklistUpdate> {
    let candidates: Vec<BlacklistCandidate> = read_ledger_if_exists(candidates_path)?;

    let mut file = match read_json_file::<BlacklistFile>(blacklist_path) {
        Ok(file) => file,
        Err(Error::NotFound(_)) => BlacklistFile::default(),
        Err(e) => return Err(e),
    };

    let mut present: HashSet<String> = file
        .blacklisted_tags
        .iter()
        .map(|t| normalize_tag(t))
        .collect();

    let mut added = 0usize;
    for candidate in &candidates {
        let Some(tag) = normalize_non_empty(&candidate.normalized) else {
            continue;
        };
        if present.insert(tag.clone()) {
            file.blacklisted_tags.push(tag);
            added += 1;
        }
    }

    file.last_updated = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    write_json_file(blacklist_path, &file)?;

    info!(
        "Blacklist updated: {} candidates, {} added, {} total",
        candidates.len(),
        added,
        file.blacklisted_tags.len()
    );

    Ok(BlacklistUpdate {
        candidates: candidates.len(),
        added,
        total: file.blacklisted_tags.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tagtax_common::ledger::write_ledger;
    use tagtax_common::models::{SegmentKind, TagSegment};
    use tempfile::TempDir;

    fn candidate(tag: &str) -> BlacklistCandidate {
        BlacklistCandidate {
            normalized: tag.to_string(),
            total_count: 3,
            segments: vec![TagSegment::new(tag, SegmentKind::Invalid, "noise")],
            reason: "no style or descriptor segments".to_string(),
        }
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let blacklist = Blacklist::from_tags(&["Seen Live", "  favorites "]);
        assert!(blacklist.contains("seen live"));
        assert!(blacklist.contains("SEEN   LIVE"));
        assert!(blacklist.contains("Favorites"));
        assert!(!blacklist.contains("rock"));
        assert_eq!(blacklist.len(), 2);
        assert_eq!(Blacklist::from_tags(&["   ", "\t"]).len(), 0);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let blacklist = Blacklist::load(&dir.path().join("tag_blacklist.json")).unwrap();
        assert!(blacklist.is_empty());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tag_blacklist.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Blacklist::load(&path).is_err());
    }

    #[test]
    fn test_apply_candidates_preserves_annotations() {
        let dir = TempDir::new().unwrap();
        let blacklist_path = dir.path().join("tag_blacklist.json");
        let candidates_path = dir.path().join("blacklist_candidates.jsonl");

        std::fs::write(
            &blacklist_path,
            r#"{"blacklistedTags":["seen live"],"model":"llama3.1:8b"}"#,
        )
        .unwrap();
        write_ledger(
            &candidates_path,
            &[candidate("seen live"), candidate("my favorites")],
        )
        .unwrap();

        let update = apply_candidates(&blacklist_path, &candidates_path).unwrap();
        assert_eq!(
            update,
            BlacklistUpdate {
                candidates: 2,
                added: 1,
                total: 2
            }
        );

        let file: BlacklistFile = read_json_file(&blacklist_path).unwrap();
        assert_eq!(file.blacklisted_tags, vec!["seen live", "my favorites"]);
        assert!(file.last_updated.is_some());
        assert_eq!(file.annotations.get("model"), Some(&Value::from("llama3.1:8b")));

        let reloaded = Blacklist::load(&blacklist_path).unwrap();
        assert!(reloaded.contains("My Favorites"));
    }

    #[test]
    fn test_apply_candidates_creates_missing_blacklist() {
        let dir = TempDir::new().unwrap();
        let blacklist_path = dir.path().join("tag_blacklist.json");
        let candidates_path = dir.path().join("blacklist_candidates.jsonl");
        write_ledger(&candidates_path, &[candidate("asdf")]).unwrap();

        let update = apply_candidates(&blacklist_path, &candidates_path).unwrap();
        assert_eq!(update.added, 1);
        assert!(blacklist_path.exists());
    }
}
