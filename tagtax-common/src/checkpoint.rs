//! Checkpoint store for resumable stages
//!
//! A resumable stage asks the store whether a key was already processed and
//! records each completed unit as soon as it finishes. The ledger-backed
//! store reads its output ledger once when opened; afterwards the in-memory
//! key index only grows.

use crate::ledger::{read_keyed_ledger, LedgerAppender, LedgerRecord};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::path::Path;
use tracing::{info, warn};

pub trait CheckpointStore<V> {
    /// True when a result for `key` is already durable
    fn has_processed(&self, key: &str) -> bool;

    /// Durably record the result for `key`
    ///
    /// Returns `false` (and writes nothing) when `key` was already recorded,
    /// so a key is emitted at most once.
    fn record_result(&mut self, key: &str, value: &V) -> Result<bool>;

    /// Number of keys processed so far
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Checkpoint store backed by an append-only ledger file
pub struct LedgerCheckpoint<V> {
    keys: HashSet<String>,
    appender: LedgerAppender,
    _record: PhantomData<fn(V)>,
}

impl<V> LedgerCheckpoint<V>
where
    V: Serialize + DeserializeOwned + LedgerRecord,
{
    /// Open (or create) the ledger and index the keys already present
    pub fn open(path: &Path) -> Result<Self> {
        let (existing, duplicates) = read_keyed_ledger::<V>(path)?;
        let keys: HashSet<String> = existing.iter().map(|r| r.key().to_string()).collect();

        info!(
            ledger = %path.display(),
            processed = keys.len(),
            duplicates,
            "Checkpoint loaded"
        );

        Ok(Self {
            keys,
            appender: LedgerAppender::open(path)?,
            _record: PhantomData,
        })
    }
}

impl<V> CheckpointStore<V> for LedgerCheckpoint<V>
where
    V: Serialize + LedgerRecord,
{
    fn has_processed(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn record_result(&mut self, key: &str, value: &V) -> Result<bool> {
        if value.key() != key {
            return Err(Error::Internal(format!(
                "checkpoint key '{}' does not match record key '{}'",
                key,
                value.key()
            )));
        }
        if self.keys.contains(key) {
            warn!(
                ledger = %self.appender.path().display(),
                key = %key,
                "Refusing to record an already processed key"
            );
            return Ok(false);
        }
        self.appender.append(value)?;
        self.keys.insert(key.to_string());
        Ok(true)
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}

/// In-memory checkpoint store (no durability)
#[derive(Debug)]
pub struct MemoryCheckpoint<V> {
    records: HashMap<String, V>,
}

impl<V> Default for MemoryCheckpoint<V> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<V: Clone> MemoryCheckpoint<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.records.get(key)
    }
}

impl<V: Clone> CheckpointStore<V> for MemoryCheckpoint<V> {
    fn has_processed(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    fn record_result(&mut self, key: &str, value: &V) -> Result<bool> {
        if self.records.contains_key(key) {
            return Ok(false);
        }
        self.records.insert(key.to_string(), value.clone());
        Ok(true)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::read_ledger;
    use crate::models::{CompoundTagEntry, SegmentKind, TagSegment};
    use tempfile::TempDir;

    fn entry(key: &str) -> CompoundTagEntry {
        CompoundTagEntry {
            normalized: key.to_string(),
            total_count: 1,
            segments: vec![TagSegment::new(key, SegmentKind::Style, "")],
        }
    }

    #[test]
    fn test_reopen_sees_previous_results() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("compound.jsonl");

        {
            let mut store = LedgerCheckpoint::<CompoundTagEntry>::open(&path).unwrap();
            assert!(store.is_empty());
            assert!(store.record_result("rock", &entry("rock")).unwrap());
        }

        let store = LedgerCheckpoint::<CompoundTagEntry>::open(&path).unwrap();
        assert!(store.has_processed("rock"));
        assert!(!store.has_processed("jazz"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_record_is_not_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("compound.jsonl");

        let mut store = LedgerCheckpoint::<CompoundTagEntry>::open(&path).unwrap();
        assert!(store.record_result("rock", &entry("rock")).unwrap());
        assert!(!store.record_result("rock", &entry("rock")).unwrap());

        let lines: Vec<CompoundTagEntry> = read_ledger(&path).unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_key_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("compound.jsonl");

        let mut store = LedgerCheckpoint::<CompoundTagEntry>::open(&path).unwrap();
        let result = store.record_result("jazz", &entry("rock"));
        assert!(matches!(result, Err(Error::Internal(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_checkpoint() {
        let mut store = MemoryCheckpoint::new();
        assert!(store.record_result("a", &1u32).unwrap());
        assert!(!store.record_result("a", &2u32).unwrap());
        assert_eq!(store.get("a"), Some(&1));
        assert_eq!(store.len(), 1);
    }
}
