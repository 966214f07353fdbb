//! Temporary data roots with entity files and ledgers

use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tagtax_common::config::TomlConfig;
use tagtax_common::ledger::write_ledger;
use tagtax_common::paths::LedgerPaths;
use tagtax_pipeline::stages::StageContext;
use tempfile::TempDir;

/// Create an empty data root with default ledger paths
///
/// Returns (TempDir, LedgerPaths) - TempDir must be kept alive for duration of test
pub fn create_data_root() -> (TempDir, LedgerPaths) {
    let temp_dir = TempDir::new().unwrap();
    let paths = LedgerPaths::new(temp_dir.path());
    std::fs::create_dir_all(paths.entities_dir()).unwrap();
    (temp_dir, paths)
}

pub fn stage_context(paths: &LedgerPaths) -> StageContext {
    StageContext::new(paths.clone(), TomlConfig::default())
}

/// Write `<entities>/<name>.json`
pub fn write_entity(paths: &LedgerPaths, name: &str, record: Value) {
    let path = paths.entities_dir().join(format!("{}.json", name));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, serde_json::to_string_pretty(&record).unwrap()).unwrap();
}

pub fn write_blacklist(paths: &LedgerPaths, tags: &[&str]) {
    let body = serde_json::json!({ "blacklistedTags": tags });
    std::fs::write(paths.blacklist(), body.to_string()).unwrap();
}

pub fn write_ledger_lines<T: Serialize>(path: &Path, records: &[T]) {
    write_ledger(path, records).unwrap();
}

/// Every non-empty line of a ledger, parsed as JSON
pub fn read_lines(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
