//! Tag blacklist file: `{ "blacklistedTags": [...] }` plus optional annotations

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistFile {
    #[serde(default)]
    pub blacklisted_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Machine-update annotations (model, prompt, ...) carried through untouched
    #[serde(flatten)]
    pub annotations: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotations_survive_roundtrip() {
        let raw = r#"{"blacklistedTags":["seen live"],"lastUpdated":"2024-01-01T00:00:00Z","model":"m1"}"#;
        let parsed: BlacklistFile = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.blacklisted_tags, vec!["seen live"]);
        assert_eq!(parsed.last_updated.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(parsed.annotations.get("model"), Some(&Value::from("m1")));

        let back = serde_json::to_value(&parsed).unwrap();
        assert_eq!(back["model"], "m1");
    }

    #[test]
    fn test_missing_list_defaults_empty() {
        let parsed: BlacklistFile = serde_json::from_str("{}").unwrap();
        assert!(parsed.blacklisted_tags.is_empty());
    }
}
