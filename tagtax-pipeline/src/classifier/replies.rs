//! Typed reply schemas for each classification-backed stage

use super::decode::{optional_str, required_str, type_name, ServiceReply};
use serde_json::Value;
use tagtax_common::models::{SegmentKind, StyleAction, TagSegment};
use tagtax_common::normalize_tag;

/// Compound interpretation: `{"parts": [{"text", "type", "reason"}]}`
///
/// A bare array is accepted as the parts list. Parts whose text is blank
/// after normalization are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundReply {
    pub parts: Vec<TagSegment>,
}

impl ServiceReply for CompoundReply {
    fn validate(value: Value) -> Result<Self, String> {
        let parts = match &value {
            Value::Array(items) => items,
            Value::Object(_) => match value.get("parts") {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    return Err(format!("'parts' must be an array, got {}", type_name(other)))
                }
                None => return Err("missing field 'parts'".to_string()),
            },
            other => return Err(format!("expected object, got {}", type_name(other))),
        };

        let mut segments = Vec::with_capacity(parts.len());
        for (index, part) in parts.iter().enumerate() {
            if !part.is_object() {
                return Err(format!("part {} must be an object", index));
            }
            let text = normalize_tag(required_str(part, "text").map_err(|e| format!("part {}: {}", index, e))?);
            if text.is_empty() {
                continue;
            }
            let kind_str = required_str(part, "type").map_err(|e| format!("part {}: {}", index, e))?;
            let kind = SegmentKind::parse(kind_str)
                .ok_or_else(|| format!("part {} has unknown type '{}'", index, kind_str))?;
            let reason = optional_str(part, "reason").map_err(|e| format!("part {}: {}", index, e))?;
            segments.push(TagSegment::new(text, kind, reason.trim()));
        }

        Ok(Self { parts: segments })
    }
}

/// Canonicalization: `{"canonical_style", "action", "reason"}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalReply {
    /// Normalized; may be empty for `keep` and `reject`
    pub canonical_style: String,
    pub action: StyleAction,
    pub reason: String,
}

impl ServiceReply for CanonicalReply {
    fn validate(value: Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err(format!("expected object, got {}", type_name(&value)));
        }
        let action_str = required_str(&value, "action")?;
        let action = StyleAction::parse(action_str)
            .ok_or_else(|| format!("action must be keep, alias or reject (got '{}')", action_str))?;
        let canonical_style = normalize_tag(optional_str(&value, "canonical_style")?);
        if action == StyleAction::Alias && canonical_style.is_empty() {
            return Err("alias action requires a non-empty canonical_style".to_string());
        }
        let reason = optional_str(&value, "reason")?.trim().to_string();

        Ok(Self {
            canonical_style,
            action,
            reason,
        })
    }
}

/// Hierarchy: `{"is_subgenre", "parent_genre", "reason"}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyReply {
    pub is_subgenre: bool,
    /// Normalized; empty when no parent was named
    pub parent_genre: String,
    pub reason: String,
}

impl ServiceReply for HierarchyReply {
    fn validate(value: Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err(format!("expected object, got {}", type_name(&value)));
        }
        let is_subgenre = match value.get("is_subgenre") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
            Some(other) => {
                return Err(format!(
                    "field 'is_subgenre' must be a boolean, got {}",
                    type_name(other)
                ))
            }
            None => return Err("missing field 'is_subgenre'".to_string()),
        };
        let parent_genre = normalize_tag(optional_str(&value, "parent_genre")?);
        let reason = optional_str(&value, "reason")?.trim().to_string();

        Ok(Self {
            is_subgenre,
            parent_genre,
            reason,
        })
    }
}
