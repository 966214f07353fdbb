//! Tag normalization
//!
//! A normalized tag is the stable key used by every downstream ledger:
//! NFKC-normalized, case-folded, internal whitespace collapsed to a single
//! space, trimmed. The function is pure and idempotent.

use unicode_normalization::UnicodeNormalization;

/// Normalize a raw tag string into its aggregation key
pub fn normalize_tag(raw: &str) -> String {
    let folded: String = raw.nfkc().flat_map(char::to_lowercase).collect();
    // Lower-casing can produce sequences NFKC would compose differently
    // (e.g. 'İ' -> "i\u{307}"), so normalize once more after folding.
    let recomposed: String = folded.nfkc().collect();
    recomposed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize and drop empty results
pub fn normalize_non_empty(raw: &str) -> Option<String> {
    let normalized = normalize_tag(raw);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
