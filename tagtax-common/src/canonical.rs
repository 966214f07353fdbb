//! Canonical style resolution
//!
//! The canonical-map ledger holds one keep/alias/reject decision per raw
//! style. Alias targets may themselves be aliased; resolution follows the
//! chain to a fixed point:
//! - a `keep` entry, or a name with no entry, ends the chain at that name
//! - a `reject` anywhere on the chain rejects the starting style
//! - a cycle resolves to the lexicographically smallest name on the cycle,
//!   so every member of the cycle lands on the same canonical name

use crate::models::{CanonicalStyleEntry, StyleAction};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleResolution {
    Canonical(String),
    Rejected,
    /// The raw style has no canonical-map entry yet
    Unmapped,
}

#[derive(Debug, Clone, Default)]
pub struct CanonicalResolver {
    resolved: HashMap<String, StyleResolution>,
    alias_cycles: usize,
}

impl CanonicalResolver {
    pub fn new<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a CanonicalStyleEntry>,
    {
        let mut edges: HashMap<&str, (StyleAction, &str)> = HashMap::new();
        for entry in entries {
            edges
                .entry(entry.style.as_str())
                .or_insert((entry.action, entry.canonical_style.as_str()));
        }

        let mut resolver = Self::default();
        let mut styles: Vec<&str> = edges.keys().copied().collect();
        styles.sort_unstable();

        for style in styles {
            let resolution = resolver.follow(style, &edges);
            resolver.resolved.insert(style.to_string(), resolution);
        }
        resolver
    }

    fn follow(
        &mut self,
        start: &str,
        edges: &HashMap<&str, (StyleAction, &str)>,
    ) -> StyleResolution {
        let mut path: Vec<&str> = Vec::new();
        let mut current = start;

        loop {
            let Some(&(action, target)) = edges.get(current) else {
                return StyleResolution::Canonical(current.to_string());
            };
            match action {
                StyleAction::Reject => return StyleResolution::Rejected,
                StyleAction::Keep => return StyleResolution::Canonical(current.to_string()),
                StyleAction::Alias => {
                    if target.is_empty() || target == current {
                        return StyleResolution::Canonical(current.to_string());
                    }
                    path.push(current);
                    if let Some(pos) = path.iter().position(|p| *p == target) {
                        let representative = path[pos..]
                            .iter()
                            .min()
                            .copied()
                            .unwrap_or(target);
                        if start == representative {
                            self.alias_cycles += 1;
                            warn!(
                                "Alias cycle detected: {} (resolved to '{}')",
                                path[pos..].join(" -> "),
                                representative
                            );
                        }
                        return StyleResolution::Canonical(representative.to_string());
                    }
                    current = target;
                }
            }
        }
    }

    pub fn resolve_detailed(&self, raw_style: &str) -> StyleResolution {
        self.resolved
            .get(raw_style)
            .cloned()
            .unwrap_or(StyleResolution::Unmapped)
    }

    /// Canonical name for a raw style; unmapped styles fall back to themselves
    ///
    /// Returns `None` when the style is rejected.
    pub fn resolve(&self, raw_style: &str) -> Option<String> {
        match self.resolve_detailed(raw_style) {
            StyleResolution::Canonical(name) => Some(name),
            StyleResolution::Rejected => None,
            StyleResolution::Unmapped => Some(raw_style.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub fn alias_cycles(&self) -> usize {
        self.alias_cycles
    }
}
