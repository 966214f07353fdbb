//! Two-layer keyed map: a base layer and an override layer
//!
//! Lookups consult the override layer first, so an override entry always
//! wins on key collision no matter in which order the layers were loaded.
//! Within the base layer the first entry for a key is authoritative (same
//! rule as keyed ledgers); within the override layer the last one is, so a
//! curator can append a correction below an earlier one.

use crate::ledger::LedgerRecord;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Base,
    Override,
}

#[derive(Debug, Clone)]
pub struct LayeredMap<V> {
    base: HashMap<String, V>,
    overrides: HashMap<String, V>,
    /// Keys in order of first appearance across both layers
    order: Vec<String>,
}

impl<V> Default for LayeredMap<V> {
    fn default() -> Self {
        Self {
            base: HashMap::new(),
            overrides: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<V: LedgerRecord> LayeredMap<V> {
    pub fn new<B, O>(base: B, overrides: O) -> Self
    where
        B: IntoIterator<Item = V>,
        O: IntoIterator<Item = V>,
    {
        let mut map = Self::default();
        for value in base {
            map.insert_base(value);
        }
        for value in overrides {
            map.insert_override(value);
        }
        map
    }

    fn track(&mut self, key: &str) {
        if !self.base.contains_key(key) && !self.overrides.contains_key(key) {
            self.order.push(key.to_string());
        }
    }

    pub fn insert_base(&mut self, value: V) {
        let key = value.key().to_string();
        if self.base.contains_key(&key) {
            return;
        }
        self.track(&key);
        self.base.insert(key, value);
    }

    pub fn insert_override(&mut self, value: V) {
        let key = value.key().to_string();
        self.track(&key);
        self.overrides.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<(&V, Layer)> {
        if let Some(v) = self.overrides.get(key) {
            return Some((v, Layer::Override));
        }
        self.base.get(key).map(|v| (v, Layer::Base))
    }

    /// The base-layer value for a key, even when an override shadows it
    pub fn base_value(&self, key: &str) -> Option<&V> {
        self.base.get(key)
    }

    /// Every key with its winning value, in first-appearance order
    pub fn resolved(&self) -> impl Iterator<Item = (&V, Layer)> + '_ {
        self.order.iter().filter_map(move |k| self.get(k))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys present in both layers (base value shadowed)
    pub fn shadowed_count(&self) -> usize {
        self.overrides
            .keys()
            .filter(|k| self.base.contains_key(*k))
            .count()
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        key: String,
        value: &'static str,
    }

    impl LedgerRecord for Item {
        fn key(&self) -> &str {
            &self.key
        }
    }

    fn item(key: &str, value: &'static str) -> Item {
        Item {
            key: key.to_string(),
            value,
        }
    }

    #[test]
    fn test_override_wins_on_collision() {
        let map = LayeredMap::new(
            vec![item("a", "base-a"), item("b", "base-b")],
            vec![item("a", "override-a")],
        );

        let (value, layer) = map.get("a").unwrap();
        assert_eq!(value.value, "override-a");
        assert_eq!(layer, Layer::Override);

        let (value, layer) = map.get("b").unwrap();
        assert_eq!(value.value, "base-b");
        assert_eq!(layer, Layer::Base);
        assert_eq!(map.shadowed_count(), 1);
    }

    #[test]
    fn test_precedence_independent_of_insert_order() {
        let mut map = LayeredMap::default();
        map.insert_override(item("a", "override"));
        map.insert_base(item("a", "base"));
        assert_eq!(map.get("a").unwrap().0.value, "override");
    }

    #[test]
    fn test_layer_internal_precedence() {
        let map = LayeredMap::new(
            vec![item("a", "first"), item("a", "second")],
            vec![item("b", "first"), item("b", "second")],
        );
        assert_eq!(map.get("a").unwrap().0.value, "first");
        assert_eq!(map.get("b").unwrap().0.value, "second");
    }

    #[test]
    fn test_resolved_order_and_override_only_keys() {
        let map = LayeredMap::new(
            vec![item("b", "1"), item("a", "2")],
            vec![item("c", "3"), item("b", "4")],
        );
        let keys: Vec<&str> = map.resolved().map(|(v, _)| v.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.override_count(), 2);
    }
}
