//! A minimal insertion-ordered map.
//!
//! Downstream consumers depend on the order titles first appear in
//! `uid.sys`. A plain `HashMap` doesn't promise that, so this crate keeps a
//! small hand-rolled container rather than pulling in a third-party
//! `indexmap` dependency for a single narrow need — in the spirit of the
//! teacher crate's small purpose-built helpers (e.g. its `IOWindow`).

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct OrderedMap<V> {
    order: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        OrderedMap {
            order: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Inserts if `key` hasn't been seen before; later duplicate insertions
    /// are ignored, preserving first-appearance order the way `uid.sys`
    /// iteration naturally produces unique title ids.
    pub fn insert(&mut self, key: String, value: V) {
        if self.index.contains_key(&key) {
            return;
        }
        self.index.insert(key.clone(), self.order.len());
        self.order.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&i| &self.order[i].1)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.order.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut map = OrderedMap::new();
        map.insert("c".to_string(), 3);
        map.insert("a".to_string(), 1);
        map.insert("b".to_string(), 2);
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let mut map = OrderedMap::new();
        map.insert("a".to_string(), 1);
        map.insert("a".to_string(), 99);
        assert_eq!(*map.get("a").unwrap(), 1);
        assert_eq!(map.len(), 1);
    }
}
