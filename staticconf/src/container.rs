//! # Value Container
//!
//! A mapping from dotted keys to [`Value`]s. Nested source documents are
//! flattened into dot-joined paths before they are merged into a namespace.

use crate::value::Value;
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Dotted-key configuration mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigValues(BTreeMap<String, Value>);

impl ConfigValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }

    /// Overlay `other` onto `self`, overriding on key collision. Returns the
    /// keys that were overridden.
    pub fn merge(&mut self, other: ConfigValues) -> Vec<String> {
        let mut overridden = Vec::new();
        for (key, value) in other.0 {
            if self.0.insert(key.clone(), value).is_some() {
                overridden.push(key);
            }
        }
        overridden
    }

    /// Keys present in both mappings.
    pub fn shared_keys(&self, other: &ConfigValues) -> Vec<String> {
        other
            .keys()
            .filter(|k| self.contains_key(k))
            .cloned()
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ConfigValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for ConfigValues {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ConfigValues {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Value>> for ConfigValues {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl From<ConfigValues> for Value {
    fn from(values: ConfigValues) -> Self {
        Value::Map(values.0)
    }
}

/// Flatten a nested mapping into dot-joined keys. Only mappings are walked;
/// lists, sets and tuples are leaves.
pub fn flatten(map: BTreeMap<String, Value>) -> ConfigValues {
    let mut out = BTreeMap::new();
    flatten_into("", map, &mut out);
    ConfigValues(out)
}

fn flatten_into(prefix: &str, map: BTreeMap<String, Value>, out: &mut BTreeMap<String, Value>) {
    for (key, value) in map {
        let full_key = utils::join_key(prefix, &key);
        match value {
            Value::Map(inner) => flatten_into(&full_key, inner, out),
            leaf => {
                out.insert(full_key, leaf);
            }
        }
    }
}
