//! # Unknown-Key Tracking
//!
//! Records which keys the latest load put into a namespace and which of them
//! have been read through an accessor. Loaded-but-unread keys are
//! configuration drift.

use std::collections::BTreeSet;

/// What happens to keys that a later load no longer contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemovedKeyPolicy {
    /// Drop them from the tracker; they are no longer reported.
    #[default]
    Forget,
    /// Keep reporting them as loaded and unread until the namespace is
    /// cleared.
    Retain,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTracker {
    loaded: BTreeSet<String>,
    read: BTreeSet<String>,
    strict: BTreeSet<String>,
}

impl KeyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the snapshot after a load.
    ///
    /// `keys` is the full key set of the namespace after the load and
    /// `strict_keys` the keys introduced by loads with `error_on_unknown`.
    /// Read marks survive only for keys that are still present.
    pub fn record_load<'a, I, S>(&mut self, keys: I, strict_keys: S, policy: RemovedKeyPolicy)
    where
        I: IntoIterator<Item = &'a String>,
        S: IntoIterator<Item = &'a String>,
    {
        let keys: BTreeSet<String> = keys.into_iter().cloned().collect();
        match policy {
            RemovedKeyPolicy::Forget => {
                self.read.retain(|k| keys.contains(k));
                self.strict.retain(|k| keys.contains(k));
                self.loaded = keys;
            }
            RemovedKeyPolicy::Retain => {
                self.loaded.extend(keys);
            }
        }
        self.strict.extend(strict_keys.into_iter().cloned());
    }

    pub fn mark_read(&mut self, key: &str) {
        if !self.read.contains(key) {
            self.read.insert(key.to_string());
        }
    }

    pub fn is_read(&self, key: &str) -> bool {
        self.read.contains(key)
    }

    /// Loaded keys that were never read, sorted.
    pub fn unread(&self) -> Vec<String> {
        self.loaded.difference(&self.read).cloned().collect()
    }

    /// Unread keys that came from a load with `error_on_unknown`.
    pub fn strict_unread(&self) -> Vec<String> {
        self.strict
            .iter()
            .filter(|k| !self.read.contains(*k))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.loaded.clear();
        self.read.clear();
        self.strict.clear();
    }
}
