//! # Configuration Namespaces
//!
//! A namespace owns the current value snapshot and the unknown-key tracker.
//! The snapshot is the merge of every load since the last replace, so no
//! per-load history is kept.
//!
//! Readers load the snapshot through [`ArcSwap`] without locking. Writers
//! build the complete new mapping first and swap it in, so a reader never
//! observes a partially merged state.

use crate::container::ConfigValues;
use crate::loader::{LoadMode, LoadOptions};
use crate::precedence::{check_duplicate_keys, merge_with_logging};
use crate::tracker::{KeyTracker, RemovedKeyPolicy};
use arc_swap::ArcSwap;
use errors::{ConfigurationError, Result};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Name of the implicit default namespace.
pub const DEFAULT: &str = "DEFAULT";

/// A value declared against a namespace: a deferred handle or a schema
/// value. Registered values feed `validate` and the load-time unknown-key
/// diagnostic.
pub trait RegisteredValue: Send + Sync {
    fn config_key(&self) -> &str;

    /// Resolve the value once, discarding it.
    fn check(&self) -> Result<()>;
}

#[derive(Debug, Default)]
struct NamespaceState {
    tracker: KeyTracker,
    policy: RemovedKeyPolicy,
}

/// Saved state of a namespace, restored by [`ConfigNamespace::restore`].
#[derive(Debug, Clone)]
pub struct NamespaceSnapshot {
    values: Arc<ConfigValues>,
    tracker: KeyTracker,
}

pub struct ConfigNamespace {
    name: String,
    values: ArcSwap<ConfigValues>,
    version: AtomicU64,
    state: Mutex<NamespaceState>,
    registered: Mutex<Vec<Weak<dyn RegisteredValue>>>,
}

impl std::fmt::Debug for ConfigNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigNamespace")
            .field("name", &self.name)
            .field("version", &self.version())
            .field("keys", &self.values().len())
            .finish()
    }
}

impl ConfigNamespace {
    pub fn new(name: impl Into<String>, policy: RemovedKeyPolicy) -> Self {
        Self {
            name: name.into(),
            values: ArcSwap::from_pointee(ConfigValues::new()),
            version: AtomicU64::new(0),
            state: Mutex::new(NamespaceState {
                policy,
                ..NamespaceState::default()
            }),
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current snapshot of the values.
    pub fn values(&self) -> Arc<ConfigValues> {
        self.values.load_full()
    }

    pub fn get(&self, key: &str) -> Option<crate::Value> {
        self.values.load().get(key).cloned()
    }

    /// Monotonic counter, bumped on every load, clear, reload and override.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn bump_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn mark_read(&self, key: &str) {
        self.state.lock().tracker.mark_read(key);
    }

    pub fn set_removed_key_policy(&self, policy: RemovedKeyPolicy) {
        self.state.lock().policy = policy;
    }

    pub fn register(&self, value: Weak<dyn RegisteredValue>) {
        let mut registered = self.registered.lock();
        registered.retain(|w| w.strong_count() > 0);
        registered.push(value);
    }

    /// Live registered values.
    pub fn registered(&self) -> Vec<Arc<dyn RegisteredValue>> {
        self.registered.lock().iter().filter_map(Weak::upgrade).collect()
    }

    /// Keys declared by live registered values.
    pub fn known_keys(&self) -> BTreeSet<String> {
        self.registered()
            .iter()
            .map(|v| v.config_key().to_string())
            .collect()
    }

    /// Merge (or replace) `data` into the namespace.
    ///
    /// Duplicate keys are checked against the current snapshot before
    /// anything changes, so a rejected load leaves the namespace intact.
    pub(crate) fn apply(&self, data: ConfigValues, options: &LoadOptions, source: &str) -> Result<()> {
        let unknown: Vec<&String> = {
            let known = self.known_keys();
            data.keys().filter(|k| !known.contains(*k)).collect()
        };
        if !unknown.is_empty() && !self.registered.lock().is_empty() {
            info!(namespace = %self.name, keys = ?unknown, "Loaded keys without a declared accessor");
        }

        let mut state = self.state.lock();
        let current = self.values.load_full();

        if options.mode == LoadMode::Merge {
            check_duplicate_keys(&self.name, &current, &data, options.error_on_duplicate)?;
        }

        let strict_keys: Vec<String> = if options.error_on_unknown {
            data.keys().cloned().collect()
        } else {
            Vec::new()
        };
        let next = match options.mode {
            LoadMode::Merge => merge_with_logging(&current, data, source),
            LoadMode::Replace => data,
        };

        let policy = state.policy;
        state.tracker.record_load(next.keys(), strict_keys.iter(), policy);
        self.values.store(Arc::new(next));
        let version = self.bump_version();
        debug!(namespace = %self.name, source = %source, version, "Configuration loaded");
        Ok(())
    }

    /// Recompute the tracker from the current snapshot and mark every
    /// derived value stale. Sources are not re-read.
    pub fn rebuild(&self) {
        let mut state = self.state.lock();
        let current = self.values.load_full();
        let policy = state.policy;
        state
            .tracker
            .record_load(current.keys(), std::iter::empty::<&String>(), policy);
        let version = self.bump_version();
        debug!(namespace = %self.name, version, "Configuration reloaded");
    }

    /// Mark every cached value derived from this namespace as stale.
    pub fn invalidate(&self) {
        self.bump_version();
    }

    /// Report loaded keys that were never read.
    ///
    /// Keys introduced by a load with `error_on_unknown` are an error while
    /// unread; any other unread key is only logged.
    pub fn check_unknown_keys(&self) -> Result<Vec<String>> {
        let state = self.state.lock();
        let strict = state.tracker.strict_unread();
        if !strict.is_empty() {
            return Err(ConfigurationError::UnknownKeys {
                namespace: self.name.clone(),
                keys: strict,
            }
            .into());
        }

        let unread = state.tracker.unread();
        if !unread.is_empty() {
            warn!(namespace = %self.name, keys = ?unread, "Unexpected value in configuration");
        }
        Ok(unread)
    }

    /// Loaded keys that no accessor has read yet.
    pub fn unread_keys(&self) -> Vec<String> {
        self.state.lock().tracker.unread()
    }

    /// Drop all values and read marks. Registered values stay
    /// registered and resolve against the empty snapshot.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.tracker.clear();
        self.values.store(Arc::new(ConfigValues::new()));
        self.bump_version();
    }

    /// Clear and forget every registered value.
    pub fn reset(&self) {
        self.clear();
        self.registered.lock().clear();
    }

    pub fn snapshot(&self) -> NamespaceSnapshot {
        let state = self.state.lock();
        self.snapshot_locked(&state)
    }

    fn snapshot_locked(&self, state: &NamespaceState) -> NamespaceSnapshot {
        NamespaceSnapshot {
            values: self.values.load_full(),
            tracker: state.tracker.clone(),
        }
    }

    pub fn restore(&self, snapshot: NamespaceSnapshot) {
        let mut state = self.state.lock();
        state.tracker = snapshot.tracker;
        self.values.store(snapshot.values);
        self.bump_version();
    }

    /// Install `values` as the whole content of the namespace and return
    /// what was there before.
    ///
    /// The previous state is captured under the same lock as the swap, so a
    /// concurrent load lands either wholly before or wholly after it.
    pub fn swap_values(&self, values: ConfigValues) -> NamespaceSnapshot {
        let mut state = self.state.lock();
        let previous = self.snapshot_locked(&state);
        let policy = state.policy;
        state.tracker.record_load(values.keys(), std::iter::empty::<&String>(), policy);
        self.values.store(Arc::new(values));
        self.bump_version();
        previous
    }
}
