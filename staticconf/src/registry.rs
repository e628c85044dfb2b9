//! # Namespace Registry
//!
//! Process-wide table of namespaces. Namespaces are created on first
//! reference and live until the registry is dropped; test tooling clears
//! them instead of removing them, so handles holding a namespace stay valid.
//!
//! A registry can be created explicitly and passed around, or the shared
//! one can be reached through [`Registry::global`].

use crate::help::ConfigHelp;
use crate::help::KeyDescription;
use crate::namespace::{ConfigNamespace, NamespaceSnapshot};
use crate::tracker::RemovedKeyPolicy;
use errors::Result;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock};
use tracing::debug;

static GLOBAL: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::new()));

/// Saved state of a whole registry.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    namespaces: HashMap<String, NamespaceSnapshot>,
    help: BTreeMap<String, Vec<KeyDescription>>,
}

#[derive(Debug, Default)]
pub struct Registry {
    namespaces: RwLock<HashMap<String, Arc<ConfigNamespace>>>,
    help: ConfigHelp,
    removed_key_policy: RwLock<RemovedKeyPolicy>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`crate::default_getters`] and
    /// friends.
    pub fn global() -> Arc<Registry> {
        Arc::clone(&GLOBAL)
    }

    /// Return the namespace called `name`, creating it empty if needed.
    pub fn get_or_create(&self, name: &str) -> Arc<ConfigNamespace> {
        if let Some(ns) = self.namespaces.read().get(name) {
            return Arc::clone(ns);
        }

        let mut namespaces = self.namespaces.write();
        let policy = *self.removed_key_policy.read();
        Arc::clone(namespaces.entry(name.to_string()).or_insert_with(|| {
            debug!(namespace = %name, "Creating namespace");
            Arc::new(ConfigNamespace::new(name, policy))
        }))
    }

    pub fn get(&self, name: &str) -> Option<Arc<ConfigNamespace>> {
        self.namespaces.read().get(name).cloned()
    }

    /// Names of every namespace, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// `name` alone, or every namespace when `all_names` is set.
    pub fn select(&self, name: &str, all_names: bool) -> Vec<Arc<ConfigNamespace>> {
        if all_names {
            let namespaces = self.namespaces.read();
            let mut selected: Vec<Arc<ConfigNamespace>> = namespaces.values().cloned().collect();
            selected.sort_by(|a, b| a.name().cmp(b.name()));
            selected
        } else {
            vec![self.get_or_create(name)]
        }
    }

    pub fn help(&self) -> &ConfigHelp {
        &self.help
    }

    pub fn view_help(&self) -> String {
        self.help.view_help()
    }

    pub fn removed_key_policy(&self) -> RemovedKeyPolicy {
        *self.removed_key_policy.read()
    }

    /// Apply `policy` to existing and future namespaces.
    pub fn set_removed_key_policy(&self, policy: RemovedKeyPolicy) {
        *self.removed_key_policy.write() = policy;
        for ns in self.namespaces.read().values() {
            ns.set_removed_key_policy(policy);
        }
    }

    /// Rebuild the selected namespaces from their current snapshot. This does
    /// not look at any source; the watcher is what re-reads files.
    pub fn reload(&self, name: &str, all_names: bool) {
        for ns in self.select(name, all_names) {
            ns.rebuild();
        }
    }

    /// Mark cached values of the selected namespaces as stale.
    pub fn invalidate(&self, name: &str, all_names: bool) {
        for ns in self.select(name, all_names) {
            ns.invalidate();
        }
    }

    /// Resolve every registered accessor of the selected namespaces, then
    /// check for loaded keys nothing has read.
    ///
    /// ## Errors
    /// The first missing or invalid value, or the unread keys of a load made
    /// with `error_on_unknown`.
    pub fn validate(&self, name: &str, all_names: bool) -> Result<()> {
        for ns in self.select(name, all_names) {
            for value in ns.registered() {
                value.check()?;
            }
            ns.check_unknown_keys()?;
        }
        Ok(())
    }

    pub fn clear(&self, name: &str) {
        if let Some(ns) = self.get(name) {
            ns.clear();
        }
    }

    pub fn clear_all(&self) {
        for ns in self.namespaces.read().values() {
            ns.clear();
        }
    }

    /// Clear every namespace, forget registered accessors and help.
    pub fn reset(&self) {
        for ns in self.namespaces.read().values() {
            ns.reset();
        }
        self.help.clear();
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            namespaces: self
                .namespaces
                .read()
                .iter()
                .map(|(name, ns)| (name.clone(), ns.snapshot()))
                .collect(),
            help: self.help.snapshot(),
        }
    }

    /// Put every namespace back to its snapshotted state. Namespaces created
    /// after the snapshot are cleared.
    pub fn restore(&self, snapshot: RegistrySnapshot) {
        let RegistrySnapshot {
            mut namespaces,
            help,
        } = snapshot;
        for (name, ns) in self.namespaces.read().iter() {
            match namespaces.remove(name) {
                Some(saved) => ns.restore(saved),
                None => ns.clear(),
            }
        }
        self.help.restore(help);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ConfigValues;
    use crate::loader::LoadOptions;
    use crate::Value;

    fn load(registry: &Registry, ns: &str, pairs: &[(&str, i64)]) {
        let values: ConfigValues = pairs.iter().map(|(k, v)| (*k, *v)).collect();
        registry
            .get_or_create(ns)
            .apply(values, &LoadOptions::new().namespace(ns), "test")
            .unwrap();
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let registry = Registry::new();
        let a = registry.get_or_create("a");
        let again = registry.get_or_create("a");
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(registry.names(), vec!["a".to_string()]);
    }

    #[test]
    fn test_namespaces_are_independent() {
        let registry = Registry::new();
        load(&registry, "A", &[("x", 1)]);
        load(&registry, "B", &[("x", 2)]);

        assert_eq!(registry.get_or_create("A").get("x"), Some(Value::Int(1)));
        assert_eq!(registry.get_or_create("B").get("x"), Some(Value::Int(2)));
    }

    #[test]
    fn test_clear_all() {
        let registry = Registry::new();
        load(&registry, "A", &[("x", 1)]);
        load(&registry, "B", &[("x", 2)]);

        registry.clear_all();
        assert!(registry.get_or_create("A").values().is_empty());
        assert!(registry.get_or_create("B").values().is_empty());
    }

    #[test]
    fn test_snapshot_restore() {
        let registry = Registry::new();
        load(&registry, "A", &[("x", 1)]);
        let snapshot = registry.snapshot();

        load(&registry, "A", &[("x", 5)]);
        load(&registry, "C", &[("y", 1)]);
        registry.restore(snapshot);

        assert_eq!(registry.get_or_create("A").get("x"), Some(Value::Int(1)));
        assert!(registry.get_or_create("C").values().is_empty());
    }

    #[test]
    fn test_removed_key_policy_applies_to_existing_namespaces() {
        let registry = Registry::new();
        load(&registry, "A", &[("gone", 1)]);
        registry.set_removed_key_policy(RemovedKeyPolicy::Retain);

        let ns = registry.get_or_create("A");
        ns.swap_values(ConfigValues::new());
        assert_eq!(ns.unread_keys(), vec!["gone".to_string()]);
        assert_eq!(registry.removed_key_policy(), RemovedKeyPolicy::Retain);
    }

    #[test]
    fn test_validate_all_names_reports_unread_strict_keys() {
        let registry = Registry::new();
        let values: ConfigValues = [("extra", 1)].into_iter().collect();
        registry
            .get_or_create("strict")
            .apply(values, &LoadOptions::new().error_on_unknown(true), "test")
            .unwrap();
        load(&registry, "lax", &[("other", 1)]);

        assert!(registry.validate("lax", false).is_ok());
        assert!(registry.validate(crate::DEFAULT, true).is_err());
    }
}
