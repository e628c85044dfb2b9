use proptest::prelude::*;
use staticconf::{LoadMode, LoadOptions, NamespaceReaders, Registry, Value, loader};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const NS: &str = "props";

fn load(registry: &Registry, data: &BTreeMap<String, i64>, mode: LoadMode) {
    let value = Value::map(data.iter().map(|(k, v)| (k.clone(), *v)));
    loader::dict(registry, value, LoadOptions::new().namespace(NS).mode(mode)).unwrap();
}

fn flat_map(max: usize) -> impl Strategy<Value = BTreeMap<String, i64>> {
    prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..max)
}

proptest! {
    #[test]
    fn later_merge_wins_and_other_keys_persist(first in flat_map(12), second in flat_map(12)) {
        let registry = Arc::new(Registry::new());
        load(&registry, &first, LoadMode::Merge);
        load(&registry, &second, LoadMode::Merge);
        let values = registry.get(NS).unwrap().values();

        for (key, value) in &second {
            prop_assert_eq!(values.get(key), Some(&Value::Int(*value)));
        }
        for (key, value) in first.iter().filter(|(k, _)| !second.contains_key(*k)) {
            prop_assert_eq!(values.get(key), Some(&Value::Int(*value)));
        }
        let union: BTreeSet<&String> = first.keys().chain(second.keys()).collect();
        prop_assert_eq!(values.len(), union.len());
    }

    #[test]
    fn replace_keeps_only_new_keys(first in flat_map(12), second in flat_map(12)) {
        let registry = Arc::new(Registry::new());
        load(&registry, &first, LoadMode::Merge);
        load(&registry, &second, LoadMode::Replace);
        let values = registry.get(NS).unwrap().values();

        let keys: Vec<&String> = values.keys().collect();
        let expected: Vec<&String> = second.keys().collect();
        prop_assert_eq!(keys, expected);
    }

    #[test]
    fn unread_is_loaded_minus_read(
        reads in prop::collection::btree_map("[a-z]{1,6}", any::<bool>(), 1..16)
    ) {
        let registry = Arc::new(Registry::new());
        let data: BTreeMap<String, i64> = reads.keys().map(|k| (k.clone(), 1)).collect();
        load(&registry, &data, LoadMode::Merge);

        let readers = NamespaceReaders::new(&registry, NS);
        for key in reads.iter().filter(|(_, read)| **read).map(|(k, _)| k) {
            prop_assert_eq!(readers.read_int(key, None).unwrap(), 1);
        }

        let expected: Vec<String> = reads
            .iter()
            .filter(|(_, read)| !**read)
            .map(|(k, _)| k.clone())
            .collect();
        prop_assert_eq!(registry.get(NS).unwrap().unread_keys(), expected);
    }

    #[test]
    fn rebuild_keeps_values_and_bumps_version(first in flat_map(12), second in flat_map(12)) {
        let registry = Arc::new(Registry::new());
        load(&registry, &first, LoadMode::Merge);
        load(&registry, &second, LoadMode::Merge);
        let namespace = registry.get(NS).unwrap();
        let before = namespace.values();
        let version = namespace.version();

        registry.reload(NS, false);
        prop_assert_eq!(&*namespace.values(), &*before);
        prop_assert!(namespace.version() > version);
    }
}
