//! End-to-end behavior of loading, deferred access, tracking and watching
//! against an explicit registry.

use staticconf::hot_reload::build_loader;
use staticconf::{
    ConfigurationError, ConfigurationWatcher, LoadOptions, ManualClock, NamespaceGetters,
    NamespaceReaders, Registry, Schema, StaticConfError, Value, custom_comparator, loader, schema,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use testing::{MockConfiguration, unique_namespace};

fn registry() -> Arc<Registry> {
    Arc::new(Registry::new())
}

fn load(registry: &Registry, namespace: &str, data: Value) {
    loader::dict(registry, data, LoadOptions::new().namespace(namespace)).unwrap();
}

#[test]
fn test_flat_round_trip_leaves_nothing_unread() {
    let registry = registry();
    let ns = unique_namespace("round-trip");
    load(&registry, &ns, Value::map([("a.b", 1), ("a.c", 2)]));

    let readers = NamespaceReaders::new(&registry, ns.clone());
    assert_eq!(readers.read_int("a.b", None).unwrap(), 1);
    assert_eq!(readers.read_int("a.c", None).unwrap(), 2);

    let namespace = registry.get(&ns).unwrap();
    assert_eq!(namespace.values().len(), 2);
    assert!(namespace.check_unknown_keys().unwrap().is_empty());
}

#[test]
fn test_nested_documents_flatten_into_dotted_keys() {
    let registry = registry();
    let ns = unique_namespace("nested");
    load(
        &registry,
        &ns,
        Value::map([("a", Value::map([("b", 1), ("c", 2)]))]),
    );

    let readers = NamespaceReaders::new(&registry, ns);
    assert_eq!(readers.read_int("a.b", None).unwrap(), 1);
    assert_eq!(readers.read_int("a.c", None).unwrap(), 2);
}

#[test]
fn test_later_load_overrides_and_namespaces_stay_independent() {
    let registry = registry();
    load(&registry, "first", Value::map([("x", 1)]));
    load(&registry, "first", Value::map([("x", 2), ("y", 3)]));
    load(&registry, "second", Value::map([("x", 20)]));

    let first = NamespaceReaders::new(&registry, "first");
    let second = NamespaceReaders::new(&registry, "second");
    assert_eq!(first.read_int("x", None).unwrap(), 2);
    assert_eq!(first.read_int("y", None).unwrap(), 3);
    assert_eq!(second.read_int("x", None).unwrap(), 20);
    assert!(second.read_int("y", None).is_err());
}

#[test]
fn test_handle_declared_before_load_follows_reloads() {
    let registry = registry();
    let ns = unique_namespace("deferred");
    let getters = NamespaceGetters::new(&registry, ns.clone());
    let workers = getters.get_int("pool.workers", None, Some("Worker threads"));

    assert!(workers.value().is_err());

    load(&registry, &ns, Value::map([("pool", Value::map([("workers", 4)]))]));
    assert_eq!(workers.value().unwrap(), 4);
    assert!(workers == 4);

    load(&registry, &ns, Value::map([("pool.workers", 8)]));
    assert_eq!(workers.value().unwrap(), 8);
    assert!(workers > 4);
    assert_eq!(workers.to_string(), "8");
}

#[test]
fn test_missing_key_with_and_without_default() {
    let registry = registry();
    let getters = NamespaceGetters::new(&registry, unique_namespace("missing"));

    let required = getters.get_int("missing.key", None, None);
    let err = required.value().unwrap_err();
    assert!(matches!(
        err,
        StaticConfError::Configuration(ConfigurationError::MissingValue { ref key, .. }) if key == "missing.key"
    ));

    let defaulted = getters.get_int("missing.key", Some(5), None);
    assert_eq!(defaulted.value().unwrap(), 5);
}

#[test]
fn test_read_int_of_non_number_is_a_validation_error() {
    let registry = registry();
    let ns = unique_namespace("validation");
    load(&registry, &ns, Value::map([("n", "not-a-number")]));

    let err = NamespaceReaders::new(&registry, ns).read_int("n", None).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("n=not-a-number"));
}

#[test]
fn test_unknown_keys_reported_after_partial_read() {
    let registry = registry();
    let ns = unique_namespace("unknown");
    loader::dict(
        &registry,
        Value::map([("known", 1), ("extra", 2)]),
        LoadOptions::new().namespace(ns.clone()).error_on_unknown(true),
    )
    .unwrap();

    let known = NamespaceGetters::new(&registry, ns.clone()).get_int("known", None, None);
    assert_eq!(known.value().unwrap(), 1);

    let err = registry.validate(&ns, false).unwrap_err();
    match err {
        StaticConfError::Configuration(ConfigurationError::UnknownKeys { keys, .. }) => {
            assert_eq!(keys, vec!["extra".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_keys_are_advisory_by_default() {
    let registry = registry();
    let ns = unique_namespace("advisory");
    load(&registry, &ns, Value::map([("known", 1), ("extra", 2)]));

    let _known = NamespaceGetters::new(&registry, ns.clone()).get_int("known", None, None);
    registry.validate(&ns, false).unwrap();
    assert_eq!(registry.get(&ns).unwrap().unread_keys(), vec!["extra".to_string()]);
}

#[test]
fn test_validate_surfaces_invalid_declared_value() {
    let registry = registry();
    let ns = unique_namespace("declared");
    let _port = NamespaceGetters::new(&registry, ns.clone()).get_int("port", None, None);
    load(&registry, &ns, Value::map([("port", "eighty")]));

    assert!(registry.validate(&ns, false).unwrap_err().is_validation());
}

#[test]
fn test_schema_recomputes_after_reload() {
    let registry = registry();
    let ns = unique_namespace("schema");
    let http = Schema::new(&registry, &ns).with_config_path("http");
    let port = http.value("port", schema::int().default(80));
    let host = http.value("host", schema::string().help("Bind address"));

    assert_eq!(port.value().unwrap(), 80);
    assert!(host.value().is_err());

    load(
        &registry,
        &ns,
        Value::map([(
            "http",
            Value::map([("port", Value::from(8080)), ("host", Value::from("0.0.0.0"))]),
        )]),
    );
    assert_eq!(port.value().unwrap(), 8080);
    assert_eq!(host.value().unwrap(), "0.0.0.0");

    load(&registry, &ns, Value::map([("http.port", 9090)]));
    assert_eq!(port.value().unwrap(), 9090);
    assert!(registry.view_help().contains("http.host (Type: string"));
}

#[test]
fn test_watcher_respects_min_interval_unless_forced() {
    let registry = registry();
    let ns = unique_namespace("throttle");
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let source_registry = Arc::clone(&registry);
    let namespace = ns.clone();
    let loader: staticconf::hot_reload::ConfigLoader = Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        source_registry.load(
            &staticconf::DictSource::new(Value::map([("a", 1)])),
            &LoadOptions::new().namespace(namespace.clone()),
        )
    });

    let clock = Arc::new(ManualClock::new());
    let mut watcher = ConfigurationWatcher::builder(loader, ["throttled.yaml"])
        .min_interval(Duration::from_secs(10))
        .comparators(vec![custom_comparator(|_: &Path| Ok(true))])
        .clock(clock.clone())
        .without_reloader()
        .build()
        .unwrap();

    clock.advance(Duration::from_secs(1));
    assert!(watcher.reload_if_changed(false).unwrap().is_none());
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    assert!(watcher.reload_if_changed(true).unwrap().is_some());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(NamespaceReaders::new(&registry, ns).read_int("a", None).unwrap(), 1);

    clock.advance(Duration::from_secs(10));
    assert!(watcher.reload_if_changed(false).unwrap().is_some());
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[test]
fn test_failed_watcher_reload_keeps_previous_values() {
    let registry = registry();
    let ns = unique_namespace("failing");
    load(&registry, &ns, Value::map([("a", 1)]));

    let loader = build_loader(
        Arc::clone(&registry),
        staticconf::source_fn("broken", || {
            Err(ConfigurationError::SourceNotFound {
                source_name: "broken".to_string(),
            }
            .into())
        }),
        LoadOptions::new().namespace(ns.clone()),
    );
    let mut watcher = ConfigurationWatcher::builder(loader, ["broken.yaml"])
        .comparators(vec![custom_comparator(|_: &Path| Ok(true))])
        .without_reloader()
        .build()
        .unwrap();

    assert!(watcher.reload_if_changed(true).is_err());
    assert_eq!(NamespaceReaders::new(&registry, ns).read_int("a", None).unwrap(), 1);
}

#[test]
fn test_mock_configuration_scopes_override() {
    let registry = registry();
    let ns = unique_namespace("mocked");
    let readers = NamespaceReaders::new(&registry, ns.clone());

    {
        let _mock = MockConfiguration::new(&registry, &ns, Value::map([("a", 1)])).unwrap();
        assert_eq!(readers.read_int("a", None).unwrap(), 1);
    }
    assert!(readers.read_int("a", None).is_err());

    load(&registry, &ns, Value::map([("a", 7)]));
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _mock = MockConfiguration::new(&registry, &ns, Value::map([("a", 1)])).unwrap();
        panic!("body failed");
    }));
    assert!(result.is_err());
    assert_eq!(readers.read_int("a", None).unwrap(), 7);
}
