//! # Staticconf
//!
//! Static configuration access: load values from files and in-memory
//! structures into named namespaces, and read them through typed accessors
//! that may be declared before anything is loaded.
//!
//! This crate provides:
//! - Loaders for YAML, JSON, TOML, INI, XML, properties and in-memory data
//! - Namespaces with merge-on-load semantics and atomic snapshot swaps
//! - Deferred value handles, readers and schemas with validation
//! - Unknown-key tracking for configuration drift
//! - Polling file watchers with pluggable change detection and callbacks
//!
//! ## Usage
//! ```rust
//! use staticconf::{loader, LoadOptions, NamespaceGetters, NamespaceReaders, Registry, Value};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::new());
//! let getters = NamespaceGetters::new(&registry, "service");
//! let workers = getters.get_int("pool.workers", Some(4), Some("Worker threads"));
//!
//! loader::dict(
//!     &registry,
//!     Value::map([("pool", Value::map([("workers", 16), ("queue", 100)]))]),
//!     LoadOptions::new().namespace("service"),
//! )
//! .unwrap();
//!
//! assert_eq!(workers.value().unwrap(), 16);
//! let readers = NamespaceReaders::new(&registry, "service");
//! assert_eq!(readers.read_int("pool.queue", None).unwrap(), 100);
//! ```
//!
//! # Best Practices
//!
//! - Pass a [`Registry`] explicitly where possible; the global one exists for
//!   application code that wants process-wide configuration
//! - Call [`Registry::validate`] after loading to surface missing values early
//! - Use `testing::MockConfiguration` to override values in tests

pub mod callback;
pub mod clock;
pub mod comparator;
pub mod container;
pub mod file_loader;
pub mod getters;
pub mod help;
pub mod hot_reload;
pub mod loader;
pub mod namespace;
pub mod precedence;
pub mod proxy;
pub mod readers;
pub mod registry;
pub mod schema;
pub mod tracker;
pub mod validation;
pub mod value;

pub use callback::{ReloadCallback, ReloadCallbackChain};
pub use clock::{Clock, ManualClock, SystemClock};
pub use comparator::{
    Comparator, ComparatorFactory, HashComparator, InodeComparator, MTimeComparator,
    NotifyComparator, custom_comparator, default_comparators,
};
pub use container::{ConfigValues, flatten};
pub use errors::{ConfigurationError, Result, StaticConfError, ValidationError};
pub use file_loader::{AutoSource, DictSource, FileSource, Format, ListSource, ObjectSource};
pub use getters::{NamespaceGetters, default_getters};
pub use help::{ConfigHelp, KeyDescription};
pub use hot_reload::{ConfigFacade, ConfigurationWatcher, WatcherState};
pub use loader::{CompositeConfiguration, ConfigSource, LoadMode, LoadOptions, source_fn};
pub use namespace::{ConfigNamespace, DEFAULT, NamespaceSnapshot};
pub use proxy::ValueProxy;
pub use readers::{NamespaceReaders, default_readers};
pub use registry::{Registry, RegistrySnapshot};
pub use schema::{Schema, SchemaValue, ValueTypeDefinition};
pub use tracker::RemovedKeyPolicy;
pub use validation::Validator;
pub use value::Value;

/// Resolve every accessor declared in `name` (or every namespace) of the
/// global registry and report unread strict keys.
pub fn validate(name: &str, all_names: bool) -> Result<()> {
    Registry::global().validate(name, all_names)
}

/// Rebuild `name` (or every namespace) of the global registry from its
/// recorded loads.
pub fn reload(name: &str, all_names: bool) {
    Registry::global().reload(name, all_names);
}

/// Help for every accessor declared against the global registry.
pub fn view_help() -> String {
    Registry::global().view_help()
}
