//! # Configuration Loading
//!
//! A load reads a source into a raw [`Value`], flattens it into dotted keys
//! and merges the result into a namespace.
//!
//! Sources implement [`ConfigSource`]; the file formats live in
//! [`crate::file_loader`]. Each format has a one-call helper here taking the
//! registry, the source and [`LoadOptions`].
//!
//! # Failure Policy
//!
//! - A source that cannot be found or parsed fails the load with a
//!   `ConfigurationError`
//! - With `optional` set the failure is logged and an empty mapping is
//!   loaded instead
//! - Nothing is merged unless the whole source was read successfully

use crate::container::{ConfigValues, flatten};
use crate::file_loader::{AutoSource, DictSource, FileSource, ListSource, ObjectSource};
use crate::namespace::DEFAULT;
use crate::registry::Registry;
use crate::value::Value;
use errors::{ConfigurationError, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Anything that can produce a raw configuration document.
pub trait ConfigSource: Send + Sync {
    /// Human readable origin, used in logs and errors.
    fn describe(&self) -> String;

    fn read(&self) -> Result<Value>;
}

/// A [`ConfigSource`] backed by a closure.
pub struct FnSource<F> {
    name: String,
    func: F,
}

impl<F> ConfigSource for FnSource<F>
where
    F: Fn() -> Result<Value> + Send + Sync,
{
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn read(&self) -> Result<Value> {
        (self.func)()
    }
}

/// Wrap a closure as a source.
pub fn source_fn<F>(name: impl Into<String>, func: F) -> FnSource<F>
where
    F: Fn() -> Result<Value> + Send + Sync,
{
    FnSource {
        name: name.into(),
        func,
    }
}

/// How loaded values combine with the namespace's current content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Overlay onto existing keys; later loads win on collision.
    #[default]
    Merge,
    /// Replace the whole namespace content.
    Replace,
}

/// Options of a single load.
///
/// ```rust
/// use staticconf::{LoadMode, LoadOptions};
///
/// let options = LoadOptions::new()
///     .namespace("service")
///     .error_on_unknown(true)
///     .mode(LoadMode::Replace);
/// assert!(options.flatten);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub namespace: String,
    pub flatten: bool,
    pub error_on_unknown: bool,
    pub error_on_duplicate: bool,
    pub optional: bool,
    pub mode: LoadMode,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT.to_string(),
            flatten: true,
            error_on_unknown: false,
            error_on_duplicate: false,
            optional: false,
            mode: LoadMode::Merge,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    #[must_use]
    pub fn error_on_unknown(mut self, enabled: bool) -> Self {
        self.error_on_unknown = enabled;
        self
    }

    #[must_use]
    pub fn error_on_duplicate(mut self, enabled: bool) -> Self {
        self.error_on_duplicate = enabled;
        self
    }

    #[must_use]
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Read `source` and convert it into container values.
///
/// An optional source that cannot be read, or whose document is not a
/// mapping, yields `None` so the caller leaves the namespace untouched.
pub fn load_config_data(
    source: &dyn ConfigSource,
    optional: bool,
    flatten_keys: bool,
) -> Result<Option<ConfigValues>> {
    let name = source.describe();
    match source
        .read()
        .and_then(|raw| to_config_values(raw, flatten_keys, &name))
    {
        Ok(values) => Ok(Some(values)),
        Err(e) if optional => {
            info!(source = %name, error = %e, "Optional configuration failed");
            Ok(None)
        }
        Err(e) => {
            info!(source = %name, error = %e, "Configuration failed");
            Err(e)
        }
    }
}

/// Turn a raw document into container values. An empty document is an
/// empty mapping; anything other than a mapping is rejected.
pub fn to_config_values(raw: Value, flatten_keys: bool, source_name: &str) -> Result<ConfigValues> {
    match raw {
        Value::Null => Ok(ConfigValues::new()),
        Value::Map(map) if flatten_keys => Ok(flatten(map)),
        Value::Map(map) => Ok(ConfigValues::from(map)),
        other => Err(ConfigurationError::Parse {
            format: "configuration".to_string(),
            source_name: source_name.to_string(),
            reason: format!("expected a mapping, found {}", other.type_name()),
        }
        .into()),
    }
}

impl Registry {
    /// Load `source` into the namespace named by `options`.
    ///
    /// # M-CANONICAL-DOCS
    ///
    /// ## Purpose
    /// The single entry point every format helper goes through. Reads the
    /// whole source, flattens it, then merges it into the namespace in one
    /// snapshot swap.
    ///
    /// ## Usage
    /// ```rust
    /// use staticconf::{loader::source_fn, LoadOptions, Registry, Value};
    ///
    /// let registry = Registry::new();
    /// let source = source_fn("inline", || Ok(Value::map([("a", Value::map([("b", 1)]))])));
    /// let loaded = registry.load(&source, &LoadOptions::new()).unwrap();
    /// assert!(loaded.contains_key("a.b"));
    /// ```
    ///
    /// ## Returns
    /// The values that were loaded, after flattening.
    pub fn load(&self, source: &dyn ConfigSource, options: &LoadOptions) -> Result<ConfigValues> {
        let name = source.describe();
        let Some(values) = load_config_data(source, options.optional, options.flatten)? else {
            return Ok(ConfigValues::new());
        };
        self.get_or_create(&options.namespace)
            .apply(values.clone(), options, &name)?;
        Ok(values)
    }
}

pub fn yaml(registry: &Registry, path: impl AsRef<Path>, options: LoadOptions) -> Result<ConfigValues> {
    registry.load(&FileSource::yaml(path), &options)
}

pub fn json(registry: &Registry, path: impl AsRef<Path>, options: LoadOptions) -> Result<ConfigValues> {
    registry.load(&FileSource::json(path), &options)
}

pub fn toml(registry: &Registry, path: impl AsRef<Path>, options: LoadOptions) -> Result<ConfigValues> {
    registry.load(&FileSource::toml(path), &options)
}

pub fn ini(registry: &Registry, path: impl AsRef<Path>, options: LoadOptions) -> Result<ConfigValues> {
    registry.load(&FileSource::ini(path), &options)
}

/// `safe` rejects documents where an attribute, a child element and the
/// element text would collide on the same key.
pub fn xml(
    registry: &Registry,
    path: impl AsRef<Path>,
    safe: bool,
    options: LoadOptions,
) -> Result<ConfigValues> {
    registry.load(&FileSource::xml(path, safe), &options)
}

pub fn properties(
    registry: &Registry,
    path: impl AsRef<Path>,
    options: LoadOptions,
) -> Result<ConfigValues> {
    registry.load(&FileSource::properties(path), &options)
}

/// Pick the format from the file extension.
pub fn file(registry: &Registry, path: impl AsRef<Path>, options: LoadOptions) -> Result<ConfigValues> {
    registry.load(&FileSource::detect(path)?, &options)
}

/// Load `key=value` strings, split on the first `=`.
pub fn list<I, S>(registry: &Registry, items: I, options: LoadOptions) -> Result<ConfigValues>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    registry.load(&ListSource::new(items), &options)
}

pub fn dict(registry: &Registry, data: impl Into<Value>, options: LoadOptions) -> Result<ConfigValues> {
    registry.load(&DictSource::new(data), &options)
}

/// Load the serialized fields of any `Serialize` value.
pub fn object<T>(registry: &Registry, object: &T, options: LoadOptions) -> Result<ConfigValues>
where
    T: Serialize + Send + Sync,
{
    registry.load(&ObjectSource::new(object), &options)
}

/// Load the first of `config.yaml`, `config.json`, `config.ini`,
/// `config.xml` and `config.properties` found in `base_dir`.
pub fn auto(registry: &Registry, base_dir: impl AsRef<Path>, options: LoadOptions) -> Result<ConfigValues> {
    registry.load(&AutoSource::new(base_dir), &options)
}

/// An ordered list of sources read as one. Later sources override earlier
/// ones key by key.
#[derive(Default)]
pub struct CompositeConfiguration {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl std::fmt::Debug for CompositeConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|s| s.describe()))
            .finish()
    }
}

impl CompositeConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, source: impl ConfigSource + 'static) {
        self.sources.push(Box::new(source));
    }

    #[must_use]
    pub fn with(mut self, source: impl ConfigSource + 'static) -> Self {
        self.append(source);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Load the composite into `registry` with `options`.
    pub fn load(&self, registry: &Registry, options: &LoadOptions) -> Result<ConfigValues> {
        registry.load(self, options)
    }
}

impl ConfigSource for CompositeConfiguration {
    fn describe(&self) -> String {
        let names: Vec<String> = self.sources.iter().map(|s| s.describe()).collect();
        format!("composite[{}]", names.join(", "))
    }

    fn read(&self) -> Result<Value> {
        let mut merged = ConfigValues::new();
        for source in &self.sources {
            let raw = source.read()?;
            merged.merge(to_config_values(raw, true, &source.describe())?);
        }
        Ok(merged.into())
    }
}
