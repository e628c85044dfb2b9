use errors::Result;
use staticconf::loader::to_config_values;
use staticconf::{ConfigNamespace, ConfigValues, DEFAULT, NamespaceSnapshot, Registry, Value};
use std::sync::Arc;
use tracing::debug;

/// Replaces the content of one namespace for the lifetime of the guard.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Lets a test run code that reads configuration against known values
/// without loading files. The previous values and read marks
/// come back when the guard drops, including when the test panics.
///
/// ## Usage
/// ```rust
/// use staticconf::{NamespaceReaders, Registry, Value};
/// use std::sync::Arc;
/// use testing::MockConfiguration;
///
/// let registry = Arc::new(Registry::new());
/// let readers = NamespaceReaders::new(&registry, "svc");
/// {
///     let _mock = MockConfiguration::new(&registry, "svc", Value::map([("a", 1)])).unwrap();
///     assert_eq!(readers.read_int("a", None).unwrap(), 1);
/// }
/// assert!(readers.read_int("a", None).is_err());
/// ```
pub struct MockConfiguration {
    namespace: Arc<ConfigNamespace>,
    previous: Option<NamespaceSnapshot>,
}

impl MockConfiguration {
    /// Install `data`, flattened into dotted keys, as the whole content of
    /// `namespace`.
    pub fn new(registry: &Registry, namespace: &str, data: impl Into<Value>) -> Result<Self> {
        Self::build(registry, namespace, data.into(), true)
    }

    /// Like [`MockConfiguration::new`] but keeps nested mappings as values.
    pub fn unflattened(registry: &Registry, namespace: &str, data: impl Into<Value>) -> Result<Self> {
        Self::build(registry, namespace, data.into(), false)
    }

    /// Override the default namespace of the global registry.
    pub fn global(data: impl Into<Value>) -> Result<Self> {
        Self::new(&Registry::global(), DEFAULT, data)
    }

    fn build(registry: &Registry, namespace: &str, data: Value, flatten: bool) -> Result<Self> {
        let values = to_config_values(data, flatten, "mock configuration")?;
        Ok(Self::install(registry.get_or_create(namespace), values))
    }

    pub fn install(namespace: Arc<ConfigNamespace>, values: ConfigValues) -> Self {
        debug!(namespace = %namespace.name(), keys = values.len(), "Installing mock configuration");
        let previous = namespace.swap_values(values);
        Self {
            namespace,
            previous: Some(previous),
        }
    }

    pub fn namespace(&self) -> &ConfigNamespace {
        &self.namespace
    }
}

impl Drop for MockConfiguration {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            debug!(namespace = %self.namespace.name(), "Restoring mocked namespace");
            self.namespace.restore(previous);
        }
    }
}
