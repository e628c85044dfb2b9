//! # Schemas
//!
//! A schema groups typed values under a common key prefix in one namespace.
//! Schema values cache their validated result and recompute it whenever the
//! namespace version moves, so a reload is always observed.
//!
//! ## Usage
//! ```rust
//! use staticconf::schema::{self, Schema};
//! use staticconf::{loader, LoadOptions, Registry, Value};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::new());
//! let db = Schema::new(&registry, "DEFAULT").with_config_path("db");
//! let port = db.value("port", schema::int().default(5432).help("Database port"));
//! let host = db.value("host", schema::string());
//!
//! loader::dict(&registry, Value::map([("db", Value::map([("host", "localhost")]))]), LoadOptions::new()).unwrap();
//! assert_eq!(port.value().unwrap(), 5432);
//! assert_eq!(host.value().unwrap(), "localhost");
//! ```

use crate::help::KeyDescription;
use crate::namespace::{ConfigNamespace, RegisteredValue};
use crate::proxy::resolve;
use crate::registry::Registry;
use crate::validation::{self, Validator};
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use errors::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Declaration of one schema value: validator, optional explicit key,
/// default and help.
#[derive(Debug, Clone)]
pub struct ValueTypeDefinition<T> {
    validator: Validator<T>,
    config_key: Option<String>,
    default: Option<T>,
    help: Option<String>,
}

impl<T> ValueTypeDefinition<T> {
    pub fn new(validator: Validator<T>) -> Self {
        Self {
            validator,
            config_key: None,
            default: None,
            help: None,
        }
    }

    /// Use `key` as is, ignoring the schema's config path.
    #[must_use]
    pub fn config_key(mut self, key: impl Into<String>) -> Self {
        self.config_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<T>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }
}

pub fn any() -> ValueTypeDefinition<Value> {
    ValueTypeDefinition::new(validation::any())
}

pub fn string() -> ValueTypeDefinition<String> {
    ValueTypeDefinition::new(validation::string())
}

pub fn bool() -> ValueTypeDefinition<bool> {
    ValueTypeDefinition::new(validation::bool())
}

pub fn int() -> ValueTypeDefinition<i64> {
    ValueTypeDefinition::new(validation::int())
}

pub fn float() -> ValueTypeDefinition<f64> {
    ValueTypeDefinition::new(validation::float())
}

pub fn date() -> ValueTypeDefinition<NaiveDate> {
    ValueTypeDefinition::new(validation::date())
}

pub fn datetime() -> ValueTypeDefinition<NaiveDateTime> {
    ValueTypeDefinition::new(validation::datetime())
}

pub fn time() -> ValueTypeDefinition<NaiveTime> {
    ValueTypeDefinition::new(validation::time())
}

pub fn list() -> ValueTypeDefinition<Vec<Value>> {
    ValueTypeDefinition::new(validation::list())
}

pub fn set() -> ValueTypeDefinition<Vec<Value>> {
    ValueTypeDefinition::new(validation::set())
}

pub fn tuple() -> ValueTypeDefinition<Vec<Value>> {
    ValueTypeDefinition::new(validation::tuple())
}

pub fn regex() -> ValueTypeDefinition<regex::Regex> {
    ValueTypeDefinition::new(validation::regex())
}

pub fn log_level() -> ValueTypeDefinition<tracing::Level> {
    ValueTypeDefinition::new(validation::log_level())
}

/// A set of values declared against one namespace.
#[derive(Debug, Clone)]
pub struct Schema {
    registry: Arc<Registry>,
    namespace: Arc<ConfigNamespace>,
    config_path: Option<String>,
}

impl Schema {
    pub fn new(registry: &Arc<Registry>, namespace: &str) -> Self {
        Self {
            registry: Arc::clone(registry),
            namespace: registry.get_or_create(namespace),
            config_path: None,
        }
    }

    /// Prefix joined with a dot to every attribute name.
    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn namespace(&self) -> &str {
        self.namespace.name()
    }

    /// Declare `attribute`. The key is the definition's explicit key, or the
    /// attribute name under the schema's config path.
    pub fn value<T>(&self, attribute: &str, definition: ValueTypeDefinition<T>) -> SchemaValue<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let key = definition.config_key.unwrap_or_else(|| {
            utils::join_key(self.config_path.as_deref().unwrap_or_default(), attribute)
        });

        self.registry.help().add(
            self.namespace.name(),
            KeyDescription {
                name: key.clone(),
                type_name: definition.validator.name().to_string(),
                default: definition.default.as_ref().map(|d| definition.validator.render(d)),
                help: definition.help,
            },
        );

        let inner = Arc::new(SchemaInner {
            namespace: Arc::clone(&self.namespace),
            key,
            validator: definition.validator,
            default: definition.default,
            cache: Mutex::new(None),
        });
        let weak: std::sync::Weak<SchemaInner<T>> = Arc::downgrade(&inner);
        self.namespace.register(weak);
        SchemaValue { inner }
    }
}

struct SchemaInner<T> {
    namespace: Arc<ConfigNamespace>,
    key: String,
    validator: Validator<T>,
    default: Option<T>,
    cache: Mutex<Option<(u64, T)>>,
}

impl<T: Clone> SchemaInner<T> {
    fn value(&self) -> Result<T> {
        let version = self.namespace.version();
        let mut cache = self.cache.lock();
        if let Some((cached_at, value)) = cache.as_ref() {
            if *cached_at == version {
                return Ok(value.clone());
            }
        }

        let value = resolve(&self.namespace, &self.key, &self.validator, self.default.as_ref())?;
        *cache = Some((version, value.clone()));
        Ok(value)
    }
}

impl<T: Clone + Send + Sync> RegisteredValue for SchemaInner<T> {
    fn config_key(&self) -> &str {
        &self.key
    }

    fn check(&self) -> Result<()> {
        self.value().map(|_| ())
    }
}

/// A resolved accessor produced by [`Schema::value`].
pub struct SchemaValue<T> {
    inner: Arc<SchemaInner<T>>,
}

impl<T> Clone for SchemaValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for SchemaValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValue")
            .field("namespace", &self.inner.namespace.name())
            .field("key", &self.inner.key)
            .finish()
    }
}

impl<T: Clone> SchemaValue<T> {
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// The cached value when the namespace has not changed since it was
    /// computed, otherwise a fresh resolution.
    pub fn value(&self) -> Result<T> {
        self.inner.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ConfigValues;
    use crate::loader::LoadOptions;

    fn load(registry: &Registry, pairs: &[(&str, &str)]) {
        let values: ConfigValues = pairs.iter().map(|(k, v)| (*k, *v)).collect();
        registry
            .get_or_create("schema")
            .apply(values, &LoadOptions::new(), "test")
            .unwrap();
    }

    #[test]
    fn test_schema_keys_use_config_path() {
        let registry = Arc::new(Registry::new());
        let schema = Schema::new(&registry, "schema").with_config_path("bing");
        let one = schema.value("one", int());
        let two = schema.value("two", string().config_key("abs.two"));

        assert_eq!(one.key(), "bing.one");
        assert_eq!(two.key(), "abs.two");
    }

    #[test]
    fn test_schema_value_recomputes_after_load() {
        let registry = Arc::new(Registry::new());
        let schema = Schema::new(&registry, "schema").with_config_path("bing");
        let one = schema.value("one", int());

        load(&registry, &[("bing.one", "1")]);
        assert_eq!(one.value().unwrap(), 1);

        load(&registry, &[("bing.one", "2")]);
        assert_eq!(one.value().unwrap(), 2);

        registry.get_or_create("schema").clear();
        assert!(one.value().unwrap_err().is_missing_value());
    }

    #[test]
    fn test_schema_defaults_and_help() {
        let registry = Arc::new(Registry::new());
        let schema = Schema::new(&registry, "schema");
        let ratio = schema.value("ratio", float().default(0.25).help("Sample ratio"));

        assert_eq!(ratio.value().unwrap(), 0.25);
        assert!(registry
            .view_help()
            .contains("ratio (Type: float, Default: 0.25)\nSample ratio"));
    }

    #[test]
    fn test_schema_values_are_validated() {
        let registry = Arc::new(Registry::new());
        let schema = Schema::new(&registry, "schema");
        let _flag = schema.value("flag", bool());

        load(&registry, &[("flag", "sometimes")]);
        assert!(registry.validate("schema", false).unwrap_err().is_validation());
    }
}
