//! # Getters
//!
//! Getters declare an accessor and return a [`ValueProxy`] immediately. They
//! can run before any configuration is loaded; the key is only looked up
//! when the handle is resolved.
//!
//! Every getter registers the handle with its namespace (for `validate`)
//! and records a help entry (for `view_help`).

use crate::help::KeyDescription;
use crate::namespace::DEFAULT;
use crate::proxy::ValueProxy;
use crate::registry::Registry;
use crate::validation::{self, Validator};
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::Arc;

/// Getters bound to one namespace of one registry.
#[derive(Debug, Clone)]
pub struct NamespaceGetters {
    registry: Arc<Registry>,
    namespace: String,
}

/// Getters for the default namespace of the global registry.
pub fn default_getters() -> NamespaceGetters {
    NamespaceGetters::new(&Registry::global(), DEFAULT)
}

impl NamespaceGetters {
    pub fn new(registry: &Arc<Registry>, namespace: impl Into<String>) -> Self {
        Self {
            registry: Arc::clone(registry),
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Declare an accessor with an arbitrary validator.
    ///
    /// # M-CANONICAL-DOCS
    ///
    /// ## Purpose
    /// The building block of every typed getter. Creates a deferred handle,
    /// registers it with the namespace and records its help text.
    ///
    /// ## Usage
    /// ```rust
    /// use staticconf::{validation, NamespaceGetters, Registry};
    ///
    /// let registry = std::sync::Arc::new(Registry::new());
    /// let getters = NamespaceGetters::new(&registry, "app");
    /// let ports = getters.get_as("ports", validation::list_of(validation::int()), None, Some("Listen ports"));
    /// assert!(ports.value().is_err());
    /// ```
    pub fn get_as<T>(
        &self,
        key: &str,
        validator: Validator<T>,
        default: Option<T>,
        help: Option<&str>,
    ) -> ValueProxy<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let namespace = self.registry.get_or_create(&self.namespace);
        self.registry.help().add(
            &self.namespace,
            KeyDescription {
                name: key.to_string(),
                type_name: validator.name().to_string(),
                default: default.as_ref().map(|d| validator.render(d)),
                help: help.map(str::to_string),
            },
        );

        let proxy = ValueProxy::new(Arc::clone(&namespace), key, validator, default);
        namespace.register(proxy.registration());
        proxy
    }

    pub fn get(&self, key: &str, default: Option<Value>, help: Option<&str>) -> ValueProxy<Value> {
        self.get_as(key, validation::any(), default, help)
    }

    pub fn get_bool(&self, key: &str, default: Option<bool>, help: Option<&str>) -> ValueProxy<bool> {
        self.get_as(key, validation::bool(), default, help)
    }

    pub fn get_string(
        &self,
        key: &str,
        default: Option<String>,
        help: Option<&str>,
    ) -> ValueProxy<String> {
        self.get_as(key, validation::string(), default, help)
    }

    pub fn get_int(&self, key: &str, default: Option<i64>, help: Option<&str>) -> ValueProxy<i64> {
        self.get_as(key, validation::int(), default, help)
    }

    pub fn get_float(&self, key: &str, default: Option<f64>, help: Option<&str>) -> ValueProxy<f64> {
        self.get_as(key, validation::float(), default, help)
    }

    pub fn get_date(
        &self,
        key: &str,
        default: Option<NaiveDate>,
        help: Option<&str>,
    ) -> ValueProxy<NaiveDate> {
        self.get_as(key, validation::date(), default, help)
    }

    pub fn get_datetime(
        &self,
        key: &str,
        default: Option<NaiveDateTime>,
        help: Option<&str>,
    ) -> ValueProxy<NaiveDateTime> {
        self.get_as(key, validation::datetime(), default, help)
    }

    pub fn get_time(
        &self,
        key: &str,
        default: Option<NaiveTime>,
        help: Option<&str>,
    ) -> ValueProxy<NaiveTime> {
        self.get_as(key, validation::time(), default, help)
    }

    pub fn get_list(
        &self,
        key: &str,
        default: Option<Vec<Value>>,
        help: Option<&str>,
    ) -> ValueProxy<Vec<Value>> {
        self.get_as(key, validation::list(), default, help)
    }

    pub fn get_set(
        &self,
        key: &str,
        default: Option<Vec<Value>>,
        help: Option<&str>,
    ) -> ValueProxy<Vec<Value>> {
        self.get_as(key, validation::set(), default, help)
    }

    pub fn get_tuple(
        &self,
        key: &str,
        default: Option<Vec<Value>>,
        help: Option<&str>,
    ) -> ValueProxy<Vec<Value>> {
        self.get_as(key, validation::tuple(), default, help)
    }

    pub fn get_regex(
        &self,
        key: &str,
        default: Option<regex::Regex>,
        help: Option<&str>,
    ) -> ValueProxy<regex::Regex> {
        self.get_as(key, validation::regex(), default, help)
    }

    pub fn get_log_level(
        &self,
        key: &str,
        default: Option<tracing::Level>,
        help: Option<&str>,
    ) -> ValueProxy<tracing::Level> {
        self.get_as(key, validation::log_level(), default, help)
    }

    pub fn get_list_of<T>(
        &self,
        key: &str,
        item: Validator<T>,
        default: Option<Vec<T>>,
        help: Option<&str>,
    ) -> ValueProxy<Vec<T>>
    where
        T: Clone + std::fmt::Debug + Send + Sync + 'static,
    {
        self.get_as(key, validation::list_of(item), default, help)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{self, LoadOptions};

    fn setup() -> (Arc<Registry>, NamespaceGetters) {
        let registry = Arc::new(Registry::new());
        let getters = NamespaceGetters::new(&registry, "getters");
        (registry, getters)
    }

    #[test]
    fn test_handle_declared_before_load() {
        let (registry, getters) = setup();
        let value = getters.get_string("a.b", None, None);

        loader::dict(
            &registry,
            Value::map([("a", Value::map([("b", "loaded")]))]),
            LoadOptions::new().namespace("getters"),
        )
        .unwrap();
        assert_eq!(value.value().unwrap(), "loaded");
    }

    #[test]
    fn test_typed_getters() {
        let (registry, getters) = setup();
        loader::dict(
            &registry,
            Value::map([
                ("flag", Value::from("yes")),
                ("ratio", Value::from("0.5")),
                ("hosts", Value::from(vec!["a", "b", "a"])),
                ("level", Value::from("warning")),
                ("when", Value::from("5 PM")),
            ]),
            LoadOptions::new().namespace("getters"),
        )
        .unwrap();

        assert!(getters.get_bool("flag", None, None).value().unwrap());
        assert_eq!(getters.get_float("ratio", None, None).value().unwrap(), 0.5);
        assert_eq!(getters.get_set("hosts", None, None).value().unwrap().len(), 2);
        assert_eq!(getters.get_list("hosts", None, None).value().unwrap().len(), 3);
        assert_eq!(
            getters.get_log_level("level", None, None).value().unwrap(),
            tracing::Level::WARN
        );
        assert_eq!(
            getters.get_time("when", None, None).value().unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap()
        );
        assert_eq!(
            getters
                .get_list_of("hosts", validation::string(), None, None)
                .value()
                .unwrap(),
            vec!["a".to_string(), "b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn test_getters_register_help_and_validation() {
        let (registry, getters) = setup();
        let _port = getters.get_int("port", Some(8080), Some("Listen port"));
        let _name = getters.get_string("name", None, None);

        let help = registry.view_help();
        assert!(help.contains("Namespace: getters"));
        assert!(help.contains("port (Type: int, Default: 8080)\nListen port"));
        assert!(help.contains("name (Type: string, Default: <Undefined>)"));

        let err = registry.validate("getters", false).unwrap_err();
        assert!(err.is_missing_value());
    }

    #[test]
    fn test_dropped_handles_are_not_validated() {
        let (registry, getters) = setup();
        drop(getters.get_string("name", None, None));
        assert!(registry.validate("getters", false).is_ok());
    }
}
