//! # Readers
//!
//! Readers resolve a key at call time and return the validated value. The
//! lookup is the same as dereferencing a [`crate::ValueProxy`] once.

use crate::namespace::DEFAULT;
use crate::proxy::resolve;
use crate::registry::Registry;
use crate::validation::{self, Validator};
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use errors::Result;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct NamespaceReaders {
    registry: Arc<Registry>,
    namespace: String,
}

/// Readers for the default namespace of the global registry.
pub fn default_readers() -> NamespaceReaders {
    NamespaceReaders::new(&Registry::global(), DEFAULT)
}

impl NamespaceReaders {
    pub fn new(registry: &Arc<Registry>, namespace: impl Into<String>) -> Self {
        Self {
            registry: Arc::clone(registry),
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn read_as<T: Clone>(&self, key: &str, validator: &Validator<T>, default: Option<T>) -> Result<T> {
        let namespace = self.registry.get_or_create(&self.namespace);
        resolve(&namespace, key, validator, default.as_ref())
    }

    pub fn read(&self, key: &str, default: Option<Value>) -> Result<Value> {
        self.read_as(key, &validation::any(), default)
    }

    pub fn read_bool(&self, key: &str, default: Option<bool>) -> Result<bool> {
        self.read_as(key, &validation::bool(), default)
    }

    pub fn read_string(&self, key: &str, default: Option<String>) -> Result<String> {
        self.read_as(key, &validation::string(), default)
    }

    pub fn read_int(&self, key: &str, default: Option<i64>) -> Result<i64> {
        self.read_as(key, &validation::int(), default)
    }

    pub fn read_float(&self, key: &str, default: Option<f64>) -> Result<f64> {
        self.read_as(key, &validation::float(), default)
    }

    pub fn read_date(&self, key: &str, default: Option<NaiveDate>) -> Result<NaiveDate> {
        self.read_as(key, &validation::date(), default)
    }

    pub fn read_datetime(&self, key: &str, default: Option<NaiveDateTime>) -> Result<NaiveDateTime> {
        self.read_as(key, &validation::datetime(), default)
    }

    pub fn read_time(&self, key: &str, default: Option<NaiveTime>) -> Result<NaiveTime> {
        self.read_as(key, &validation::time(), default)
    }

    pub fn read_list(&self, key: &str, default: Option<Vec<Value>>) -> Result<Vec<Value>> {
        self.read_as(key, &validation::list(), default)
    }

    pub fn read_set(&self, key: &str, default: Option<Vec<Value>>) -> Result<Vec<Value>> {
        self.read_as(key, &validation::set(), default)
    }

    pub fn read_tuple(&self, key: &str, default: Option<Vec<Value>>) -> Result<Vec<Value>> {
        self.read_as(key, &validation::tuple(), default)
    }

    pub fn read_regex(&self, key: &str, default: Option<regex::Regex>) -> Result<regex::Regex> {
        self.read_as(key, &validation::regex(), default)
    }

    pub fn read_log_level(&self, key: &str, default: Option<tracing::Level>) -> Result<tracing::Level> {
        self.read_as(key, &validation::log_level(), default)
    }

    pub fn read_list_of<T>(&self, key: &str, item: Validator<T>, default: Option<Vec<T>>) -> Result<Vec<T>>
    where
        T: Clone + std::fmt::Debug + 'static,
    {
        self.read_as(key, &validation::list_of(item), default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{self, LoadOptions};

    fn loaded(pairs: &[(&str, &str)]) -> NamespaceReaders {
        let registry = Arc::new(Registry::new());
        loader::dict(
            &registry,
            Value::map(pairs.iter().copied()),
            LoadOptions::new().namespace("readers"),
        )
        .unwrap();
        NamespaceReaders::new(&registry, "readers")
    }

    #[test]
    fn test_read_round_trip() {
        let readers = loaded(&[("a.b", "1"), ("a.c", "2")]);
        assert_eq!(readers.read_int("a.b", None).unwrap(), 1);
        assert_eq!(readers.read_int("a.c", None).unwrap(), 2);
        assert!(readers
            .registry
            .get_or_create("readers")
            .check_unknown_keys()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_read_int_validation_failure() {
        let readers = loaded(&[("n", "not-a-number")]);
        let err = readers.read_int("n", None).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("readers failed to validate n=not-a-number as int"));
    }

    #[test]
    fn test_read_missing_with_and_without_default() {
        let readers = loaded(&[]);
        assert!(readers.read_int("missing.key", None).unwrap_err().is_missing_value());
        assert_eq!(readers.read_int("missing.key", Some(5)).unwrap(), 5);
    }

    #[test]
    fn test_read_regex_and_date() {
        let readers = loaded(&[("pattern", "^ab+$"), ("day", "2014-02-03")]);
        assert!(readers.read_regex("pattern", None).unwrap().is_match("abbb"));
        assert_eq!(
            readers.read_date("day", None).unwrap(),
            NaiveDate::from_ymd_opt(2014, 2, 3).unwrap()
        );
    }
}
