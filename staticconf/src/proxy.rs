//! # Deferred Value Handles
//!
//! A [`ValueProxy`] is bound to a namespace, key, validator and optional
//! default. Creating one never reads configuration; every call to
//! [`ValueProxy::value`] looks the key up in the current snapshot, so the
//! handle follows loads and reloads without being rebuilt.
//!
//! ## Usage
//! ```rust
//! use staticconf::{NamespaceGetters, Registry, Value};
//!
//! let registry = std::sync::Arc::new(Registry::new());
//! let getters = NamespaceGetters::new(&registry, "DEFAULT");
//! let port = getters.get_int("port", None, None);
//!
//! staticconf::loader::dict(&registry, Value::map([("port", 8080)]), Default::default()).unwrap();
//! assert_eq!(port.value().unwrap(), 8080);
//! ```

use crate::namespace::{ConfigNamespace, RegisteredValue};
use crate::validation::Validator;
use errors::{ConfigurationError, Result, StaticConfError};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Look `key` up in `namespace` and run it through `validator`.
///
/// A present key is marked read only when it validates. An absent key with a
/// default is marked read as well, so a declared-but-defaulted key is never
/// reported as unknown.
pub(crate) fn resolve<T: Clone>(
    namespace: &ConfigNamespace,
    key: &str,
    validator: &Validator<T>,
    default: Option<&T>,
) -> Result<T> {
    let values = namespace.values();
    match (values.get(key), default) {
        (Some(raw), _) => {
            let value = validator
                .validate(raw)
                .map_err(|e| StaticConfError::validation(namespace.name(), key, e))?;
            namespace.mark_read(key);
            Ok(value)
        }
        (None, Some(default)) => {
            namespace.mark_read(key);
            Ok(default.clone())
        }
        (None, None) => Err(ConfigurationError::MissingValue {
            namespace: namespace.name().to_string(),
            key: key.to_string(),
        }
        .into()),
    }
}

pub(crate) struct ProxyInner<T> {
    namespace: Arc<ConfigNamespace>,
    key: String,
    validator: Validator<T>,
    default: Option<T>,
}

impl<T: Clone + Send + Sync> RegisteredValue for ProxyInner<T> {
    fn config_key(&self) -> &str {
        &self.key
    }

    fn check(&self) -> Result<()> {
        resolve(&self.namespace, &self.key, &self.validator, self.default.as_ref()).map(|_| ())
    }
}

/// Forward reference to a configuration value.
pub struct ValueProxy<T> {
    inner: Arc<ProxyInner<T>>,
}

impl<T> Clone for ValueProxy<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ValueProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueProxy")
            .field("namespace", &self.inner.namespace.name())
            .field("key", &self.inner.key)
            .field("validator", &self.inner.validator.name())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> ValueProxy<T> {
    /// Build a handle without registering it anywhere. Accessors created
    /// through [`crate::NamespaceGetters`] are registered for validation and
    /// help.
    pub fn new(
        namespace: Arc<ConfigNamespace>,
        key: impl Into<String>,
        validator: Validator<T>,
        default: Option<T>,
    ) -> Self {
        Self {
            inner: Arc::new(ProxyInner {
                namespace,
                key: key.into(),
                validator,
                default,
            }),
        }
    }

    pub(crate) fn registration(&self) -> std::sync::Weak<dyn RegisteredValue> {
        let weak: std::sync::Weak<ProxyInner<T>> = Arc::downgrade(&self.inner);
        weak
    }

    /// Resolve against the current configuration.
    ///
    /// ## Errors
    /// `MissingValue` when the key is absent without a default, `Validation`
    /// when the raw value does not convert.
    pub fn value(&self) -> Result<T> {
        resolve(
            &self.inner.namespace,
            &self.inner.key,
            &self.inner.validator,
            self.inner.default.as_ref(),
        )
    }

    /// Resolve and hand the value to `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.value().map(|v| f(&v))
    }
}

impl<T> ValueProxy<T> {
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn namespace_name(&self) -> &str {
        self.inner.namespace.name()
    }

    pub fn validator(&self) -> &Validator<T> {
        &self.inner.validator
    }

    pub fn default_value(&self) -> Option<&T> {
        self.inner.default.as_ref()
    }
}

/// An unresolvable handle is never equal to anything.
impl<T: Clone + PartialEq + Send + Sync + 'static> PartialEq<T> for ValueProxy<T> {
    fn eq(&self, other: &T) -> bool {
        self.value().is_ok_and(|v| v == *other)
    }
}

impl<T: Clone + PartialOrd + Send + Sync + 'static> PartialOrd<T> for ValueProxy<T> {
    fn partial_cmp(&self, other: &T) -> Option<Ordering> {
        self.value().ok()?.partial_cmp(other)
    }
}

impl<T: Clone + fmt::Display + Send + Sync + 'static> fmt::Display for ValueProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Ok(v) => fmt::Display::fmt(&v, f),
            Err(_) => f.write_str("<error>"),
        }
    }
}
