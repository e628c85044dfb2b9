//! # Reload Callbacks
//!
//! An ordered chain of callbacks run after a reload. Callbacks are keyed by
//! identifier: adding an existing identifier replaces the callback in place.
//!
//! Invoking the chain first marks the target namespaces stale, so schema
//! values recompute, then calls every callback in insertion order.

use crate::namespace::DEFAULT;
use crate::registry::Registry;
use errors::{ConfigurationError, Result, StaticConfError};
use std::sync::Arc;
use tracing::{debug, warn};

pub type ReloadCallback = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

pub struct ReloadCallbackChain {
    registry: Arc<Registry>,
    namespace: String,
    all_names: bool,
    callbacks: Vec<(String, ReloadCallback)>,
    aggregate_errors: bool,
}

impl std::fmt::Debug for ReloadCallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadCallbackChain")
            .field("namespace", &self.namespace)
            .field("all_names", &self.all_names)
            .field("callbacks", &self.identifiers())
            .field("aggregate_errors", &self.aggregate_errors)
            .finish()
    }
}

impl ReloadCallbackChain {
    /// Chain targeting `namespace`, or every namespace when `all_names`.
    pub fn new(registry: &Arc<Registry>, namespace: impl Into<String>, all_names: bool) -> Self {
        Self {
            registry: Arc::clone(registry),
            namespace: namespace.into(),
            all_names,
            callbacks: Vec::new(),
            aggregate_errors: false,
        }
    }

    /// Chain over every namespace of the global registry.
    pub fn global() -> Self {
        Self::new(&Registry::global(), DEFAULT, true)
    }

    /// Keep running after a failing callback and report every failure
    /// together.
    #[must_use]
    pub fn aggregate_errors(mut self, enabled: bool) -> Self {
        self.aggregate_errors = enabled;
        self
    }

    #[must_use]
    pub fn with_callback<F>(mut self, identifier: impl Into<String>, callback: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add(identifier, callback);
        self
    }

    /// Register `callback`, replacing any callback with the same identifier
    /// at its original position.
    pub fn add<F>(&mut self, identifier: impl Into<String>, callback: F)
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let identifier = identifier.into();
        let callback: ReloadCallback = Arc::new(callback);
        match self.callbacks.iter_mut().find(|(id, _)| *id == identifier) {
            Some(slot) => slot.1 = callback,
            None => self.callbacks.push((identifier, callback)),
        }
    }

    /// Remove a callback.
    ///
    /// ## Errors
    /// `UnknownCallback` when nothing is registered under `identifier`.
    pub fn remove(&mut self, identifier: &str) -> Result<()> {
        let before = self.callbacks.len();
        self.callbacks.retain(|(id, _)| id != identifier);
        if self.callbacks.len() == before {
            return Err(ConfigurationError::UnknownCallback {
                identifier: identifier.to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.callbacks.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Invalidate the target namespaces and run every callback in order.
    ///
    /// ## Errors
    /// By default the first failing callback stops the chain and is
    /// returned as `Callback`. With aggregation every callback runs and the
    /// failures come back together as `Callbacks`.
    pub fn invoke(&self) -> Result<()> {
        self.registry.invalidate(&self.namespace, self.all_names);

        let mut failures = Vec::new();
        for (identifier, callback) in &self.callbacks {
            debug!(callback = %identifier, "Running reload callback");
            if let Err(source) = callback() {
                if !self.aggregate_errors {
                    return Err(StaticConfError::Callback {
                        identifier: identifier.clone(),
                        source,
                    });
                }
                warn!(callback = %identifier, error = %source, "Reload callback failed");
                failures.push((identifier.clone(), source));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(StaticConfError::Callbacks { failures })
        }
    }
}
