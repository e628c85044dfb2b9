//! # Configuration Precedence
//!
//! Later loads override earlier ones on key collision; non-colliding keys
//! from earlier loads persist. Collisions can be reported as duplicates.

use crate::container::ConfigValues;
use errors::{ConfigurationError, Result};

/// Overlay `overlay` onto a copy of `base` and log which keys changed.
///
/// The result is a complete new mapping; `base` is never touched, so a
/// snapshot swap of the result is all-or-nothing.
pub fn merge_with_logging(base: &ConfigValues, overlay: ConfigValues, source_name: &str) -> ConfigValues {
    let mut merged = base.clone();
    let changes: Vec<String> = overlay
        .iter()
        .filter(|(k, v)| base.get(k) != Some(*v))
        .map(|(k, _)| k.clone())
        .collect();

    merged.merge(overlay);

    if !changes.is_empty() {
        tracing::debug!("Configuration from {}: {:?}", source_name, changes);
    }

    merged
}

/// Compare two mappings for duplicate keys. Raises when `raise_error` is
/// set, otherwise logs and returns whether duplicates were found.
pub fn check_duplicate_keys(
    namespace: &str,
    base: &ConfigValues,
    incoming: &ConfigValues,
    raise_error: bool,
) -> Result<bool> {
    let mut keys = base.shared_keys(incoming);
    if keys.is_empty() {
        return Ok(false);
    }
    keys.sort();

    if raise_error {
        return Err(ConfigurationError::DuplicateKeys {
            namespace: namespace.to_string(),
            keys,
        }
        .into());
    }

    tracing::info!(namespace = %namespace, keys = ?keys, "Duplicate keys in config");
    Ok(true)
}
