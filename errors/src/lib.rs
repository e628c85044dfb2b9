//! # Staticconf Errors
//!
//! Error taxonomy for the static configuration access layer.
//!
//! - [`ConfigurationError`]: something is missing or a source could not be
//!   loaded.
//! - [`ValidationError`]: a raw value could not be converted to the type an
//!   accessor demanded.
//! - [`StaticConfError`]: the crate-level error, wrapping the two above with
//!   the namespace and key they were raised for.
//!
//! Uses `thiserror` for structured error definitions with named fields.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StaticConfError>;

/// Errors raised while locating, loading or reading configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("{namespace} is missing value for: {key}")]
    MissingValue { namespace: String, key: String },

    #[error("Configuration source not found: {source_name}")]
    SourceNotFound { source_name: String },

    #[error("Failed to read {source_name}: {reason}")]
    Io { source_name: String, reason: String },

    #[error("Failed to parse {format} from {source_name}: {reason}")]
    Parse {
        format: String,
        source_name: String,
        reason: String
    },

    #[error("Invalid {format} line in {source_name}: {line}")]
    InvalidLine {
        format: String,
        source_name: String,
        line: String
    },

    #[error("Unexpected value in {namespace} configuration: {keys:?}")]
    UnknownKeys { namespace: String, keys: Vec<String> },

    #[error("Duplicate keys in {namespace} configuration: {keys:?}")]
    DuplicateKeys { namespace: String, keys: Vec<String> },

    #[error("Failed to auto-load configuration from {base_dir}. No configuration files found.")]
    NoConfigurationFound { base_dir: String },

    #[error("{source_name} has tag {tag} with child or attribute named value")]
    AmbiguousValue { source_name: String, tag: String },

    #[error("No reload callback registered as: {identifier}")]
    UnknownCallback { identifier: String },

    #[error("Unsupported on this platform: {capability}")]
    Unsupported { capability: String },

    #[error("File watch on {path} failed: {reason}")]
    Watch { path: String, reason: String }
}

/// A raw value could not be coerced into the expected type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid {expected}: {value}{}", .reason.as_ref().map(|r| format!(" ({r})")).unwrap_or_default())]
pub struct ValidationError {
    pub expected: String,
    pub value: String,
    pub reason: Option<String>
}

impl ValidationError {
    pub fn new(expected: impl Into<String>, value: impl ToString) -> Self {
        Self {
            expected: expected.into(),
            value: value.to_string(),
            reason: None
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Crate-level error for every public staticconf operation.
#[derive(Debug, Error)]
pub enum StaticConfError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("{namespace} failed to validate {key}={value} as {expected}: {source}")]
    Validation {
        namespace: String,
        key: String,
        value: String,
        expected: String,
        #[source]
        source: ValidationError
    },

    #[error("Reload callback {identifier} failed: {source}")]
    Callback {
        identifier: String,
        #[source]
        source: anyhow::Error
    },

    #[error("{} reload callbacks failed: {:?}", .failures.len(), .failures.iter().map(|(id, _)| id).collect::<Vec<_>>())]
    Callbacks { failures: Vec<(String, anyhow::Error)> }
}

impl StaticConfError {
    /// Wrap a validator failure with the lookup it happened in.
    pub fn validation(namespace: &str, key: &str, source: ValidationError) -> Self {
        Self::Validation {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: source.value.clone(),
            expected: source.expected.clone(),
            source
        }
    }

    pub fn is_missing_value(&self) -> bool {
        matches!(
            self,
            Self::Configuration(ConfigurationError::MissingValue { .. })
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
