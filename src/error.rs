//! Error types for orbfield.
//!
//! The per-frame simulation never fails: out-of-range inputs are clamped or
//! mapped to defaults. Errors only surface when loading, validating, or
//! building from a [`FieldConfig`](crate::FieldConfig).

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or validating a field configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write a configuration file.
    #[error("failed to access config file {path}: {source}")]
    Io {
        /// File that could not be accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration was not valid JSON for [`FieldConfig`](crate::FieldConfig).
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is outside the range the engine can work with.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Human-readable explanation.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
