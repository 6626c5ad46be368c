//! Error types for dynrepo.
//!
//! Library crates use [`DynRepoError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all dynrepo operations.
#[derive(Debug, thiserror::Error)]
pub enum DynRepoError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Record provider / database error. Passed through the interceptor unchanged.
    #[error("storage error: {0}")]
    Storage(String),

    /// A record lacks an attribute the enrichment pipeline requires.
    #[error("record {record:?} has no attribute '{attribute}'")]
    MissingAttribute { record: String, attribute: String },

    /// Template loading or rendering error.
    #[error("template error: {0}")]
    Template(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (malformed column, bad sort property, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DynRepoError>;

impl DynRepoError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a missing-attribute error for the record identified by `record`.
    pub fn missing_attribute(record: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            record: record.into(),
            attribute: attribute.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DynRepoError::config("missing key 'repository.table'");
        assert_eq!(err.to_string(), "config error: missing key 'repository.table'");

        let err = DynRepoError::missing_attribute("ds-1", "geo_extent");
        assert_eq!(
            err.to_string(),
            "record \"ds-1\" has no attribute 'geo_extent'"
        );
    }
}
