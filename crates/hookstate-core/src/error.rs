//! Domain-specific error types following panic-free policy.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while interpreting hook payloads and records.
#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// Invalid field value
    #[error("Invalid {field}: {value} (expected {expected})")]
    InvalidFieldValue {
        field: String,
        value: String,
        expected: String,
    },

    /// Parse error for incoming data
    #[error("Failed to parse {field}: {reason}")]
    ParseError { field: String, reason: String },
}

impl DomainError {
    /// Creates a parse error for the given field from any error type.
    pub fn parse<E: std::fmt::Display>(field: &str, err: E) -> Self {
        Self::ParseError {
            field: field.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Errors raised by the on-disk state store.
///
/// Every variant carries the path involved so a log line is enough to
/// diagnose an unwritable store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create state directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read state directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state record: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_display() {
        let err = DomainError::parse("hook payload", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "Failed to parse hook payload: expected value at line 1"
        );
    }

    #[test]
    fn test_store_error_includes_path() {
        let err = StoreError::Write {
            path: PathBuf::from("/nope/state.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let display = err.to_string();
        assert!(display.contains("/nope/state.json"));
        assert!(display.contains("denied"));
    }
}
