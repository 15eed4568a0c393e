//! Error types for CONFIG_DB access.
//!
//! All errors implement `std::error::Error` via `thiserror`.

use thiserror::Error;

/// Result type alias for config store operations.
pub type CfgMgrResult<T> = Result<T, CfgMgrError>;

/// Errors that can occur while reading or writing CONFIG_DB.
#[derive(Debug, Error)]
pub enum CfgMgrError {
    /// Redis/database operation failed.
    #[error("Database operation failed: {operation}: {message}")]
    Database {
        /// The operation that failed (e.g., "hgetall", "del", "connect").
        operation: String,
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// A table key could not be parsed.
    #[error("Invalid table key '{key}'")]
    InvalidKey {
        /// The raw key.
        key: String,
    },

    /// Table entry not found.
    #[error("Table entry not found: {table}|{key}")]
    EntryNotFound {
        /// The table name.
        table: String,
        /// The key.
        key: String,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl CfgMgrError {
    /// Creates a database error.
    pub fn database(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an entry not found error.
    pub fn entry_not_found(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::EntryNotFound {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CfgMgrError::Database { .. })
    }
}
