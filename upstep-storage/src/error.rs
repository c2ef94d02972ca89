//! Storage error types

use sea_orm::DbErr;
use std::path::PathBuf;
use thiserror::Error;
use upstep_core::MigrationError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection-related errors
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution errors
    #[error("Query failed: {0}")]
    QueryFailed(#[from] DbErr),

    /// A schema-change script was rejected by the database
    #[error("Script '{script}' failed: {source}")]
    ScriptFailed {
        script: String,
        #[source]
        source: DbErr,
    },

    /// A schema-change script could not be read from disk
    #[error("Cannot read script {path:?}: {source}")]
    ScriptUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration directory is malformed
    #[error("Invalid migration directory {path:?}: {message}")]
    InvalidMigrationDir { path: PathBuf, message: String },

    /// A stored value could not be decoded
    #[error("Corrupt schema version record: {0}")]
    CorruptRecord(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Engine-level outcome raised by the storage layer
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Convert into the engine taxonomy, keeping engine outcomes as they are
    /// and wrapping everything else as a store failure
    pub fn into_migration_error(self) -> MigrationError {
        match self {
            StorageError::Migration(err) => err,
            other => MigrationError::store(other),
        }
    }

    /// Get error code for operator-facing output
    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::ConnectionFailed(_) => "CONNECTION_ERROR",
            StorageError::QueryFailed(_) => "QUERY_ERROR",
            StorageError::ScriptFailed { .. } => "SCRIPT_ERROR",
            StorageError::ScriptUnreadable { .. } => "SCRIPT_UNREADABLE",
            StorageError::InvalidMigrationDir { .. } => "INVALID_MIGRATION_DIR",
            StorageError::CorruptRecord(_) => "CORRUPT_RECORD",
            StorageError::ConfigError(_) => "CONFIG_ERROR",
            StorageError::Migration(err) => err.error_code(),
            StorageError::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upstep_core::Version;

    #[test]
    fn test_engine_errors_pass_through() {
        let err = StorageError::Migration(MigrationError::UninitializedStore);
        assert!(matches!(
            err.into_migration_error(),
            MigrationError::UninitializedStore
        ));
    }

    #[test]
    fn test_other_errors_become_store_errors() {
        let err = StorageError::QueryFailed(DbErr::Custom("boom".to_string()));
        let converted = err.into_migration_error();
        assert_eq!(converted.error_code(), "STORE_ERROR");
        assert!(converted.to_string().contains("boom"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            StorageError::ConnectionFailed("x".to_string()).error_code(),
            "CONNECTION_ERROR"
        );
        assert_eq!(
            StorageError::Migration(MigrationError::AlreadyAtTarget(Version::new(0, 1, 0)))
                .error_code(),
            "ALREADY_AT_TARGET"
        );
    }
}
