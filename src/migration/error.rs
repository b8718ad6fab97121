//! Migration-specific error types

use crate::executor::DbError;

/// Migration-specific errors
#[derive(Debug)]
pub enum MigrationError {
    /// Database execution error
    Database(DbError),
    /// Checksum mismatch
    ChecksumMismatch {
        version: i64,
        name: String,
        stored: String,
        current: String,
    },
    /// Migration lock timeout
    LockTimeout(String),
    /// Migration failed during execution
    ExecutionFailed {
        version: i64,
        name: String,
        error: String,
    },
    /// Applied migration no longer compiled into this build
    UnknownApplied { version: i64, name: String },
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Database(e) => write!(f, "Database error: {}", e),
            MigrationError::ChecksumMismatch {
                version,
                name,
                stored,
                current,
            } => {
                write!(
                    f,
                    "Migration '{}' (version {}) has been modified after being applied.\n\
                     Stored checksum: {}\n\
                     Current checksum: {}",
                    name, version, stored, current
                )
            }
            MigrationError::LockTimeout(msg) => {
                write!(
                    f,
                    "Migration lock timeout: {}\n\
                     Another process may be running migrations. If this persists, check for a \
                     stuck process or a stale lock row in docwiki_migrations",
                    msg
                )
            }
            MigrationError::ExecutionFailed { version, name, error } => {
                write!(
                    f,
                    "Migration '{}' (version {}) failed during execution: {}",
                    name, version, error
                )
            }
            MigrationError::UnknownApplied { version, name } => {
                write!(
                    f,
                    "Applied migration '{}' (version {}) is not known to this build",
                    name, version
                )
            }
        }
    }
}

impl std::error::Error for MigrationError {}

impl From<DbError> for MigrationError {
    fn from(error: DbError) -> Self {
        MigrationError::Database(error)
    }
}
