//! Checksums of migration DDL

use super::migration::Migration;
use super::schema_manager::SchemaManager;
use super::MigrationError;
use crate::executor::DbError;
use sha2::{Digest, Sha256};

/// SHA-256 over the statements a migration's `up` step emits, one per line
///
/// The statements are captured with a recording [`SchemaManager`], so nothing touches
/// the database.
///
/// # Errors
///
/// Returns `DbError` if the migration fails while being recorded.
pub fn migration_checksum(migration: &dyn Migration) -> Result<String, DbError> {
    let manager = SchemaManager::recording();
    migration.up(&manager)?;

    let mut hasher = Sha256::new();
    for statement in manager.recorded() {
        hasher.update(statement.as_bytes());
        hasher.update(b"\n");
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Validate a stored checksum against the current one
///
/// # Errors
///
/// Returns `MigrationError::ChecksumMismatch` when the two differ.
pub fn validate_checksum(
    version: i64,
    name: &str,
    stored: &str,
    current: &str,
) -> Result<(), MigrationError> {
    if stored == current {
        Ok(())
    } else {
        Err(MigrationError::ChecksumMismatch {
            version,
            name: name.to_string(),
            stored: stored.to_string(),
            current: current.to_string(),
        })
    }
}
