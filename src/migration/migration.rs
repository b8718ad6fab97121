//! Migration trait definition

use super::schema_manager::SchemaManager;
use crate::executor::DbError;

/// A schema change with a forward and a reverse step
///
/// Both steps are synchronous; on the `may` runtime the executor parks the calling
/// coroutine while the statement runs.
pub trait Migration: Send + Sync {
    /// Human-readable identifier
    fn name(&self) -> &str;

    /// Version (timestamp: YYYYMMDDHHMMSS)
    fn version(&self) -> i64;

    /// Apply the migration
    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError>;

    /// Roll the migration back
    fn down(&self, manager: &SchemaManager<'_>) -> Result<(), DbError>;
}
