//! Migrator - applies and rolls back the compiled-in migrations

use super::categories::CreateCategoriesTable;
use super::checksum::{migration_checksum, validate_checksum};
use super::lock::MigrationLockGuard;
use super::state_table::{initialize_state_table, STATE_TABLE};
use super::{Migration, MigrationError, MigrationRecord, MigrationStatus, PendingMigration, SchemaManager};
use crate::executor::Executor;
use chrono::Utc;
use std::time::{Duration, Instant};

const LOCK_TIMEOUT: Duration = Duration::from_secs(60);

/// Orchestrates validation, execution and state tracking of migrations
pub struct Migrator {
    migrations: Vec<Box<dyn Migration>>,
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Migrator {
    /// Migrator over the migrations shipped with this crate
    pub fn new() -> Self {
        Self::with_migrations(vec![Box::new(CreateCategoriesTable)])
    }

    /// Migrator over an explicit list; sorted by version
    pub fn with_migrations(mut migrations: Vec<Box<dyn Migration>>) -> Self {
        migrations.sort_by_key(|m| m.version());
        Self { migrations }
    }

    pub fn migrations(&self) -> &[Box<dyn Migration>] {
        &self.migrations
    }

    /// Applied vs pending migrations
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::ChecksumMismatch` if an applied migration has changed
    /// since it ran, and `MigrationError::UnknownApplied` if the database records a
    /// migration this build does not know.
    pub fn status(&self, executor: &dyn Executor) -> Result<MigrationStatus, MigrationError> {
        initialize_state_table(executor)?;
        let applied = Self::query_applied_migrations(executor)?;

        let mut applied_records = Vec::new();
        let mut pending = Vec::new();
        for migration in &self.migrations {
            let checksum = migration_checksum(migration.as_ref())?;
            match applied.iter().find(|r| r.version == migration.version()) {
                Some(record) => {
                    validate_checksum(record.version, &record.name, &record.checksum, &checksum)?;
                    applied_records.push(record.clone());
                }
                None => pending.push(PendingMigration {
                    version: migration.version(),
                    name: migration.name().to_string(),
                    checksum,
                }),
            }
        }

        if let Some(record) = applied
            .iter()
            .find(|r| !self.migrations.iter().any(|m| m.version() == r.version))
        {
            return Err(MigrationError::UnknownApplied {
                version: record.version,
                name: record.name.clone(),
            });
        }

        Ok(MigrationStatus::new(applied_records, pending))
    }

    /// Apply up to `steps` pending migrations (all when `None`)
    ///
    /// # Errors
    ///
    /// Returns `MigrationError` if the lock cannot be taken, validation fails or a
    /// migration fails. Migrations applied before the failure stay recorded.
    pub fn up(&self, executor: &dyn Executor, steps: Option<usize>) -> Result<usize, MigrationError> {
        initialize_state_table(executor)?;
        let _lock = MigrationLockGuard::acquire(executor, LOCK_TIMEOUT)?;

        let status = self.status(executor)?;
        let manager = SchemaManager::new(executor);
        let mut applied_count = 0;

        for pending in status.pending.iter().take(steps.unwrap_or(usize::MAX)) {
            let Some(migration) = self.find(pending.version) else {
                continue;
            };
            let start = Instant::now();
            migration.up(&manager).map_err(|e| MigrationError::ExecutionFailed {
                version: pending.version,
                name: pending.name.clone(),
                error: e.to_string(),
            })?;

            let record = MigrationRecord::new(
                pending.version,
                pending.name.clone(),
                pending.checksum.clone(),
                Utc::now(),
                Some(i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX)),
                true,
            );
            Self::record_migration(executor, &record)?;
            log::info!("Applied migration {} ({})", record.name, record.version);
            applied_count += 1;
        }

        Ok(applied_count)
    }

    /// Roll back the last `steps` applied migrations (one when `None`)
    ///
    /// # Errors
    ///
    /// Returns `MigrationError` if the lock cannot be taken or a rollback fails.
    pub fn down(&self, executor: &dyn Executor, steps: Option<usize>) -> Result<usize, MigrationError> {
        initialize_state_table(executor)?;
        let _lock = MigrationLockGuard::acquire(executor, LOCK_TIMEOUT)?;

        let status = self.status(executor)?;
        let manager = SchemaManager::new(executor);
        let mut rolled_back = 0;

        for record in status.applied.iter().rev().take(steps.unwrap_or(1)) {
            let Some(migration) = self.find(record.version) else {
                continue;
            };
            migration.down(&manager).map_err(|e| MigrationError::ExecutionFailed {
                version: record.version,
                name: record.name.clone(),
                error: e.to_string(),
            })?;
            Self::remove_migration_record(executor, record.version)?;
            log::info!("Rolled back migration {} ({})", record.name, record.version);
            rolled_back += 1;
        }

        Ok(rolled_back)
    }

    fn find(&self, version: i64) -> Option<&dyn Migration> {
        self.migrations
            .iter()
            .find(|m| m.version() == version)
            .map(|m| m.as_ref())
    }

    /// Applied migrations, excluding the lock row
    fn query_applied_migrations(executor: &dyn Executor) -> Result<Vec<MigrationRecord>, MigrationError> {
        let sql = format!(
            "SELECT version, name, checksum, applied_at, execution_time_ms, success \
             FROM {STATE_TABLE} WHERE version > 0 ORDER BY version ASC"
        );
        executor
            .query_all(&sql, &[])?
            .iter()
            .map(|row| MigrationRecord::from_row(row).map_err(MigrationError::Database))
            .collect()
    }

    fn record_migration(executor: &dyn Executor, record: &MigrationRecord) -> Result<(), MigrationError> {
        let sql = format!(
            "INSERT INTO {STATE_TABLE} (version, name, checksum, applied_at, execution_time_ms, success) \
             VALUES ($1, $2, $3, $4, $5, $6)"
        );
        executor.execute(
            &sql,
            &[
                &record.version,
                &record.name,
                &record.checksum,
                &record.applied_at,
                &record.execution_time_ms,
                &record.success,
            ],
        )?;
        Ok(())
    }

    fn remove_migration_record(executor: &dyn Executor, version: i64) -> Result<(), MigrationError> {
        let sql = format!("DELETE FROM {STATE_TABLE} WHERE version = $1");
        executor.execute(&sql, &[&version])?;
        Ok(())
    }
}
