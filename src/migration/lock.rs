//! Table-based migration lock
//!
//! The process that inserts the reserved row (version `-1`) into the state table holds
//! the lock; everyone else polls until it disappears or the timeout passes.

use super::state_table::STATE_TABLE;
use super::MigrationError;
use crate::executor::Executor;
use std::time::{Duration, Instant};

/// Never used by a real migration, whose versions are positive timestamps.
pub const LOCK_VERSION: i64 = -1;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Holds the migration lock until dropped
pub struct MigrationLockGuard<'a> {
    executor: &'a dyn Executor,
}

impl<'a> MigrationLockGuard<'a> {
    /// # Errors
    ///
    /// Returns `MigrationError::LockTimeout` if the lock is not acquired within
    /// `timeout`, or `MigrationError::Database` on any other failure.
    pub fn acquire(executor: &'a dyn Executor, timeout: Duration) -> Result<Self, MigrationError> {
        let start = Instant::now();
        let sql = format!(
            "INSERT INTO {STATE_TABLE} (version, name, checksum, applied_at, success) \
             VALUES ({LOCK_VERSION}, 'LOCK', 'lock', NOW(), true) \
             ON CONFLICT (version) DO NOTHING"
        );

        loop {
            if executor.execute(&sql, &[])? > 0 {
                log::debug!("Acquired migration lock after {:?}", start.elapsed());
                return Ok(Self { executor });
            }
            if start.elapsed() >= timeout {
                return Err(MigrationError::LockTimeout(format!(
                    "Failed to acquire migration lock within {:?}. To clear a stale lock: \
                     DELETE FROM {STATE_TABLE} WHERE version = {LOCK_VERSION}",
                    timeout
                )));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for MigrationLockGuard<'_> {
    fn drop(&mut self) {
        let sql = format!("DELETE FROM {STATE_TABLE} WHERE version = {LOCK_VERSION}");
        if let Err(e) = self.executor.execute(&sql, &[]) {
            log::warn!("Failed to release migration lock: {}", e);
        }
    }
}
