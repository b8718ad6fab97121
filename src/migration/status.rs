//! Migration status tracking

use crate::migration::MigrationRecord;

/// Applied and pending migrations, as seen by one [`Migrator`](super::Migrator)
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub applied: Vec<MigrationRecord>,
    pub pending: Vec<PendingMigration>,
}

/// A migration compiled into the crate but not yet applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigration {
    pub version: i64,
    pub name: String,
    pub checksum: String,
}

impl MigrationStatus {
    #[must_use]
    pub fn new(applied: Vec<MigrationRecord>, pending: Vec<PendingMigration>) -> Self {
        Self { applied, pending }
    }

    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn latest_applied_version(&self) -> Option<i64> {
        self.applied.iter().map(|m| m.version).max()
    }

    #[must_use]
    pub fn next_pending_version(&self) -> Option<i64> {
        self.pending.first().map(|m| m.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_status_versions() {
        let applied = vec![MigrationRecord::new(
            20240101000000,
            "first".to_string(),
            "abc".to_string(),
            Utc::now(),
            Some(4),
            true,
        )];
        let pending = vec![PendingMigration {
            version: 20240202000000,
            name: "second".to_string(),
            checksum: "def".to_string(),
        }];
        let status = MigrationStatus::new(applied, pending);
        assert!(!status.is_up_to_date());
        assert_eq!(status.latest_applied_version(), Some(20240101000000));
        assert_eq!(status.next_pending_version(), Some(20240202000000));
    }
}
