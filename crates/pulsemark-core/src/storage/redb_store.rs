//! redb-backed history of published status snapshots.
//!
//! One table, `snapshots`, keyed by the snapshot's generation time in unix
//! seconds. Values are canonical archive bytes (see [`crate::formats`]), so
//! the on-disk history and exported archives share one encoding.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use thiserror::Error;

use crate::formats::{FormatError, decode_canonical, encode_canonical};
use crate::snapshot::StatusSnapshot;

const SNAPSHOTS: TableDefinition<i64, &[u8]> = TableDefinition::new("snapshots");

/// Failures of the history store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error(transparent)]
    Format(#[from] FormatError),

    /// A snapshot with this generation time is already stored.
    ///
    /// Republishing a corrected report requires a new generation time;
    /// history entries are never overwritten.
    #[error("snapshot for generation time {0} already stored")]
    DuplicateTimestamp(i64),
}

/// Append-only history of published snapshots.
pub struct HistoryStore {
    db: Database,
}

impl HistoryStore {
    /// Open (or create) a history database at `path`.
    ///
    /// The snapshots table is materialized immediately so later readers
    /// never observe a missing table.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Database::create(path)?;
        let txn = db.begin_write()?;
        txn.open_table(SNAPSHOTS)?;
        txn.commit()?;
        Ok(Self { db })
    }

    /// Append a snapshot, keyed by its generation time.
    ///
    /// Returns the key on success. Duplicate generation times are rejected.
    pub fn append(&self, snapshot: &StatusSnapshot) -> Result<i64, StoreError> {
        let key = snapshot.generated_at.timestamp();
        let bytes = encode_canonical(snapshot)?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SNAPSHOTS)?;
            if table.get(key)?.is_some() {
                return Err(StoreError::DuplicateTimestamp(key));
            }
            table.insert(key, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(key)
    }

    /// The most recently generated snapshot, if any.
    pub fn latest(&self) -> Result<Option<StatusSnapshot>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SNAPSHOTS)?;
        match table.iter()?.next_back() {
            None => Ok(None),
            Some(entry) => {
                let (_, value) = entry?;
                Ok(Some(decode_canonical(value.value())?))
            }
        }
    }

    /// The snapshot stored for a generation time, if any.
    pub fn get(&self, timestamp: i64) -> Result<Option<StatusSnapshot>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SNAPSHOTS)?;
        match table.get(timestamp)? {
            None => Ok(None),
            Some(value) => Ok(Some(decode_canonical(value.value())?)),
        }
    }

    /// All stored generation times, oldest first.
    pub fn timestamps(&self) -> Result<Vec<i64>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SNAPSHOTS)?;
        let mut keys = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            keys.push(key.value());
        }
        Ok(keys)
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> Result<u64, StoreError> {
        Ok(self.timestamps()?.len() as u64)
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn snapshot_at(secs: i64) -> StatusSnapshot {
        let mut s = StatusSnapshot::empty(
            Utc.timestamp_opt(secs, 0).single().expect("valid timestamp"),
        );
        s.total_posts = secs as u64;
        s
    }

    fn temp_store() -> (TempDir, HistoryStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = HistoryStore::open(&dir.path().join("history.redb")).expect("open store");
        (dir, store)
    }

    #[test]
    fn new_store_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.is_empty().expect("is_empty"));
        assert_eq!(store.latest().expect("latest"), None);
    }

    #[test]
    fn append_and_read_back() {
        let (_dir, store) = temp_store();
        let snapshot = snapshot_at(1_700_000_000);

        let key = store.append(&snapshot).expect("append");
        assert_eq!(key, 1_700_000_000);
        assert_eq!(store.get(key).expect("get"), Some(snapshot));
    }

    #[test]
    fn latest_returns_newest() {
        let (_dir, store) = temp_store();
        store.append(&snapshot_at(100)).expect("append");
        store.append(&snapshot_at(300)).expect("append");
        store.append(&snapshot_at(200)).expect("append");

        let latest = store.latest().expect("latest").expect("non-empty");
        assert_eq!(latest.generated_at.timestamp(), 300);
    }

    #[test]
    fn duplicate_timestamp_is_rejected() {
        let (_dir, store) = temp_store();
        store.append(&snapshot_at(100)).expect("append");

        let err = store.append(&snapshot_at(100)).expect_err("duplicate");
        assert!(matches!(err, StoreError::DuplicateTimestamp(100)));
        assert_eq!(store.len().expect("len"), 1);
    }

    #[test]
    fn timestamps_are_ordered() {
        let (_dir, store) = temp_store();
        for secs in [500, 100, 300] {
            store.append(&snapshot_at(secs)).expect("append");
        }
        assert_eq!(store.timestamps().expect("timestamps"), vec![100, 300, 500]);
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("history.redb");

        {
            let store = HistoryStore::open(&path).expect("open store");
            store.append(&snapshot_at(42)).expect("append");
        }

        let reopened = HistoryStore::open(&path).expect("reopen store");
        let latest = reopened.latest().expect("latest").expect("non-empty");
        assert_eq!(latest.generated_at.timestamp(), 42);
    }
}
