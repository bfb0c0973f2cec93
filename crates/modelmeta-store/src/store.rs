//! Persistent metadata store backed by redb.
//!
//! One table holds every record, keyed by (owner_type, owner_id, key). Reads
//! open a read txn per call; writes go through [`RecordTxn`] so a batch of
//! upserts commits or rolls back as a unit.

use crate::record::{RecordStore, RecordTxn};
use crate::tables;
use crate::types::{MetadataRecord, StoredRecord, unix_now};
use modelmeta_common::{OwnerRef, StoreConfig, ValueType};
use redb::{Database, ReadableTable, WriteTransaction};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, error, info};

/// Error type for metadata store operations
#[derive(Debug, thiserror::Error)]
pub enum MetaStoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::DatabaseError),
    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("write rejected: {0}")]
    Rejected(String),
}

impl From<redb::TransactionError> for MetaStoreError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

pub type MetaStoreResult<T> = Result<T, MetaStoreError>;

/// Persistent metadata store backed by redb.
pub struct MetaStore {
    db: Database,
}

impl MetaStore {
    /// Open (or create) the redb database at the given path.
    pub fn open(path: impl AsRef<Path>) -> MetaStoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        info!("Opened metadata store at {}", path.display());
        Self::with_database(db)
    }

    /// Create a store that lives only in memory.
    pub fn in_memory() -> MetaStoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        debug!("Opened in-memory metadata store");
        Self::with_database(db)
    }

    /// Open the store described by `config`; no path means in memory.
    pub fn from_config(config: &StoreConfig) -> MetaStoreResult<Self> {
        match &config.path {
            Some(path) => Self::open(path),
            None => Self::in_memory(),
        }
    }

    fn with_database(db: Database) -> MetaStoreResult<Self> {
        // Create all tables eagerly so later read txns don't fail
        let write_txn = db.begin_write()?;
        {
            let _t = write_txn.open_table(tables::MODEL_META)?;
            let _t = write_txn.open_table(tables::SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Visit every record of `owner` in key order.
    fn scan_owner(
        &self,
        owner: &OwnerRef,
        mut visit: impl FnMut(String, StoredRecord),
    ) -> MetaStoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::MODEL_META)?;
        let start = (owner.owner_type.as_str(), owner.owner_id, "");
        for entry in table.range(start..)? {
            let entry = entry?;
            let (owner_type, owner_id, key) = entry.0.value();
            if owner_type != owner.owner_type || owner_id != owner.owner_id {
                break;
            }
            match bincode::deserialize::<StoredRecord>(entry.1.value()) {
                Ok(stored) => visit(key.to_string(), stored),
                Err(e) => error!("Failed to decode record '{}' of {}: {}", key, owner, e),
            }
        }
        Ok(())
    }

    /// Look up several keys in one read txn, invoking `visit` for each hit.
    fn lookup_keys(
        &self,
        owner: &OwnerRef,
        keys: &[String],
        mut visit: impl FnMut(&str, StoredRecord),
    ) -> MetaStoreResult<()> {
        let distinct: BTreeSet<&str> = keys.iter().map(String::as_str).collect();
        if distinct.is_empty() {
            return Ok(());
        }
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::MODEL_META)?;
        for key in distinct {
            if let Some(val) = table.get((owner.owner_type.as_str(), owner.owner_id, key))? {
                match bincode::deserialize::<StoredRecord>(val.value()) {
                    Ok(stored) => visit(key, stored),
                    Err(e) => error!("Failed to decode record '{}' of {}: {}", key, owner, e),
                }
            }
        }
        Ok(())
    }
}

impl RecordStore for MetaStore {
    fn find_by_key(&self, owner: &OwnerRef, key: &str) -> MetaStoreResult<Option<MetadataRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::MODEL_META)?;
        match table.get((owner.owner_type.as_str(), owner.owner_id, key))? {
            Some(val) => {
                let stored: StoredRecord = bincode::deserialize(val.value())?;
                Ok(Some(MetadataRecord::from_stored(
                    owner.clone(),
                    key.to_string(),
                    stored,
                )))
            }
            None => Ok(None),
        }
    }

    fn find_by_keys(
        &self,
        owner: &OwnerRef,
        keys: &[String],
    ) -> MetaStoreResult<Vec<MetadataRecord>> {
        let mut result = Vec::new();
        self.lookup_keys(owner, keys, |key, stored| {
            result.push(MetadataRecord::from_stored(
                owner.clone(),
                key.to_string(),
                stored,
            ));
        })?;
        Ok(result)
    }

    fn find_all(&self, owner: &OwnerRef) -> MetaStoreResult<Vec<MetadataRecord>> {
        let mut result = Vec::new();
        self.scan_owner(owner, |key, stored| {
            result.push(MetadataRecord::from_stored(owner.clone(), key, stored));
        })?;
        Ok(result)
    }

    fn existing_keys(
        &self,
        owner: &OwnerRef,
        keys: &[String],
    ) -> MetaStoreResult<BTreeSet<String>> {
        let mut found = BTreeSet::new();
        self.lookup_keys(owner, keys, |key, _| {
            found.insert(key.to_string());
        })?;
        Ok(found)
    }

    fn delete_by_keys(&self, owner: &OwnerRef, keys: &[String]) -> MetaStoreResult<usize> {
        let distinct: BTreeSet<&str> = keys.iter().map(String::as_str).collect();
        if distinct.is_empty() {
            return Ok(0);
        }
        let write_txn = self.db.begin_write()?;
        let mut removed = 0;
        {
            let mut table = write_txn.open_table(tables::MODEL_META)?;
            for key in distinct {
                if table
                    .remove((owner.owner_type.as_str(), owner.owner_id, key))?
                    .is_some()
                {
                    removed += 1;
                }
            }
        }
        write_txn.commit()?;
        debug!("Deleted {} record(s) of {}", removed, owner);
        Ok(removed)
    }

    fn count(&self, owner: &OwnerRef) -> MetaStoreResult<u64> {
        let mut count = 0;
        self.scan_owner(owner, |_, _| count += 1)?;
        Ok(count)
    }

    fn begin(&self) -> MetaStoreResult<Box<dyn RecordTxn + '_>> {
        Ok(Box::new(RedbTxn {
            txn: self.db.begin_write()?,
        }))
    }
}

/// Write transaction over the redb metadata table
struct RedbTxn {
    txn: WriteTransaction,
}

impl RedbTxn {
    fn next_id(&self) -> MetaStoreResult<u64> {
        let mut seq = self.txn.open_table(tables::SEQUENCES)?;
        let next = seq
            .get(tables::MODEL_META_SEQUENCE)?
            .map_or(0, |v| v.value())
            + 1;
        seq.insert(tables::MODEL_META_SEQUENCE, next)?;
        Ok(next)
    }
}

impl RecordTxn for RedbTxn {
    fn upsert(
        &mut self,
        owner: &OwnerRef,
        key: &str,
        value: Option<&str>,
        value_type: ValueType,
    ) -> MetaStoreResult<()> {
        let now = unix_now();
        let record_key = (owner.owner_type.as_str(), owner.owner_id, key);
        let mut table = self.txn.open_table(tables::MODEL_META)?;
        let existing = match table.get(record_key)? {
            Some(val) => Some(bincode::deserialize::<StoredRecord>(val.value())?),
            None => None,
        };
        let stored = match existing {
            Some(prev) => StoredRecord {
                value: value.map(str::to_string),
                value_type: value_type.as_str().to_string(),
                updated_at: now,
                ..prev
            },
            None => StoredRecord {
                id: self.next_id()?,
                value: value.map(str::to_string),
                value_type: value_type.as_str().to_string(),
                created_at: now,
                updated_at: now,
            },
        };
        let bytes = bincode::serialize(&stored)?;
        table.insert(record_key, bytes.as_slice())?;
        Ok(())
    }

    fn commit(self: Box<Self>) -> MetaStoreResult<()> {
        self.txn.commit()?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> MetaStoreResult<()> {
        self.txn.abort()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn post(id: i64) -> OwnerRef {
        OwnerRef::new_unchecked("posts", id)
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|k| (*k).to_string()).collect()
    }

    #[test]
    fn test_upsert_insert_then_update() {
        let dir = tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("meta.redb")).unwrap();
        let owner = post(1);

        store
            .upsert(&owner, "title", Some("hello"), ValueType::String)
            .unwrap();
        let first = store.find_by_key(&owner, "title").unwrap().unwrap();
        assert_eq!(first.value.as_deref(), Some("hello"));
        assert_eq!(first.value_type(), Some(ValueType::String));

        store
            .upsert(&owner, "title", Some("42"), ValueType::Integer)
            .unwrap();
        let second = store.find_by_key(&owner, "title").unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.value.as_deref(), Some("42"));
        assert_eq!(second.value_type, "integer");
        assert_eq!(store.count(&owner).unwrap(), 1);
    }

    #[test]
    fn test_surrogate_ids_increase() {
        let store = MetaStore::in_memory().unwrap();
        let owner = post(1);
        store.upsert(&owner, "a", None, ValueType::Null).unwrap();
        store.upsert(&owner, "b", None, ValueType::Null).unwrap();

        let a = store.find_by_key(&owner, "a").unwrap().unwrap();
        let b = store.find_by_key(&owner, "b").unwrap().unwrap();
        assert!(b.id > a.id);
        assert_eq!(a.value, None);
    }

    #[test]
    fn test_records_scoped_by_owner() {
        let store = MetaStore::in_memory().unwrap();
        let video = OwnerRef::new_unchecked("videos", 1);
        store.upsert(&post(1), "k", Some("p1"), ValueType::String).unwrap();
        store.upsert(&post(2), "k", Some("p2"), ValueType::String).unwrap();
        store.upsert(&video, "k", Some("v1"), ValueType::String).unwrap();
        store.upsert(&post(1), "z", Some("p1z"), ValueType::String).unwrap();

        let all = store.find_all(&post(1)).unwrap();
        let found: Vec<_> = all.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(found, vec!["k", "z"]);
        assert!(all.iter().all(|r| r.owner == post(1)));

        assert_eq!(store.count(&post(2)).unwrap(), 1);
        assert_eq!(store.count(&video).unwrap(), 1);
        assert_eq!(store.count(&post(3)).unwrap(), 0);
    }

    #[test]
    fn test_find_by_keys_and_existing_keys() {
        let store = MetaStore::in_memory().unwrap();
        let owner = post(7);
        store.upsert(&owner, "a", Some("1"), ValueType::Integer).unwrap();
        store.upsert(&owner, "b", Some("2"), ValueType::Integer).unwrap();

        let records = store.find_by_keys(&owner, &keys(&["a", "c", "a"])).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "a");

        let existing = store.existing_keys(&owner, &keys(&["a", "b", "c"])).unwrap();
        let expected: BTreeSet<String> = keys(&["a", "b"]).into_iter().collect();
        assert_eq!(existing, expected);

        assert!(store.find_by_keys(&owner, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_delete_by_keys() {
        let store = MetaStore::in_memory().unwrap();
        let owner = post(1);
        for key in ["a", "b", "c"] {
            store.upsert(&owner, key, Some(key), ValueType::String).unwrap();
        }
        store.upsert(&post(2), "a", Some("a"), ValueType::String).unwrap();

        let removed = store.delete_by_keys(&owner, &keys(&["a", "c", "missing"])).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count(&owner).unwrap(), 1);
        assert!(store.find_by_key(&post(2), "a").unwrap().is_some());
        assert_eq!(store.delete_by_keys(&owner, &[]).unwrap(), 0);
    }

    #[test]
    fn test_rollback_discards_batch() {
        let store = MetaStore::in_memory().unwrap();
        let owner = post(1);

        let mut txn = store.begin().unwrap();
        txn.upsert(&owner, "a", Some("1"), ValueType::Integer).unwrap();
        txn.upsert(&owner, "b", Some("2"), ValueType::Integer).unwrap();
        txn.rollback().unwrap();
        assert_eq!(store.count(&owner).unwrap(), 0);

        let mut txn = store.begin().unwrap();
        txn.upsert(&owner, "a", Some("1"), ValueType::Integer).unwrap();
        txn.upsert(&owner, "b", Some("2"), ValueType::Integer).unwrap();
        txn.commit().unwrap();
        assert_eq!(store.count(&owner).unwrap(), 2);
    }

    #[test]
    fn test_store_reopen_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("meta.redb");
        let owner = post(3);

        {
            let store = MetaStore::open(&path).unwrap();
            store.upsert(&owner, "k", Some("v"), ValueType::String).unwrap();
        }

        let store = MetaStore::open(&path).unwrap();
        let record = store.find_by_key(&owner, "k").unwrap().unwrap();
        assert_eq!(record.value.as_deref(), Some("v"));

        store.upsert(&owner, "k2", Some("v2"), ValueType::String).unwrap();
        let second = store.find_by_key(&owner, "k2").unwrap().unwrap();
        assert!(second.id > record.id);
    }

    #[test]
    fn test_from_config_in_memory() {
        let store = MetaStore::from_config(&StoreConfig { path: None }).unwrap();
        assert_eq!(store.count(&post(1)).unwrap(), 0);
    }
}
