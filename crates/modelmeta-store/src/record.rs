//! Record store capability consumed by the metadata engine.
//!
//! Every operation is scoped by an [`OwnerRef`] supplied by the caller; the
//! store keeps no cache of its own.

use crate::store::MetaStoreResult;
use crate::types::MetadataRecord;
use modelmeta_common::{OwnerRef, ValueType};
use std::collections::BTreeSet;

/// CRUD access to the single metadata table
pub trait RecordStore: Send + Sync {
    /// Record stored under `key` for `owner`
    fn find_by_key(&self, owner: &OwnerRef, key: &str) -> MetaStoreResult<Option<MetadataRecord>>;

    /// Records for the given keys; keys without a record are simply absent
    fn find_by_keys(&self, owner: &OwnerRef, keys: &[String])
    -> MetaStoreResult<Vec<MetadataRecord>>;

    /// Every record of `owner`
    fn find_all(&self, owner: &OwnerRef) -> MetaStoreResult<Vec<MetadataRecord>>;

    /// Distinct subset of `keys` that have a record
    fn existing_keys(&self, owner: &OwnerRef, keys: &[String]) -> MetaStoreResult<BTreeSet<String>>;

    /// Delete the records for `keys`, returning how many were removed
    fn delete_by_keys(&self, owner: &OwnerRef, keys: &[String]) -> MetaStoreResult<usize>;

    /// Number of records attached to `owner`
    fn count(&self, owner: &OwnerRef) -> MetaStoreResult<u64>;

    /// Open a write transaction
    fn begin(&self) -> MetaStoreResult<Box<dyn RecordTxn + '_>>;

    /// Upsert a single pair in its own transaction
    fn upsert(
        &self,
        owner: &OwnerRef,
        key: &str,
        value: Option<&str>,
        value_type: ValueType,
    ) -> MetaStoreResult<()> {
        let mut txn = self.begin()?;
        txn.upsert(owner, key, value, value_type)?;
        txn.commit()
    }
}

/// A write transaction over the metadata table
///
/// Dropping a transaction without committing discards its writes.
pub trait RecordTxn {
    /// Insert the record for (owner, key), or update value and type if present
    fn upsert(
        &mut self,
        owner: &OwnerRef,
        key: &str,
        value: Option<&str>,
        value_type: ValueType,
    ) -> MetaStoreResult<()>;

    /// Make every write of this transaction visible
    fn commit(self: Box<Self>) -> MetaStoreResult<()>;

    /// Discard every write of this transaction
    fn rollback(self: Box<Self>) -> MetaStoreResult<()>;
}
