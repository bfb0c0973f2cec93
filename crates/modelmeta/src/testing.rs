//! Test doubles: an owner that persists itself, and a store that rejects
//! writes for one key.

use crate::owner::{MetadataOwner, SaveListener, SaveListeners};
use modelmeta_common::{OwnerRef, ValueType};
use modelmeta_store::{
    MetaStore, MetaStoreError, MetaStoreResult, MetadataRecord, RecordStore, RecordTxn,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};

static NEXT_ID: AtomicI64 = AtomicI64::new(1);

/// Owner stub: gets an id on first save and notifies listeners afterwards
#[derive(Debug, Default)]
pub struct Post {
    id: Option<i64>,
    listeners: SaveListeners,
}

impl Post {
    pub fn new() -> Self {
        Self {
            id: None,
            listeners: SaveListeners::new(),
        }
    }

    /// Already-persisted owner, as if loaded from its own table
    pub fn persisted() -> Self {
        let mut post = Self::new();
        post.id = Some(NEXT_ID.fetch_add(1, Ordering::Relaxed));
        post
    }

    pub fn save(&mut self) -> bool {
        self.persist(true)
    }

    /// A save whose own row write fails
    pub fn save_failing(&mut self) -> bool {
        self.persist(false)
    }

    /// Assigns an id on first save, performs the row write, and notifies the
    /// listeners only once the write has succeeded. A failed first write
    /// gives the id back.
    fn persist(&mut self, write_succeeds: bool) -> bool {
        let previous = self.id;
        let id = *self
            .id
            .get_or_insert_with(|| NEXT_ID.fetch_add(1, Ordering::Relaxed));
        if !write_succeeds {
            self.id = previous;
            return false;
        }
        self.listeners.notify_saved(id)
    }
}

impl MetadataOwner for Post {
    fn owner_kind(&self) -> &str {
        "tests::Post"
    }

    fn persisted_id(&self) -> Option<i64> {
        self.id
    }

    fn register_save_listener(&mut self, listener: SaveListener) {
        self.listeners.register(listener);
    }
}

/// In-memory store whose transactions reject upserts of one key
pub struct FaultyStore {
    inner: MetaStore,
    rejected_key: String,
    attempted: Mutex<Vec<String>>,
}

impl FaultyStore {
    pub fn new(rejected_key: &str) -> Self {
        Self {
            inner: MetaStore::in_memory().unwrap(),
            rejected_key: rejected_key.to_string(),
            attempted: Mutex::new(Vec::new()),
        }
    }

    /// Keys passed to `upsert`, in call order
    pub fn attempted(&self) -> Vec<String> {
        self.attempted.lock().clone()
    }
}

impl RecordStore for FaultyStore {
    fn find_by_key(&self, owner: &OwnerRef, key: &str) -> MetaStoreResult<Option<MetadataRecord>> {
        self.inner.find_by_key(owner, key)
    }

    fn find_by_keys(
        &self,
        owner: &OwnerRef,
        keys: &[String],
    ) -> MetaStoreResult<Vec<MetadataRecord>> {
        self.inner.find_by_keys(owner, keys)
    }

    fn find_all(&self, owner: &OwnerRef) -> MetaStoreResult<Vec<MetadataRecord>> {
        self.inner.find_all(owner)
    }

    fn existing_keys(
        &self,
        owner: &OwnerRef,
        keys: &[String],
    ) -> MetaStoreResult<BTreeSet<String>> {
        self.inner.existing_keys(owner, keys)
    }

    fn delete_by_keys(&self, owner: &OwnerRef, keys: &[String]) -> MetaStoreResult<usize> {
        self.inner.delete_by_keys(owner, keys)
    }

    fn count(&self, owner: &OwnerRef) -> MetaStoreResult<u64> {
        self.inner.count(owner)
    }

    fn begin(&self) -> MetaStoreResult<Box<dyn RecordTxn + '_>> {
        Ok(Box::new(FaultyTxn {
            inner: self.inner.begin()?,
            store: self,
        }))
    }
}

struct FaultyTxn<'a> {
    inner: Box<dyn RecordTxn + 'a>,
    store: &'a FaultyStore,
}

impl RecordTxn for FaultyTxn<'_> {
    fn upsert(
        &mut self,
        owner: &OwnerRef,
        key: &str,
        value: Option<&str>,
        value_type: ValueType,
    ) -> MetaStoreResult<()> {
        self.store.attempted.lock().push(key.to_string());
        if key == self.store.rejected_key {
            return Err(MetaStoreError::Rejected(format!("upsert of '{key}'")));
        }
        self.inner.upsert(owner, key, value, value_type)
    }

    fn commit(self: Box<Self>) -> MetaStoreResult<()> {
        self.inner.commit()
    }

    fn rollback(self: Box<Self>) -> MetaStoreResult<()> {
        self.inner.rollback()
    }
}
