//! Metadata handle attached to one owner instance.
//!
//! The handle shares its cache with a save listener registered on the owner,
//! so values staged with `immediate = false` are flushed after the owner's
//! next successful save. Handles are single-threaded and never share cache
//! state with other handles, even for the same stored owner.

use crate::cache::OwnerCache;
use crate::codec::{self, MetaValue};
use crate::commit;
use crate::error::{MetaError, MetaResult};
use crate::keys::KeySelector;
use crate::owner::MetadataOwner;
use modelmeta_common::{MetaConfig, OwnerRef};
use modelmeta_store::{MetadataRecord, RecordStore};
use serde_json::Value as JsonValue;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

/// Result of a lookup through a [`KeySelector`]
#[derive(Clone, Debug, PartialEq)]
pub enum MetaLookup {
    /// Single key: the value, or the default when absent
    Value(MetaValue),
    /// Several keys: every requested key exactly once, absent keys as null
    Map(HashMap<String, MetaValue>),
}

pub struct Metadata {
    store: Arc<dyn RecordStore>,
    preload_on_get: bool,
    owner_type: String,
    owner_id: Rc<Cell<Option<i64>>>,
    cache: Rc<RefCell<OwnerCache>>,
}

impl Metadata {
    /// Attach a metadata handle to `owner`.
    ///
    /// The stored discriminator is resolved through the configured owner type
    /// map, and a save listener is registered that commits the whole cache
    /// after each successful save of the owner.
    pub fn attach<O: MetadataOwner + ?Sized>(
        owner: &mut O,
        store: Arc<dyn RecordStore>,
        config: &MetaConfig,
    ) -> MetaResult<Self> {
        let owner_type = config
            .owner_type_map
            .discriminator_for(owner.owner_kind())
            .to_string();
        // validates the discriminator
        OwnerRef::new(owner_type.as_str(), 0)?;

        let owner_id = Rc::new(Cell::new(owner.persisted_id()));
        let cache = Rc::new(RefCell::new(OwnerCache::new()));

        let listener = {
            let store = Arc::clone(&store);
            let owner_type = owner_type.clone();
            let owner_id = Rc::clone(&owner_id);
            let cache = Rc::clone(&cache);
            Box::new(move |id: i64| {
                owner_id.set(Some(id));
                let owner = OwnerRef::new_unchecked(owner_type.as_str(), id);
                let cache = cache.borrow();
                debug!("Flushing {} cached value(s) of {}", cache.len(), owner);
                commit::commit(store.as_ref(), &owner, cache.entries())
            })
        };
        owner.register_save_listener(listener);

        Ok(Self {
            store,
            preload_on_get: config.preload_on_get,
            owner_type,
            owner_id,
            cache,
        })
    }

    /// Persisted identity of the owner, `None` before its first save
    #[must_use]
    pub fn owner(&self) -> Option<OwnerRef> {
        self.owner_id
            .get()
            .map(|id| OwnerRef::new_unchecked(self.owner_type.as_str(), id))
    }

    /// Stored type discriminator of the owner
    #[must_use]
    pub fn owner_type(&self) -> &str {
        &self.owner_type
    }

    /// Set one value.
    ///
    /// With `immediate` and a persisted owner, the pair is committed before
    /// returning and the commit result is returned. Otherwise the value is
    /// staged in the cache until the owner's next save.
    #[must_use]
    pub fn set(&self, key: impl Into<String>, value: impl Into<MetaValue>, immediate: bool) -> bool {
        let key = key.into();
        let value = value.into();
        self.cache.borrow_mut().insert(key.clone(), value.clone());

        match self.owner() {
            Some(owner) if immediate => commit::commit(self.store.as_ref(), &owner, [(&key, &value)]),
            _ => {
                debug!("Staged metadata '{}' until the owner is saved", key);
                true
            }
        }
    }

    /// Set several values, committed in one transaction when `immediate`.
    #[must_use]
    pub fn set_many<K, V, I>(&self, values: I, immediate: bool) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<MetaValue>,
    {
        let pairs: Vec<(String, MetaValue)> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.cache.borrow_mut().extend(pairs.iter().cloned());

        match self.owner() {
            Some(owner) if immediate => commit::commit(
                self.store.as_ref(),
                &owner,
                pairs.iter().map(|(k, v)| (k, v)),
            ),
            _ => {
                debug!("Staged {} metadata value(s) until the owner is saved", pairs.len());
                true
            }
        }
    }

    /// Set several values from an untyped JSON payload.
    ///
    /// The payload must be a JSON object; anything else is rejected before
    /// the cache is touched.
    pub fn set_many_json(&self, values: &JsonValue, immediate: bool) -> MetaResult<bool> {
        let JsonValue::Object(map) = values else {
            return Err(MetaError::invalid_values_shape(format!(
                "expected an object of key/value pairs, got {values}"
            )));
        };
        Ok(self.set_many(
            map.iter().map(|(k, v)| (k.clone(), MetaValue::from(v.clone()))),
            immediate,
        ))
    }

    /// Value for `key`, or null when absent
    pub fn get(&self, key: &str) -> MetaResult<MetaValue> {
        self.get_or(key, MetaValue::Null)
    }

    /// Value for `key`, or `default` when absent. The default is not cached.
    pub fn get_or(&self, key: &str, default: impl Into<MetaValue>) -> MetaResult<MetaValue> {
        self.preload_if_configured()?;

        if let Some(value) = self.cache.borrow().get(key) {
            return Ok(value.clone());
        }
        let Some(owner) = self.owner() else {
            return Ok(default.into());
        };

        debug!("Cache miss for '{}' of {}", key, owner);
        match self.store.find_by_key(&owner, key)? {
            Some(record) => {
                let value = decode_record(&record);
                self.cache.borrow_mut().insert(record.key, value.clone());
                Ok(value)
            }
            None => Ok(default.into()),
        }
    }

    /// Values for several keys. Every requested key appears exactly once;
    /// keys found neither in the cache nor in the store map to null.
    pub fn get_many<K: AsRef<str>>(&self, keys: &[K]) -> MetaResult<HashMap<String, MetaValue>> {
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        self.lookup_many(&keys)
    }

    /// Lookup through a selector: single keys honor `default`, key lists
    /// resolve absent keys to null.
    pub fn get_keys(
        &self,
        keys: impl Into<KeySelector>,
        default: impl Into<MetaValue>,
    ) -> MetaResult<MetaLookup> {
        match keys.into() {
            KeySelector::One(key) => self.get_or(&key, default).map(MetaLookup::Value),
            KeySelector::Many(keys) => self.lookup_many(&keys).map(MetaLookup::Map),
        }
    }

    fn lookup_many(&self, keys: &[String]) -> MetaResult<HashMap<String, MetaValue>> {
        self.preload_if_configured()?;

        let (cached, uncached) = self.cache.borrow().partition(keys);
        let mut values = HashMap::with_capacity(cached.len() + uncached.len());

        if !uncached.is_empty()
            && let Some(owner) = self.owner()
        {
            debug!("Fetching {} uncached key(s) of {}", uncached.len(), owner);
            let records = self.store.find_by_keys(&owner, &uncached)?;
            let mut cache = self.cache.borrow_mut();
            for record in records {
                let value = decode_record(&record);
                cache.insert(record.key.clone(), value.clone());
                values.insert(record.key, value);
            }
        }
        for key in uncached {
            values.entry(key).or_insert(MetaValue::Null);
        }

        let cache = self.cache.borrow();
        for key in cached {
            if let Some(value) = cache.get(&key) {
                values.insert(key, value.clone());
            }
        }
        Ok(values)
    }

    /// Every value of the owner.
    ///
    /// The first call loads all stored records and merges them under the
    /// cached entries; later calls are served from the cache alone.
    pub fn all(&self) -> MetaResult<HashMap<String, MetaValue>> {
        if self.cache.borrow().is_all_loaded() {
            return Ok(self.cache.borrow().entries().clone());
        }

        let snapshot: HashMap<String, MetaValue> = match self.owner() {
            Some(owner) => self
                .store
                .find_all(&owner)?
                .into_iter()
                .map(|record| {
                    let value = decode_record(&record);
                    (record.key, value)
                })
                .collect(),
            None => HashMap::new(),
        };

        let mut cache = self.cache.borrow_mut();
        debug!("Preloaded {} stored value(s) of {}", snapshot.len(), self.owner_type);
        cache.absorb_snapshot(snapshot);
        Ok(cache.entries().clone())
    }

    /// Delete values from the store immediately and drop them from the cache.
    /// Absent keys are ignored.
    pub fn remove(&self, keys: impl Into<KeySelector>) -> MetaResult<bool> {
        let keys = keys.into().into_keys();
        if let Some(owner) = self.owner() {
            let removed = self.store.delete_by_keys(&owner, &keys)?;
            debug!("Removed {} of {} requested key(s) of {}", removed, keys.len(), owner);
        }
        self.cache.borrow_mut().remove(&keys);
        Ok(true)
    }

    /// Whether every key has a stored record. Always asks the store.
    pub fn exists(&self, keys: impl Into<KeySelector>) -> MetaResult<bool> {
        Ok(self.missing(keys)?.is_empty())
    }

    /// Keys without a stored record, in input order. Always asks the store.
    pub fn missing(&self, keys: impl Into<KeySelector>) -> MetaResult<Vec<String>> {
        let keys = keys.into().into_keys();
        let found = match self.owner() {
            Some(owner) => self.store.existing_keys(&owner, &keys)?,
            None => BTreeSet::new(),
        };
        Ok(keys.into_iter().filter(|key| !found.contains(key)).collect())
    }

    /// Number of stored records of the owner
    pub fn count(&self) -> MetaResult<u64> {
        match self.owner() {
            Some(owner) => Ok(self.store.count(&owner)?),
            None => Ok(0),
        }
    }

    /// Cached value for `key`, without consulting the store
    #[must_use]
    pub fn cached(&self, key: &str) -> Option<MetaValue> {
        self.cache.borrow().get(key).cloned()
    }

    #[must_use]
    pub fn is_all_loaded(&self) -> bool {
        self.cache.borrow().is_all_loaded()
    }

    /// Forget cached values so the next read goes back to the store.
    /// Staged values that were never committed are lost.
    pub fn refresh(&self) {
        self.cache.borrow_mut().clear();
    }

    fn preload_if_configured(&self) -> MetaResult<()> {
        if self.preload_on_get {
            self.all()?;
        }
        Ok(())
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metadata")
            .field("owner_type", &self.owner_type)
            .field("owner_id", &self.owner_id.get())
            .field("preload_on_get", &self.preload_on_get)
            .field("cache", &self.cache.borrow())
            .finish_non_exhaustive()
    }
}

fn decode_record(record: &MetadataRecord) -> MetaValue {
    codec::decode(record.value.as_deref(), &record.value_type)
}
