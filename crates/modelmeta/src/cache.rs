//! Per-owner metadata cache
//!
//! Holds decoded values by key for one owner handle, plus a flag recording
//! that every stored record has been loaded. Entries set locally may not be
//! committed yet, so they always win over a freshly loaded snapshot.

use crate::codec::MetaValue;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, Default)]
pub struct OwnerCache {
    active_meta: HashMap<String, MetaValue>,
    all_loaded: bool,
}

impl OwnerCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.active_meta.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.active_meta.contains_key(key)
    }

    pub fn insert(&mut self, key: String, value: MetaValue) {
        self.active_meta.insert(key, value);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = (String, MetaValue)>) {
        self.active_meta.extend(entries);
    }

    pub fn remove(&mut self, keys: &[String]) {
        for key in keys {
            self.active_meta.remove(key);
        }
    }

    /// Split `keys` into (cached, uncached), each distinct, input order kept
    #[must_use]
    pub fn partition(&self, keys: &[String]) -> (Vec<String>, Vec<String>) {
        let mut seen = HashSet::new();
        keys.iter()
            .filter(|key| seen.insert(key.as_str()))
            .cloned()
            .partition(|key| self.active_meta.contains_key(key))
    }

    /// Merge a full snapshot from the store and mark the cache fully loaded.
    /// Existing entries take precedence over the snapshot.
    pub fn absorb_snapshot(&mut self, snapshot: HashMap<String, MetaValue>) {
        for (key, value) in snapshot {
            self.active_meta.entry(key).or_insert(value);
        }
        self.all_loaded = true;
    }

    #[must_use]
    pub const fn is_all_loaded(&self) -> bool {
        self.all_loaded
    }

    #[must_use]
    pub const fn entries(&self) -> &HashMap<String, MetaValue> {
        &self.active_meta
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active_meta.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active_meta.is_empty()
    }

    /// Drop every entry and the loaded flag
    pub fn clear(&mut self) {
        self.active_meta.clear();
        self.all_loaded = false;
    }
}
