//! Typed key/value metadata attached to persisted entities
//!
//! A [`Metadata`] handle is attached to one owner instance. Values are
//! encoded into a (text, type tag) pair and stored in one record per
//! (owner, key) through a [`RecordStore`]. Reads go through a per-handle
//! cache; writes are either committed immediately or staged until the owner
//! reports a successful save.

pub mod cache;
pub mod codec;
pub mod commit;
pub mod error;
pub mod keys;
pub mod metadata;
pub mod owner;

#[cfg(test)]
mod testing;

pub use cache::OwnerCache;
pub use codec::{Encoded, MetaValue, ObjectValue};
pub use error::{MetaError, MetaResult};
pub use keys::KeySelector;
pub use metadata::{MetaLookup, Metadata};
pub use owner::{MetadataOwner, SaveListener, SaveListeners};

pub use modelmeta_common::{MetaConfig, OwnerRef, OwnerTypeMap, StoreConfig, ValueType};
pub use modelmeta_store::{MetaStore, MetaStoreError, MetadataRecord, RecordStore, RecordTxn};
