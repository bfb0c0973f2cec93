//! ModelMeta Record Store - persistence gateway for metadata records
//!
//! This crate defines the store capability consumed by the metadata engine
//! and a single-table implementation backed by redb.

pub mod record;
pub mod store;
pub mod tables;
pub mod types;

// Re-exports
pub use record::{RecordStore, RecordTxn};
pub use store::{MetaStore, MetaStoreError, MetaStoreResult};
pub use types::{MetadataRecord, StoredRecord};
