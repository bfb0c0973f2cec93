//! Stored types for metadata persistence.
//!
//! A [`StoredRecord`] is what lives in the `model_meta` table value; the
//! owner and key are carried by the table key. [`MetadataRecord`] is the
//! joined row handed back to callers.

use modelmeta_common::{OwnerRef, ValueType};
use serde::{Deserialize, Serialize};

/// Row payload as persisted (bincode)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Surrogate id, assigned on first insert
    pub id: u64,
    /// Text encoding of the value, `None` for the `null` tag
    pub value: Option<String>,
    /// Value type tag; kept as text so unknown legacy tags survive
    pub value_type: String,
    /// Unix timestamp of creation
    pub created_at: u64,
    /// Unix timestamp of the last upsert
    pub updated_at: u64,
}

/// A metadata row: one key/value pair attached to one owner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataRecord {
    pub id: u64,
    pub owner: OwnerRef,
    pub key: String,
    pub value: Option<String>,
    pub value_type: String,
    pub created_at: u64,
    pub updated_at: u64,
}

impl MetadataRecord {
    pub(crate) fn from_stored(owner: OwnerRef, key: String, stored: StoredRecord) -> Self {
        Self {
            id: stored.id,
            owner,
            key,
            value: stored.value,
            value_type: stored.value_type,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }

    /// Parsed value type tag, `None` if the stored tag is not recognized
    #[must_use]
    pub fn value_type(&self) -> Option<ValueType> {
        ValueType::from_tag(&self.value_type)
    }
}

pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
