//! Redb table definitions for persistent metadata storage.

use redb::TableDefinition;

// Key: (owner_type, owner_id, key), Value: bincode-encoded StoredRecord.
// The composite key makes (owner, key) unique by construction.
pub const MODEL_META: TableDefinition<(&str, i64, &str), &[u8]> =
    TableDefinition::new("model_meta");

// Key: sequence name, Value: last assigned surrogate id
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub const MODEL_META_SEQUENCE: &str = "model_meta";
