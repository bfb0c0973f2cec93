//! Transactional batch upsert of key/value pairs for one owner.
//!
//! All pairs go through a single store transaction. The first pair that fails
//! to encode or upsert aborts the batch: the transaction is rolled back and
//! nothing from it becomes visible.

use crate::codec::{self, MetaValue};
use crate::error::MetaResult;
use modelmeta_common::OwnerRef;
use modelmeta_store::{RecordStore, RecordTxn};
use tracing::{debug, error};

/// Write `values` for `owner` atomically. Returns false (after rolling back)
/// if any pair could not be written.
#[must_use]
pub fn commit<'a>(
    store: &dyn RecordStore,
    owner: &OwnerRef,
    values: impl IntoIterator<Item = (&'a String, &'a MetaValue)>,
) -> bool {
    let mut values = values.into_iter().peekable();
    if values.peek().is_none() {
        return true;
    }

    let mut txn = match store.begin() {
        Ok(txn) => txn,
        Err(e) => {
            error!("Failed to open metadata transaction for {}: {}", owner, e);
            return false;
        }
    };

    let mut written = 0usize;
    for (key, value) in values {
        if let Err(e) = write_pair(txn.as_mut(), owner, key, value) {
            error!("Failed to commit metadata '{}' of {}: {}", key, owner, e);
            if let Err(e) = txn.rollback() {
                error!("Failed to roll back metadata batch of {}: {}", owner, e);
            }
            return false;
        }
        written += 1;
    }

    match txn.commit() {
        Ok(()) => {
            debug!("Committed {} metadata value(s) of {}", written, owner);
            true
        }
        Err(e) => {
            error!("Failed to commit metadata batch of {}: {}", owner, e);
            false
        }
    }
}

fn write_pair(
    txn: &mut dyn RecordTxn,
    owner: &OwnerRef,
    key: &str,
    value: &MetaValue,
) -> MetaResult<()> {
    let encoded = codec::encode(value)?;
    txn.upsert(owner, key, encoded.value.as_deref(), encoded.value_type)?;
    Ok(())
}
