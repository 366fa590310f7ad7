//! Defines constants for the well-known keyspaces of the persistent stores.
//!
//! These constants provide a single source of truth for the keys used to
//! store capability data. Using these constants prevents typos and ensures
//! consistency across the store backends, which must produce identical
//! logical contents on every node.

use crate::job::{Height, Nullifier, TaskId};

/// The schema version carried as a single-byte prefix on every persisted
/// value. Bumping this is a node-local migration event.
pub const SCHEMA_VERSION: u8 = 1;

/// Keyspace prefix for enqueued jobs, keyed by task id.
pub const JOB_KEY_PREFIX: &[u8] = b"jobs::";
/// Keyspace prefix for finalized result records, keyed by task id.
pub const RESULT_KEY_PREFIX: &[u8] = b"results::";
/// Keyspace prefix for the height index, keyed by `(height, task_id)`.
pub const HEIGHT_INDEX_PREFIX: &[u8] = b"by_height::";
/// Keyspace prefix for observed nullifiers, keyed by nullifier; the stored
/// value is the big-endian height of first observation.
pub const NULLIFIER_KEY_PREFIX: &[u8] = b"nulls::";

/// Builds the store key for a job record.
pub fn job_key(task_id: &TaskId) -> Vec<u8> {
    [JOB_KEY_PREFIX, task_id.as_slice()].concat()
}

/// Builds the store key for a result record.
pub fn result_key(task_id: &TaskId) -> Vec<u8> {
    [RESULT_KEY_PREFIX, task_id.as_slice()].concat()
}

/// Builds the height-index key for a job. Heights are big-endian so that a
/// lexicographic scan walks the index in ascending height order.
pub fn height_index_key(height: Height, task_id: &TaskId) -> Vec<u8> {
    [
        HEIGHT_INDEX_PREFIX,
        height.to_be_bytes().as_slice(),
        task_id.as_slice(),
    ]
    .concat()
}

/// Builds the nullifier-window key for an observed nullifier.
pub fn nullifier_key(nullifier: &Nullifier) -> Vec<u8> {
    [NULLIFIER_KEY_PREFIX, nullifier.as_slice()].concat()
}

/// Prefixes a persisted value with the current schema version.
pub fn versioned_value(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(SCHEMA_VERSION);
    out.extend_from_slice(body);
    out
}

/// Strips and validates the schema version prefix of a persisted value.
pub fn unversioned_value(raw: &[u8]) -> Result<&[u8], crate::error::StorageError> {
    match raw.split_first() {
        Some((&version, body)) if version == SCHEMA_VERSION => Ok(body),
        Some((&version, _)) => Err(crate::error::StorageError::SchemaVersion {
            expected: SCHEMA_VERSION,
            got: version,
        }),
        None => Err(crate::error::StorageError::Corrupt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_index_keys_sort_by_height() {
        let id = [0u8; 32];
        let low = height_index_key(5, &id);
        let high = height_index_key(600, &id);
        assert!(low < high);
    }

    #[test]
    fn version_prefix_roundtrip() {
        let value = versioned_value(b"payload");
        assert_eq!(value[0], SCHEMA_VERSION);
        assert_eq!(unversioned_value(&value).unwrap(), b"payload");
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut value = versioned_value(b"payload");
        value[0] = SCHEMA_VERSION + 1;
        assert!(matches!(
            unversioned_value(&value),
            Err(crate::error::StorageError::SchemaVersion { .. })
        ));
        assert!(matches!(
            unversioned_value(&[]),
            Err(crate::error::StorageError::Corrupt)
        ));
    }
}
