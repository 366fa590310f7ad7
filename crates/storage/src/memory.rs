//! An in-memory store backend over ordered maps.
//!
//! Used by tests and simulation harnesses. Values are held as their
//! canonical encodings (with the schema version prefix) rather than as
//! decoded structs, so the memory backend exercises exactly the same
//! serialization surface as the persistent one.

use opal_api::state::{CapabilityState, PutOutcome};
use opal_types::error::StorageError;
use opal_types::{codec, keys, Height, JobRequest, Nullifier, ResultRecord, TaskId};
use std::collections::{BTreeMap, BTreeSet};

/// A purely in-memory capability store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    jobs: BTreeMap<TaskId, Vec<u8>>,
    results: BTreeMap<TaskId, Vec<u8>>,
    by_height: BTreeSet<(Height, TaskId)>,
    nulls: BTreeMap<Nullifier, Height>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn decode_job(raw: &[u8]) -> Result<JobRequest, StorageError> {
        let body = keys::unversioned_value(raw)?;
        codec::from_bytes_canonical(body).map_err(|_| StorageError::Corrupt)
    }

    fn decode_result(raw: &[u8]) -> Result<ResultRecord, StorageError> {
        let body = keys::unversioned_value(raw)?;
        codec::from_bytes_canonical(body).map_err(|_| StorageError::Corrupt)
    }
}

impl CapabilityState for MemoryStore {
    fn put_job(&mut self, req: &JobRequest) -> Result<PutOutcome, StorageError> {
        if self.jobs.contains_key(&req.task_id) {
            return Ok(PutOutcome::Exists);
        }
        let body = codec::to_bytes_canonical(req).map_err(|_| StorageError::Corrupt)?;
        self.jobs.insert(req.task_id, keys::versioned_value(&body));
        self.by_height.insert((req.height_enqueued, req.task_id));
        Ok(PutOutcome::Inserted)
    }

    fn job(&self, task_id: &TaskId) -> Result<Option<JobRequest>, StorageError> {
        self.jobs.get(task_id).map(|raw| Self::decode_job(raw)).transpose()
    }

    fn job_count(&self) -> Result<u64, StorageError> {
        Ok(self.jobs.len() as u64)
    }

    fn put_result(&mut self, record: &ResultRecord) -> Result<PutOutcome, StorageError> {
        if self.results.contains_key(&record.task_id) {
            return Ok(PutOutcome::Exists);
        }
        let body = codec::to_bytes_canonical(record).map_err(|_| StorageError::Corrupt)?;
        self.results
            .insert(record.task_id, keys::versioned_value(&body));
        Ok(PutOutcome::Inserted)
    }

    fn result(&self, task_id: &TaskId) -> Result<Option<ResultRecord>, StorageError> {
        self.results
            .get(task_id)
            .map(|raw| Self::decode_result(raw))
            .transpose()
    }

    fn nullifier_seen(&self, nullifier: &Nullifier) -> Result<bool, StorageError> {
        Ok(self.nulls.contains_key(nullifier))
    }

    fn insert_nullifier(
        &mut self,
        nullifier: &Nullifier,
        height: Height,
    ) -> Result<(), StorageError> {
        self.nulls.insert(*nullifier, height);
        Ok(())
    }

    fn expired_jobs(
        &self,
        current_height: Height,
        ttl_blocks: u64,
    ) -> Result<Vec<TaskId>, StorageError> {
        let mut expired = Vec::new();
        for &(height, task_id) in &self.by_height {
            if height.saturating_add(ttl_blocks) >= current_height {
                break;
            }
            if !self.results.contains_key(&task_id) {
                expired.push(task_id);
            }
        }
        Ok(expired)
    }

    fn prune(&mut self, before_height: Height, null_floor: Height) -> Result<u64, StorageError> {
        let mut removed = 0u64;
        let doomed: Vec<(Height, TaskId)> = self
            .by_height
            .iter()
            .take_while(|(height, _)| *height < before_height)
            .filter(|(_, task_id)| self.results.contains_key(task_id))
            .copied()
            .collect();
        for (height, task_id) in doomed {
            self.jobs.remove(&task_id);
            self.results.remove(&task_id);
            self.by_height.remove(&(height, task_id));
            removed += 1;
        }
        self.nulls.retain(|_, height| *height >= null_floor);
        Ok(removed)
    }
}
