//! The `redb`-backed persistent capability store.
//!
//! A single table holds all four keyspaces with prefix-encoded keys (see
//! `opal_types::keys`). Mutations never touch the database directly: a
//! [`BlockBatch`] stages them in memory for the duration of one block and
//! applies everything in a single write transaction at commit. A crash
//! mid-block therefore leaves the store in the pre-block state, and a batch
//! that is dropped without commit has no effect.

use opal_api::state::{CapabilityState, PutOutcome};
use opal_types::error::StorageError;
use opal_types::{codec, keys, Height, JobRequest, Nullifier, ResultRecord, TaskId};
use redb::{Database, ReadableTable, TableDefinition};
use std::collections::BTreeMap;
use std::path::Path;

/// ---- Table definition (single table, prefix-encoded keys) ----
const STATE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("capability");

fn backend(e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// The smallest key strictly greater than every key carrying `prefix`.
/// All keyspace prefixes end in `':'`, so the increment never overflows.
fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    if let Some(last) = end.last_mut() {
        *last += 1;
    }
    end
}

fn parse_height(bytes: &[u8]) -> Result<Height, StorageError> {
    let arr: [u8; 8] = bytes.try_into().map_err(|_| StorageError::Corrupt)?;
    Ok(Height::from_be_bytes(arr))
}

fn task_id_from_index_key(key: &[u8]) -> Result<TaskId, StorageError> {
    let tail = key
        .get(keys::HEIGHT_INDEX_PREFIX.len() + 8..)
        .ok_or(StorageError::Corrupt)?;
    tail.try_into().map_err(|_| StorageError::Corrupt)
}

/// A persistent capability store backed by a single `redb` database.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Opens (or creates) the store at `path` and ensures the table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::create(path).map_err(backend)?;
        {
            let w = db.begin_write().map_err(backend)?;
            w.open_table(STATE).map_err(backend)?;
            w.commit().map_err(backend)?;
        }
        Ok(Self { db })
    }

    /// Starts a block-scoped batch. All reads see the committed state plus
    /// this batch's own staged writes; nothing reaches disk until
    /// [`BlockBatch::commit`].
    pub fn begin_block(&self) -> BlockBatch<'_> {
        BlockBatch {
            store: self,
            staged: BTreeMap::new(),
            job_delta: 0,
        }
    }

    fn get_committed(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let read = self.db.begin_read().map_err(backend)?;
        let table = read.open_table(STATE).map_err(backend)?;
        let value = table.get(key).map_err(backend)?.map(|g| g.value().to_vec());
        Ok(value)
    }

    fn scan_committed(
        &self,
        lo: &[u8],
        hi: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let read = self.db.begin_read().map_err(backend)?;
        let table = read.open_table(STATE).map_err(backend)?;
        let mut out = Vec::new();
        for entry in table.range(lo..hi).map_err(backend)? {
            let (k, v) = entry.map_err(backend)?;
            out.push((k.value().to_vec(), v.value().to_vec()));
        }
        Ok(out)
    }
}

/// Staged mutations for one block: `Some` is an insert, `None` a delete.
pub struct BlockBatch<'a> {
    store: &'a RedbStore,
    staged: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    job_delta: i64,
}

impl BlockBatch<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(staged) = self.staged.get(key) {
            return Ok(staged.clone());
        }
        self.store.get_committed(key)
    }

    /// Committed entries in `[lo, hi)` merged with this batch's staged
    /// writes, in ascending key order.
    fn scan(&self, lo: &[u8], hi: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .store
            .scan_committed(lo, hi)?
            .into_iter()
            .collect();
        for (key, staged) in self.staged.range(lo.to_vec()..hi.to_vec()) {
            match staged {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    /// Applies every staged mutation in a single write transaction.
    pub fn commit(self) -> Result<(), StorageError> {
        let writes = self.staged.len();
        let w = self.store.db.begin_write().map_err(backend)?;
        {
            let mut table = w.open_table(STATE).map_err(backend)?;
            for (key, staged) in &self.staged {
                match staged {
                    Some(value) => {
                        table
                            .insert(key.as_slice(), value.as_slice())
                            .map_err(backend)?;
                    }
                    None => {
                        table.remove(key.as_slice()).map_err(backend)?;
                    }
                }
            }
        }
        w.commit().map_err(backend)?;
        tracing::debug!(target: "storage", writes, "block batch committed");
        Ok(())
    }
}

impl CapabilityState for BlockBatch<'_> {
    fn put_job(&mut self, req: &JobRequest) -> Result<PutOutcome, StorageError> {
        let key = keys::job_key(&req.task_id);
        if self.get(&key)?.is_some() {
            return Ok(PutOutcome::Exists);
        }
        let body = codec::to_bytes_canonical(req).map_err(|_| StorageError::Corrupt)?;
        self.staged.insert(key, Some(keys::versioned_value(&body)));
        self.staged.insert(
            keys::height_index_key(req.height_enqueued, &req.task_id),
            Some(Vec::new()),
        );
        self.job_delta += 1;
        Ok(PutOutcome::Inserted)
    }

    fn job(&self, task_id: &TaskId) -> Result<Option<JobRequest>, StorageError> {
        match self.get(&keys::job_key(task_id))? {
            Some(raw) => {
                let body = keys::unversioned_value(&raw)?;
                codec::from_bytes_canonical(body)
                    .map(Some)
                    .map_err(|_| StorageError::Corrupt)
            }
            None => Ok(None),
        }
    }

    fn job_count(&self) -> Result<u64, StorageError> {
        let committed = self
            .store
            .scan_committed(keys::JOB_KEY_PREFIX, &prefix_end(keys::JOB_KEY_PREFIX))?
            .len() as i64;
        let total = committed + self.job_delta;
        Ok(total.max(0) as u64)
    }

    fn put_result(&mut self, record: &ResultRecord) -> Result<PutOutcome, StorageError> {
        let key = keys::result_key(&record.task_id);
        if self.get(&key)?.is_some() {
            return Ok(PutOutcome::Exists);
        }
        let body = codec::to_bytes_canonical(record).map_err(|_| StorageError::Corrupt)?;
        self.staged.insert(key, Some(keys::versioned_value(&body)));
        Ok(PutOutcome::Inserted)
    }

    fn result(&self, task_id: &TaskId) -> Result<Option<ResultRecord>, StorageError> {
        match self.get(&keys::result_key(task_id))? {
            Some(raw) => {
                let body = keys::unversioned_value(&raw)?;
                codec::from_bytes_canonical(body)
                    .map(Some)
                    .map_err(|_| StorageError::Corrupt)
            }
            None => Ok(None),
        }
    }

    fn nullifier_seen(&self, nullifier: &Nullifier) -> Result<bool, StorageError> {
        Ok(self.get(&keys::nullifier_key(nullifier))?.is_some())
    }

    fn insert_nullifier(
        &mut self,
        nullifier: &Nullifier,
        height: Height,
    ) -> Result<(), StorageError> {
        self.staged.insert(
            keys::nullifier_key(nullifier),
            Some(height.to_be_bytes().to_vec()),
        );
        Ok(())
    }

    fn expired_jobs(
        &self,
        current_height: Height,
        ttl_blocks: u64,
    ) -> Result<Vec<TaskId>, StorageError> {
        let cutoff = current_height.saturating_sub(ttl_blocks);
        let lo = keys::height_index_key(0, &[0u8; 32]);
        let hi = keys::height_index_key(cutoff, &[0u8; 32]);
        let mut expired = Vec::new();
        for (key, _) in self.scan(&lo, &hi)? {
            let task_id = task_id_from_index_key(&key)?;
            if self.get(&keys::result_key(&task_id))?.is_none() {
                expired.push(task_id);
            }
        }
        Ok(expired)
    }

    fn prune(&mut self, before_height: Height, null_floor: Height) -> Result<u64, StorageError> {
        let lo = keys::height_index_key(0, &[0u8; 32]);
        let hi = keys::height_index_key(before_height, &[0u8; 32]);
        let mut removed = 0u64;
        for (key, _) in self.scan(&lo, &hi)? {
            let task_id = task_id_from_index_key(&key)?;
            if self.get(&keys::result_key(&task_id))?.is_none() {
                continue;
            }
            self.staged.insert(keys::job_key(&task_id), None);
            self.staged.insert(keys::result_key(&task_id), None);
            self.staged.insert(key, None);
            self.job_delta -= 1;
            removed += 1;
        }
        let null_lo = keys::NULLIFIER_KEY_PREFIX.to_vec();
        let null_hi = prefix_end(keys::NULLIFIER_KEY_PREFIX);
        for (key, value) in self.scan(&null_lo, &null_hi)? {
            if parse_height(&value)? < null_floor {
                self.staged.insert(key, None);
            }
        }
        Ok(removed)
    }
}
