//! The store facade behind which all capability state lives.
//!
//! The queue, result store and nullifier index are process-wide mutable
//! state. Implementations serialize all mutations on the block-application
//! path behind this trait; only one writer exists per height, and readers
//! observe consistent snapshots at block boundaries. Failures that are part
//! of the protocol (duplicate, reuse) are returned as values, never as
//! errors; `StorageError` is reserved for backend corruption, which is fatal
//! to the node and not a consensus outcome.

use opal_types::error::StorageError;
use opal_types::{Height, JobRequest, Nullifier, ResultRecord, TaskId};

/// Outcome of a write-once insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The value was inserted.
    Inserted,
    /// A value for the same key already existed; nothing was written.
    Exists,
}

/// Outcome of a nullifier admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The nullifier was not present inside the sliding window.
    Fresh,
    /// The nullifier was already observed inside the window.
    Reused,
}

/// Durable, deterministic storage keyed by task id.
///
/// Implementations stage mutations for the current block and commit them
/// atomically at block end; a crash mid-block must leave the store in the
/// pre-block state.
pub trait CapabilityState {
    /// Inserts an enqueued job. Write-once per task id.
    fn put_job(&mut self, req: &JobRequest) -> Result<PutOutcome, StorageError>;

    /// Fetches an enqueued job.
    fn job(&self, task_id: &TaskId) -> Result<Option<JobRequest>, StorageError>;

    /// Number of jobs currently held (resolved or not), for the queue-depth
    /// cap.
    fn job_count(&self) -> Result<u64, StorageError>;

    /// Inserts a finalized result record. Write-once per task id.
    fn put_result(&mut self, record: &ResultRecord) -> Result<PutOutcome, StorageError>;

    /// Fetches a finalized result record.
    fn result(&self, task_id: &TaskId) -> Result<Option<ResultRecord>, StorageError>;

    /// Whether a nullifier has been observed inside the sliding window.
    fn nullifier_seen(&self, nullifier: &Nullifier) -> Result<bool, StorageError>;

    /// Records a nullifier at the given height.
    fn insert_nullifier(
        &mut self,
        nullifier: &Nullifier,
        height: Height,
    ) -> Result<(), StorageError>;

    /// One-shot admission check: rejects a nullifier observed inside the
    /// window, records it otherwise.
    fn check_and_insert_nullifier(
        &mut self,
        nullifier: &Nullifier,
        height: Height,
    ) -> Result<Freshness, StorageError> {
        if self.nullifier_seen(nullifier)? {
            return Ok(Freshness::Reused);
        }
        self.insert_nullifier(nullifier, height)?;
        Ok(Freshness::Fresh)
    }

    /// Task ids of jobs whose TTL has elapsed without a result record, in
    /// ascending `(height_enqueued, task_id)` order. The ordering is part of
    /// the consensus contract: the TTL sweep writes records in this order.
    fn expired_jobs(
        &self,
        current_height: Height,
        ttl_blocks: u64,
    ) -> Result<Vec<TaskId>, StorageError>;

    /// Removes jobs and their result records enqueued strictly below
    /// `before_height` once a terminal record exists, and nullifiers
    /// recorded strictly below `null_floor`. Returns the number of jobs
    /// removed.
    fn prune(&mut self, before_height: Height, null_floor: Height) -> Result<u64, StorageError>;
}
