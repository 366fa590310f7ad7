//! Consensus-level data structures for enqueued jobs and finalized results.
//!
//! Every structure in this module is persisted and/or hashed, so all of them
//! encode through the canonical CBOR codec in [`crate::codec`]. Field indices
//! are part of the consensus wire format and must never be reordered.

use minicbor::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A fixed-size, 32-byte deterministic identifier of an enqueued job.
pub type TaskId = [u8; 32];
/// A fixed-size, 32-byte replay-protection tag derived from an envelope body.
pub type Nullifier = [u8; 32];
/// A fixed-size, 32-byte data-availability commitment (namespaced Merkle root).
pub type Commitment = [u8; 32];
/// A fixed-size, 32-byte hash of a transaction.
pub type TxHash = [u8; 32];
/// A fixed-size, 32-byte on-chain address.
pub type Address = [u8; 32];
/// The unique identifier of the chain, used for replay protection.
pub type ChainId = u64;
/// A block height.
pub type Height = u64;

/// The number of buckets in the fixed QoS / latency metric domains.
pub const METRIC_BUCKETS: u8 = 16;

/// The class of off-chain compute a job requests.
///
/// The discriminants are consensus-visible; adding a kind is a registry
/// change that must be coordinated across all nodes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Encode, Decode, Serialize, Deserialize,
)]
#[cbor(index_only)]
pub enum JobKind {
    /// An AI inference job.
    #[n(0)]
    Ai,
    /// A quantum circuit execution job.
    #[n(1)]
    Quantum,
}

/// The terminal status of a finalized job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Encode, Decode, Serialize, Deserialize,
)]
#[cbor(index_only)]
pub enum ResultStatus {
    /// Evidence was accepted by the verifier.
    #[n(0)]
    Ok,
    /// Evidence arrived but failed verification.
    #[n(1)]
    Err,
    /// No evidence arrived within the TTL window; the job was sealed.
    #[n(2)]
    Ttl,
}

/// The immutable, on-chain record of an enqueued compute job.
///
/// Created by the syscall provider on successful enqueue at block N and
/// never mutated afterwards; garbage collection removes it together with its
/// result record once the retention window has passed.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[cbor(map)]
pub struct JobRequest {
    /// The deterministic task identifier.
    #[n(0)]
    #[cbor(with = "minicbor::bytes")]
    pub task_id: TaskId,
    /// The class of compute requested.
    #[n(1)]
    pub kind: JobKind,
    /// The address of the contract caller that enqueued the job.
    #[n(2)]
    #[cbor(with = "minicbor::bytes")]
    pub caller: Address,
    /// The height of the block in which the job was enqueued.
    #[n(3)]
    pub height_enqueued: Height,
    /// Digest of the normalized enqueue payload.
    #[n(4)]
    #[cbor(with = "minicbor::bytes")]
    pub payload_digest: [u8; 32],
    /// Compute units reserved against the caller's treasury balance.
    #[n(5)]
    pub reserved_units: u64,
    /// Digest of the canonical opts CBOR (all zero when opts were absent).
    #[n(6)]
    #[cbor(with = "minicbor::bytes")]
    pub opts_digest: [u8; 32],
    /// Total size in bytes of the raw enqueue inputs.
    #[n(7)]
    pub input_size: u64,
}

/// The syscall return value for a successful enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[cbor(map)]
pub struct JobReceipt {
    /// The deterministic task identifier to poll with `read_result`.
    #[n(0)]
    #[cbor(with = "minicbor::bytes")]
    pub task_id: TaskId,
    /// The class of compute requested.
    #[n(1)]
    pub kind: JobKind,
    /// Digest of the normalized enqueue payload.
    #[n(2)]
    #[cbor(with = "minicbor::bytes")]
    pub payload_digest: [u8; 32],
    /// Compute units reserved against the caller's treasury balance.
    #[n(3)]
    pub reserved_units: u64,
}

/// Bucketized, fixed-cardinality summary of an evidence submission.
///
/// Raw QoS and latency figures are never persisted; the resolver maps them
/// into [`METRIC_BUCKETS`] buckets so that every node derives the same small
/// finite value regardless of measurement jitter on the compute fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize, Default)]
#[cbor(map)]
pub struct ProofMetrics {
    /// Compute units consumed, as attested by the verifier.
    #[n(0)]
    pub units: u64,
    /// QoS score bucket in `0..METRIC_BUCKETS`.
    #[n(1)]
    pub qos_bucket: u8,
    /// Latency bucket in `0..METRIC_BUCKETS`.
    #[n(2)]
    pub latency_bucket: u8,
}

/// The normalized, consensus-level outcome of a job, keyed by task id.
///
/// Written exactly once by the resolver during block application; reads
/// through the syscall boundary serve the canonical encoding of this record.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[cbor(map)]
pub struct ResultRecord {
    /// The task this record finalizes.
    #[n(0)]
    #[cbor(with = "minicbor::bytes")]
    pub task_id: TaskId,
    /// Terminal status of the job.
    #[n(1)]
    pub status: ResultStatus,
    /// Output bytes, bounded by the per-kind output cap. Empty for
    /// `Err` and `Ttl` records.
    #[n(2)]
    #[cbor(with = "minicbor::bytes")]
    pub output: Vec<u8>,
    /// Bucketized metrics of the accepted evidence (zero for `Ttl`).
    #[n(3)]
    pub metrics: ProofMetrics,
    /// Opaque pointer to the accepted evidence (digest of the envelope).
    #[n(4)]
    #[cbor(with = "minicbor::bytes")]
    pub proof_ref: [u8; 32],
    /// The height at which the resolver finalized this record.
    #[n(5)]
    pub finalized_at_height: Height,
    /// The nullifier of the accepted envelope (all zero for `Ttl`).
    #[n(6)]
    #[cbor(with = "minicbor::bytes")]
    pub nullifier: Nullifier,
}

impl ResultRecord {
    /// Builds the synthetic record written by the TTL sweep for a job whose
    /// evidence never arrived.
    pub fn sealed_by_ttl(task_id: TaskId, finalized_at_height: Height) -> Self {
        Self {
            task_id,
            status: ResultStatus::Ttl,
            output: Vec::new(),
            metrics: ProofMetrics::default(),
            proof_ref: [0u8; 32],
            finalized_at_height,
            nullifier: [0u8; 32],
        }
    }
}

/// Renders a 32-byte identifier as lowercase hex for logs and errors.
pub fn display_id(id: &[u8; 32]) -> String {
    hex::encode(id)
}
