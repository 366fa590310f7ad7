//! Evidence envelopes and structured syscall inputs.
//!
//! An evidence envelope is the canonical record included in a block asserting
//! that off-chain work was done. The outer envelope is deliberately thin: a
//! type tag, an opaque body and the replay-protection nullifier. The body
//! decodes to [`EnvelopeBody`], whose `attestation` field carries the
//! per-kind payload handed opaquely to the registered verifier.

use crate::job::{Nullifier, TaskId};
use minicbor::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The closed set of proof kinds the resolver dispatches over.
///
/// Dispatch is a closed match, not open polymorphism: adding a kind is a
/// consensus-visible registry change. The `type_id` mapping is part of the
/// wire format.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Encode, Decode, Serialize, Deserialize,
)]
#[cbor(index_only)]
pub enum ProofKind {
    /// A storage hash-share proof.
    #[n(0)]
    HashShare,
    /// An attested AI inference result.
    #[n(1)]
    Ai,
    /// An attested quantum execution result.
    #[n(2)]
    Quantum,
    /// A storage availability proof.
    #[n(3)]
    Storage,
    /// A verifiable-delay-function proof.
    #[n(4)]
    Vdf,
    /// A zero-knowledge proof.
    #[n(5)]
    Zk,
}

impl ProofKind {
    /// All proof kinds in wire order.
    pub const ALL: [ProofKind; 6] = [
        ProofKind::HashShare,
        ProofKind::Ai,
        ProofKind::Quantum,
        ProofKind::Storage,
        ProofKind::Vdf,
        ProofKind::Zk,
    ];

    /// The stable wire identifier of this kind.
    pub fn type_id(self) -> u16 {
        match self {
            ProofKind::HashShare => 0,
            ProofKind::Ai => 1,
            ProofKind::Quantum => 2,
            ProofKind::Storage => 3,
            ProofKind::Vdf => 4,
            ProofKind::Zk => 5,
        }
    }

    /// Resolves a wire identifier back to a kind, if registered.
    pub fn from_type_id(id: u16) -> Option<Self> {
        match id {
            0 => Some(ProofKind::HashShare),
            1 => Some(ProofKind::Ai),
            2 => Some(ProofKind::Quantum),
            3 => Some(ProofKind::Storage),
            4 => Some(ProofKind::Vdf),
            5 => Some(ProofKind::Zk),
            _ => None,
        }
    }
}

/// The outer evidence record as it appears inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[cbor(map)]
pub struct EvidenceEnvelope {
    /// Wire identifier of the proof kind (see [`ProofKind::type_id`]).
    #[n(0)]
    pub type_id: u16,
    /// Canonical encoding of the [`EnvelopeBody`].
    #[n(1)]
    #[cbor(with = "minicbor::bytes")]
    pub body: Vec<u8>,
    /// Replay-protection tag; must match the nullifier recomputed from
    /// `type_id` and `body`.
    #[n(2)]
    #[cbor(with = "minicbor::bytes")]
    pub nullifier: Nullifier,
}

/// The common body header shared by all proof kinds.
///
/// `units`, `qos_ppm` and `latency_ms` are the raw figures attested by the
/// compute fabric; the resolver bucketizes them before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[cbor(map)]
pub struct EnvelopeBody {
    /// The queued job this evidence targets.
    #[n(0)]
    #[cbor(with = "minicbor::bytes")]
    pub task_id: TaskId,
    /// Job output bytes, bounded by the per-kind output cap.
    #[n(1)]
    #[cbor(with = "minicbor::bytes")]
    pub output: Vec<u8>,
    /// Compute units consumed.
    #[n(2)]
    pub units: u64,
    /// QoS score in parts per million (`0..=1_000_000`).
    #[n(3)]
    pub qos_ppm: u32,
    /// Observed latency in milliseconds.
    #[n(4)]
    pub latency_ms: u32,
    /// Per-kind attestation payload, handed opaquely to the verifier.
    #[n(5)]
    #[cbor(with = "minicbor::bytes")]
    pub attestation: Vec<u8>,
}

/// Structured options accepted by the enqueue syscalls, as canonical CBOR.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize, Default)]
#[cbor(map)]
pub struct EnqueueOpts {
    /// Upper bound on compute units the caller is willing to reserve.
    /// Falls back to the configured default when absent.
    #[n(0)]
    pub max_units: Option<u64>,
}
