//! Deterministic derivation of task identifiers, nullifiers and payload
//! digests.
//!
//! Everything in this module is a pure function of consensus inputs: no I/O,
//! no mutable state. Domain separation is enforced through the tag registry
//! in [`domain`]; every derivation starts from a distinct tag byte, and any
//! change to a tag value is a consensus-breaking change that must be
//! coordinated like a hard fork.

use opal_types::{Address, ChainId, Height, JobKind, Nullifier, ProofKind, TaskId, TxHash};
use sha2::{Digest, Sha256};

/// The registry of domain-separation tags.
///
/// Tags are grouped by purpose; the byte values are part of the consensus
/// protocol and must stay disjoint.
pub mod domain {
    /// Task-id derivation for `ai_enqueue`.
    pub const ENQUEUE_AI: u8 = 0x01;
    /// Task-id derivation for `quantum_enqueue`.
    pub const ENQUEUE_QUANTUM: u8 = 0x02;

    /// Nullifier derivation for hash-share evidence.
    pub const NULL_HASH_SHARE: u8 = 0x10;
    /// Nullifier derivation for AI evidence.
    pub const NULL_AI: u8 = 0x11;
    /// Nullifier derivation for quantum evidence.
    pub const NULL_QUANTUM: u8 = 0x12;
    /// Nullifier derivation for storage evidence.
    pub const NULL_STORAGE: u8 = 0x13;
    /// Nullifier derivation for VDF evidence.
    pub const NULL_VDF: u8 = 0x14;
    /// Nullifier derivation for zero-knowledge evidence.
    pub const NULL_ZK: u8 = 0x15;

    /// Seed derivation for the `random` syscall.
    pub const RAND_SEED: u8 = 0x20;
    /// Stream-block derivation for the `random` syscall.
    pub const RAND_STREAM: u8 = 0x21;

    /// Payload normalization for AI enqueue inputs.
    pub const PAYLOAD_AI: u8 = 0x30;
    /// Payload normalization for quantum enqueue inputs.
    pub const PAYLOAD_QUANTUM: u8 = 0x31;

    /// Evidence-envelope digests stored as `proof_ref`.
    pub const PROOF_REF: u8 = 0x40;
}

/// The enqueue domain tag for a job kind.
pub fn enqueue_domain(kind: JobKind) -> u8 {
    match kind {
        JobKind::Ai => domain::ENQUEUE_AI,
        JobKind::Quantum => domain::ENQUEUE_QUANTUM,
    }
}

/// The nullifier domain tag for a proof kind.
pub fn null_domain(kind: ProofKind) -> u8 {
    match kind {
        ProofKind::HashShare => domain::NULL_HASH_SHARE,
        ProofKind::Ai => domain::NULL_AI,
        ProofKind::Quantum => domain::NULL_QUANTUM,
        ProofKind::Storage => domain::NULL_STORAGE,
        ProofKind::Vdf => domain::NULL_VDF,
        ProofKind::Zk => domain::NULL_ZK,
    }
}

/// Incremental transcript hasher: fixed-width integers are written
/// big-endian, variable-width byte strings are length-prefixed so that no
/// two distinct field sequences can collide.
pub struct DomainHasher(Sha256);

impl DomainHasher {
    /// Starts a transcript under the given domain tag.
    pub fn new(tag: u8) -> Self {
        let mut h = Sha256::new();
        h.update([tag]);
        Self(h)
    }

    /// Appends a `u16` field.
    pub fn u16(mut self, v: u16) -> Self {
        self.0.update(v.to_be_bytes());
        self
    }

    /// Appends a `u32` field.
    pub fn u32(mut self, v: u32) -> Self {
        self.0.update(v.to_be_bytes());
        self
    }

    /// Appends a `u64` field.
    pub fn u64(mut self, v: u64) -> Self {
        self.0.update(v.to_be_bytes());
        self
    }

    /// Appends a fixed-width 32-byte field.
    pub fn fixed32(mut self, v: &[u8; 32]) -> Self {
        self.0.update(v);
        self
    }

    /// Appends a variable-width field with a length prefix.
    pub fn var(mut self, v: &[u8]) -> Self {
        self.0.update((v.len() as u64).to_be_bytes());
        self.0.update(v);
        self
    }

    /// Finalizes the transcript.
    pub fn finalize(self) -> [u8; 32] {
        self.0.finalize().into()
    }
}

/// Derives the deterministic task identifier of an enqueue, unique per
/// `(chain, height, tx, caller, payload)` tuple.
pub fn derive_task_id(
    tag: u8,
    chain_id: ChainId,
    height: Height,
    tx_hash: &TxHash,
    caller: &Address,
    payload_digest: &[u8; 32],
) -> TaskId {
    DomainHasher::new(tag)
        .u64(chain_id)
        .u64(height)
        .fixed32(tx_hash)
        .fixed32(caller)
        .fixed32(payload_digest)
        .finalize()
}

/// Derives a replay-protection nullifier from a canonical body.
///
/// `height_hint` disambiguates derivations that are height-bound; envelope
/// nullifiers pass zero because the body alone identifies the evidence.
pub fn derive_nullifier(
    tag: u8,
    chain_id: ChainId,
    type_id: u16,
    height_hint: Height,
    canonical_body: &[u8],
) -> Nullifier {
    DomainHasher::new(tag)
        .u64(chain_id)
        .u16(type_id)
        .u64(height_hint)
        .var(canonical_body)
        .finalize()
}

/// Normalizes and digests the user-supplied AI enqueue payload.
pub fn ai_payload_digest(model: &[u8], prompt: &[u8], opts_canonical: &[u8]) -> [u8; 32] {
    DomainHasher::new(domain::PAYLOAD_AI)
        .var(model)
        .var(prompt)
        .var(opts_canonical)
        .finalize()
}

/// Normalizes and digests the user-supplied quantum enqueue payload.
pub fn quantum_payload_digest(circuit: &[u8], shots: u64, opts_canonical: &[u8]) -> [u8; 32] {
    DomainHasher::new(domain::PAYLOAD_QUANTUM)
        .var(circuit)
        .u64(shots)
        .var(opts_canonical)
        .finalize()
}

/// Digests a raw evidence envelope for use as `proof_ref`.
pub fn proof_ref(raw_envelope: &[u8]) -> [u8; 32] {
    DomainHasher::new(domain::PROOF_REF).var(raw_envelope).finalize()
}
