//! Collaborator interfaces consumed by the capability core.
//!
//! Each trait is a deterministic, synchronous contract: given the same
//! inputs, every implementation must produce the same outputs on every node,
//! with no time or network nondeterminism inside the call. The core composes
//! these without knowing anything about their internals.

use opal_types::error::CapError;
use opal_types::{Address, ChainId, Commitment, EnvelopeBody, Height, JobRequest};

/// The data-availability pin interface.
///
/// `pin` must be consensus-safe: the commitment is the namespaced Merkle
/// root per the DA specification and is a pure function of `(ns, data)`. If
/// the underlying storage is asynchronous, the adapter serializes and blocks
/// until a deterministic commitment is produced, or fails deterministically.
pub trait BlobAdapter {
    /// Pins `data` under namespace `ns` and returns the commitment.
    fn pin(&self, ns: u32, data: &[u8]) -> Result<Commitment, CapError>;
}

/// Read-only context handed to an evidence verifier.
pub struct VerifyContext<'a> {
    /// The chain the evidence was included on.
    pub chain_id: ChainId,
    /// The height of the block being applied.
    pub height: Height,
    /// The queued job the evidence targets.
    pub job: &'a JobRequest,
}

/// The outcome of an evidence verification.
///
/// `units`, `qos_ppm` and `latency_ms` are the figures the verifier vouches
/// for; the resolver bucketizes them before anything is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierOutcome {
    /// Whether the evidence is valid.
    pub ok: bool,
    /// Compute units consumed, as attested.
    pub units: u64,
    /// QoS score in parts per million.
    pub qos_ppm: u32,
    /// Observed latency in milliseconds.
    pub latency_ms: u32,
}

/// A pure predicate over an evidence envelope body.
///
/// Verifiers perform no I/O and hold no mutable state; a rejected body
/// yields `ok = false`, never an error.
pub trait EvidenceVerifier {
    /// Verifies `body` against the queued job in `ctx`.
    fn verify(&self, body: &EnvelopeBody, ctx: &VerifyContext<'_>) -> VerifierOutcome;
}

/// The outcome of a zero-knowledge proof verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZkOutcome {
    /// Whether the proof verified.
    pub ok: bool,
    /// Verifier-reported work units, used for the success gas multiplier.
    pub units: u64,
}

/// A pure zero-knowledge verification predicate for the `zk_verify` syscall.
pub trait ZkVerifier {
    /// Verifies `proof` for `circuit` against `public_input`.
    fn verify(&self, circuit: &[u8], proof: &[u8], public_input: &[u8]) -> ZkOutcome;
}

/// The pre-debit hook into the treasury collaborator.
///
/// Both operations are deterministic and idempotent within a single syscall;
/// settlement itself is out of scope for the capability core.
pub trait Treasury {
    /// Reserves `units` against `caller`'s balance.
    fn reserve(&mut self, caller: &Address, units: u64) -> Result<(), CapError>;

    /// Debits `units` previously reserved for `caller`.
    fn debit(&mut self, caller: &Address, units: u64) -> Result<(), CapError>;
}
