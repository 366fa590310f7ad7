#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Opal Capability Types
//!
//! This crate is the foundational library for the Opal capability kernel,
//! containing all consensus-critical data structures, the canonical codec,
//! error types and configuration objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `opal-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. This structure prevents
//! circular dependencies and provides a stable, canonical definition for
//! shared types like `JobRequest`, `ResultRecord`, `EvidenceEnvelope` and the
//! capability error taxonomy.

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::CapError> = std::result::Result<T, E>;

/// The canonical, deterministic CBOR codec for consensus-critical state.
pub mod codec;
/// Shared configuration structures for the capability kernel.
pub mod config;
/// The capability error taxonomy and storage-layer errors.
pub mod error;
/// Data structures for evidence envelopes consumed from blocks.
pub mod evidence;
/// Data structures for enqueued jobs and finalized results.
pub mod job;
/// Constants for well-known state keys used by the persistent stores.
pub mod keys;

pub use evidence::{EnqueueOpts, EnvelopeBody, EvidenceEnvelope, ProofKind};
pub use job::{
    Address, ChainId, Commitment, Height, JobKind, JobReceipt, JobRequest, Nullifier,
    ProofMetrics, ResultRecord, ResultStatus, TaskId, TxHash,
};
