#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented
    )
)]

//! # Opal Capability API
//!
//! Core traits and interfaces for the capability kernel. This crate defines
//! the stable contract between the deterministic core and its collaborators:
//! the persistent store facade, the data-availability blob adapter, the
//! external proof verifiers and the treasury.
//!
//! Everything here is synchronous by design. The capability core runs inside
//! block execution, one transaction at a time, and admits no suspension
//! points on paths that affect state transitions; collaborators with an
//! asynchronous implementation must serialize behind these interfaces.

/// Collaborator interfaces consumed by the capability core.
pub mod adapters;
/// Deterministic mock collaborators for tests and local networks.
pub mod mock;
/// The store facade behind which all capability state lives.
pub mod state;

pub use adapters::{
    BlobAdapter, EvidenceVerifier, Treasury, VerifierOutcome, VerifyContext, ZkOutcome, ZkVerifier,
};
pub use state::{CapabilityState, Freshness, PutOutcome};
