//! Core error types for the Opal capability kernel.
//!
//! Syscall-visible failures are ordinary values of [`CapError`] with stable
//! numeric codes; they are returned to the VM through its typed error channel
//! and never abort block application. [`StorageError`] is the node-fatal
//! class: corruption of the backing store is an operational failure, not a
//! consensus outcome, and must never leak through the syscall boundary.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable code to an error.
pub trait ErrorCode {
    /// Returns the stable numeric identifier for this error variant.
    fn code(&self) -> u16;
    /// Returns the stable human-readable name for this error variant.
    fn name(&self) -> &'static str;
}

/// Errors surfaced to contracts through the syscall boundary.
///
/// Messages are short static ASCII by construction: identical error surfaces
/// on every node are part of the consensus contract, so no variable
/// node-local data (paths, timestamps) may appear here.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapError {
    /// Input size, queue depth, or gas budget exceeded.
    #[error("limit exceeded")]
    LimitExceeded,
    /// Non-canonical encoding on an input.
    #[error("not deterministic")]
    NotDeterministic,
    /// `read_result` before the resolver finalized a record.
    #[error("no result yet")]
    NoResultYet,
    /// Evidence failed the registered verifier.
    #[error("attestation error")]
    AttestationError,
    /// Treasury reserve or debit failed.
    #[error("treasury insufficient")]
    TreasuryInsufficient,
    /// Feature flag off, or model/circuit not in the allowlist.
    #[error("unsupported")]
    Unsupported,
    /// Generic fallback for capability failures with no dedicated code.
    #[error("capability error")]
    Other,
}

impl ErrorCode for CapError {
    fn code(&self) -> u16 {
        match self {
            Self::LimitExceeded => 1001,
            Self::NotDeterministic => 1002,
            Self::NoResultYet => 1003,
            Self::AttestationError => 1004,
            Self::TreasuryInsufficient => 1005,
            Self::Unsupported => 1006,
            Self::Other => 1099,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::LimitExceeded => "LimitExceeded",
            Self::NotDeterministic => "NotDeterministic",
            Self::NoResultYet => "NoResultYet",
            Self::AttestationError => "AttestationError",
            Self::TreasuryInsufficient => "TreasuryInsufficient",
            Self::Unsupported => "Unsupported",
            Self::Other => "CapError",
        }
    }
}

/// Errors raised by the persistent store backends.
///
/// These are fatal to the node process (it must halt and re-sync); they are
/// never converted into a [`CapError`] and never observed by contracts.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StorageError {
    /// An error occurred in the storage backend.
    #[error("storage backend error: {0}")]
    Backend(String),
    /// A persisted value carried an unexpected schema version prefix.
    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaVersion {
        /// The schema version this build understands.
        expected: u8,
        /// The version byte found on disk.
        got: u8,
    },
    /// A persisted value failed canonical decoding.
    #[error("corrupt value encoding")]
    Corrupt,
}

impl ErrorCode for StorageError {
    fn code(&self) -> u16 {
        match self {
            Self::Backend(_) => 2001,
            Self::SchemaVersion { .. } => 2002,
            Self::Corrupt => 2003,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Backend(_) => "StorageBackend",
            Self::SchemaVersion { .. } => "StorageSchemaVersion",
            Self::Corrupt => "StorageCorrupt",
        }
    }
}
