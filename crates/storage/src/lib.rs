#![forbid(unsafe_code)]

//! # Opal Capability Storage
//!
//! Store backends for the capability kernel: an in-memory map for tests and
//! simulation, and a `redb`-backed persistent store with block-scoped
//! batches. Both implement the `CapabilityState` facade from `opal-api` and
//! produce identical logical contents for the same sequence of operations;
//! only the canonical value encodings are consensus-relevant, never the raw
//! backing file layout.

/// An in-memory store backend.
pub mod memory;
/// The `redb`-backed persistent store backend.
pub mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::{BlockBatch, RedbStore};
