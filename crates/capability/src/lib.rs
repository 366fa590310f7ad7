#![forbid(unsafe_code)]
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

//! # Opal Capability Core
//!
//! The deterministic capability layer of the node: identifier derivation,
//! the deterministic PRNG, the evidence resolver and the syscall provider.
//! Everything on these paths is a pure function of consensus inputs plus the
//! capability store; two honest nodes applying the same blocks derive
//! bit-identical records and syscall return values.

/// Block-lifecycle helpers for the executor.
pub mod block;
/// Gas accounting for syscalls.
pub mod gas;
/// Deterministic derivation of task ids, nullifiers and payload digests.
pub mod ident;
/// The syscall provider.
pub mod provider;
/// The deterministic byte stream behind the `random` syscall.
pub mod rand;
/// The evidence resolver.
pub mod resolver;

pub use gas::GasMeter;
pub use provider::{SyscallCall, SyscallContext, SyscallError, SyscallProvider, SyscallReturn};
pub use resolver::{Applied, BlockContext, DropReason, Resolver, VerifierRegistry};
