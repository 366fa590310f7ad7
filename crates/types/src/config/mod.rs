//! Configuration structures for the capability kernel.
//!
//! Every field here is consensus-visible: feature flags, size caps, timing
//! windows, gas prices and admission policy are all part of the state
//! transition function, and changes to any of them are governed externally.
//! The structures carry `serde` derives so node operators can load them from
//! genesis or governance payloads; the kernel itself only ever reads them.

use crate::evidence::ProofKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-syscall feature flags. Disabled features fail with `Unsupported`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Enables the `ai_enqueue` syscall.
    pub enable_ai: bool,
    /// Enables the `quantum_enqueue` syscall.
    pub enable_quantum: bool,
    /// Enables the `blob_pin` syscall.
    pub enable_blob: bool,
    /// Enables the `zk_verify` syscall.
    pub enable_zk: bool,
    /// Enables the `random` syscall.
    pub enable_random: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_ai: true,
            enable_quantum: true,
            enable_blob: true,
            enable_zk: true,
            enable_random: true,
        }
    }
}

/// Size caps for every inbound and outbound byte string.
///
/// Inputs are length-checked at syscall entry before any hashing or
/// normalization; oversize outputs from evidence are rejected by the
/// resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeLimits {
    /// Maximum blob size accepted by `blob_pin`.
    pub blob_pin_max: usize,
    /// Maximum model identifier size for `ai_enqueue`.
    pub ai_model_max: usize,
    /// Maximum prompt size for `ai_enqueue`.
    pub ai_prompt_max: usize,
    /// Maximum opts CBOR size for `ai_enqueue`.
    pub ai_opts_max: usize,
    /// Maximum circuit size for `quantum_enqueue`.
    pub q_circuit_max: usize,
    /// Maximum number of shots for `quantum_enqueue`.
    pub q_max_shots: u64,
    /// Maximum opts CBOR size for `quantum_enqueue`.
    pub q_opts_max: usize,
    /// Maximum circuit size for `zk_verify`.
    pub zk_circuit_max: usize,
    /// Maximum proof size for `zk_verify`.
    pub zk_proof_max: usize,
    /// Maximum public-input size for `zk_verify`.
    pub zk_input_max: usize,
    /// Maximum output size served by `read_result` (and accepted from
    /// evidence by the resolver).
    pub read_result_max: usize,
    /// Maximum byte count a single `random` call may request.
    pub rand_max_bytes: u32,
    /// Maximum number of unresolved jobs the queue will hold.
    pub max_queue_depth: u64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            blob_pin_max: 512 * 1024,
            ai_model_max: 128,
            ai_prompt_max: 64 * 1024,
            ai_opts_max: 4 * 1024,
            q_circuit_max: 256 * 1024,
            q_max_shots: 1 << 20,
            q_opts_max: 4 * 1024,
            zk_circuit_max: 512 * 1024,
            zk_proof_max: 256 * 1024,
            zk_input_max: 64 * 1024,
            read_result_max: 256 * 1024,
            rand_max_bytes: 64 * 1024,
            max_queue_depth: 65_536,
        }
    }
}

/// Height-denominated windows for result TTL, retention and replay
/// protection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingParams {
    /// Blocks after enqueue by which evidence must arrive, or the job is
    /// sealed as `Ttl`.
    pub result_ttl_blocks: u64,
    /// Blocks a terminal record (and its job) survives before pruning.
    pub retention_blocks: u64,
    /// Width of the sliding nullifier window.
    pub null_window_blocks: u64,
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            result_ttl_blocks: 50,
            retention_blocks: 10_000,
            null_window_blocks: 10_000,
        }
    }
}

/// Gas prices charged by the syscall provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasSchedule {
    /// Base cost of `blob_pin`.
    pub g_base_blob: u64,
    /// Per-byte cost of `blob_pin`.
    pub g_per_byte_blob: u64,
    /// Base cost of `ai_enqueue` / `quantum_enqueue`.
    pub g_base_enqueue: u64,
    /// Per-byte cost of enqueue inputs.
    pub g_per_byte_enqueue: u64,
    /// Base cost of `read_result`.
    pub g_base_read: u64,
    /// Base cost of `zk_verify`.
    pub g_base_zk: u64,
    /// Per-byte cost of `zk_verify` inputs.
    pub g_per_byte_zk: u64,
    /// Multiplier applied to verifier-reported units on successful
    /// `zk_verify`.
    pub g_zk_success_mult: u64,
    /// Base cost of `random`.
    pub g_base_rand: u64,
    /// Per-byte cost of `random` output.
    pub g_per_byte_rand: u64,
    /// Units reserved on enqueue when the caller's opts carry no bound.
    pub default_reserved_units: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            g_base_blob: 1_000,
            g_per_byte_blob: 2,
            g_base_enqueue: 5_000,
            g_per_byte_enqueue: 1,
            g_base_read: 500,
            g_base_zk: 10_000,
            g_per_byte_zk: 3,
            g_zk_success_mult: 2,
            g_base_rand: 200,
            g_per_byte_rand: 1,
            default_reserved_units: 1_000,
        }
    }
}

/// An inclusive range of permitted blob namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRange {
    /// First namespace in the range.
    pub start: u32,
    /// Last namespace in the range (inclusive).
    pub end: u32,
}

impl NamespaceRange {
    /// Whether `ns` falls inside this range.
    pub fn contains(&self, ns: u32) -> bool {
        self.start <= ns && ns <= self.end
    }
}

/// Admission policy for syscalls beyond raw size caps.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicyConfig {
    /// Namespaces `blob_pin` may target. Empty means no namespace is
    /// permitted.
    pub allowed_namespaces: Vec<NamespaceRange>,
    /// Digests of models `ai_enqueue` may reference. `None` leaves the
    /// model set unrestricted.
    pub model_allowlist: Option<BTreeSet<[u8; 32]>>,
    /// Digests of circuits `zk_verify` may reference. `None` leaves the
    /// circuit set unrestricted.
    pub circuit_allowlist: Option<BTreeSet<[u8; 32]>>,
    /// Proof kinds whose envelopes must carry a non-empty attestation
    /// payload to be considered by the resolver.
    pub attestation_required: BTreeSet<ProofKind>,
}

impl PolicyConfig {
    /// Whether `ns` is inside any permitted namespace range.
    pub fn namespace_allowed(&self, ns: u32) -> bool {
        self.allowed_namespaces.iter().any(|r| r.contains(ns))
    }
}

/// The complete configuration surface of the capability kernel.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CapabilityConfig {
    /// Per-syscall feature flags.
    pub features: FeatureFlags,
    /// Size caps.
    pub limits: SizeLimits,
    /// TTL, retention and nullifier windows.
    pub timing: TimingParams,
    /// Gas prices.
    pub gas: GasSchedule,
    /// Admission policy.
    pub policy: PolicyConfig,
}

impl CapabilityConfig {
    /// A configuration with every namespace range open, for tests and
    /// local development networks.
    pub fn permissive() -> Self {
        Self {
            policy: PolicyConfig {
                allowed_namespaces: vec![NamespaceRange {
                    start: 0,
                    end: u32::MAX,
                }],
                ..PolicyConfig::default()
            },
            ..Self::default()
        }
    }
}
