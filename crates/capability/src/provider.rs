//! The syscall provider: the single entry point the VM invokes for every
//! capability call.
//!
//! Each operation follows the same discipline: feature flags first, then the
//! base gas charge, then length checks, then per-byte gas, then canonical
//! re-encoding of structured inputs, and only then any effect. A syscall
//! that fails leaves no state behind beyond the gas it consumed, so the VM
//! can surface the typed error to the contract without unwinding anything.

use crate::gas::GasMeter;
use crate::ident::{self, domain};
use crate::rand::{self, RandTranscript};
use opal_api::state::CapabilityState;
use opal_api::{BlobAdapter, Treasury, ZkVerifier};
use opal_types::config::CapabilityConfig;
use opal_types::error::{CapError, StorageError};
use opal_types::{
    codec, Address, ChainId, Commitment, EnqueueOpts, Height, JobKind, JobReceipt, JobRequest,
    TaskId, TxHash,
};
use sha2::{Digest, Sha256};

/// Consensus inputs identifying the executing call site.
#[derive(Debug, Clone)]
pub struct SyscallContext {
    /// The chain identifier.
    pub chain_id: ChainId,
    /// The height of the executing block.
    pub height: Height,
    /// The hash of the executing transaction.
    pub tx_hash: TxHash,
    /// The calling contract's address.
    pub caller: Address,
    /// The instruction index of this call within the transaction.
    pub call_index: u32,
    /// The prior-block beacon value, iff consensus flags one as present for
    /// this block.
    pub beacon: Option<[u8; 32]>,
}

/// A capability call as decoded from the VM boundary.
#[derive(Debug, Clone)]
pub enum SyscallCall {
    /// Pin a blob into the data-availability layer.
    BlobPin {
        /// Target namespace.
        ns: u32,
        /// Blob contents.
        data: Vec<u8>,
    },
    /// Enqueue an AI inference job.
    AiEnqueue {
        /// Model identifier bytes.
        model: Vec<u8>,
        /// Prompt bytes.
        prompt: Vec<u8>,
        /// Optional canonical opts CBOR.
        opts: Option<Vec<u8>>,
    },
    /// Enqueue a quantum circuit job.
    QuantumEnqueue {
        /// Circuit bytes.
        circuit: Vec<u8>,
        /// Number of shots.
        shots: u64,
        /// Optional canonical opts CBOR.
        opts: Option<Vec<u8>>,
    },
    /// Read a finalized result record.
    ReadResult {
        /// The task to read.
        task_id: TaskId,
    },
    /// Verify a zero-knowledge proof.
    ZkVerify {
        /// Circuit bytes.
        circuit: Vec<u8>,
        /// Proof bytes.
        proof: Vec<u8>,
        /// Public input bytes.
        public_input: Vec<u8>,
    },
    /// Draw deterministic randomness.
    Random {
        /// Number of bytes requested.
        n: u32,
    },
}

/// The value returned to the VM on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyscallReturn {
    /// `blob_pin`: the commitment and the pinned length.
    Pinned {
        /// Namespaced Merkle root of the pinned blob.
        commitment: Commitment,
        /// Length of the pinned blob in bytes.
        length: u64,
    },
    /// `ai_enqueue` / `quantum_enqueue`: the canonical receipt CBOR.
    Receipt(Vec<u8>),
    /// `read_result`: the canonical record CBOR.
    Record(Vec<u8>),
    /// `zk_verify`: verdict and verifier-reported units.
    ZkVerified {
        /// Whether the proof verified.
        ok: bool,
        /// Verifier-reported work units.
        units: u64,
    },
    /// `random`: the raw byte stream.
    Bytes(Vec<u8>),
}

/// A syscall failure.
///
/// `Cap` travels to the VM's typed error channel; `Fatal` is storage
/// corruption, which must halt the node instead of reaching the contract.
#[derive(Debug, PartialEq)]
pub enum SyscallError {
    /// A consensus-level failure with a stable code.
    Cap(CapError),
    /// A node-fatal storage failure.
    Fatal(StorageError),
}

impl SyscallError {
    /// The consensus-level error, if this is one.
    pub fn cap(&self) -> Option<CapError> {
        match self {
            SyscallError::Cap(e) => Some(*e),
            SyscallError::Fatal(_) => None,
        }
    }
}

impl From<CapError> for SyscallError {
    fn from(e: CapError) -> Self {
        SyscallError::Cap(e)
    }
}

impl From<StorageError> for SyscallError {
    fn from(e: StorageError) -> Self {
        SyscallError::Fatal(e)
    }
}

fn digest32(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// The syscall dispatcher for one transaction.
///
/// Holds mutable access to the block's store batch and the treasury; the VM
/// constructs one provider per transaction and routes every capability
/// opcode through [`SyscallProvider::dispatch`].
pub struct SyscallProvider<'a, S: CapabilityState> {
    store: &'a mut S,
    config: &'a CapabilityConfig,
    blob: &'a dyn BlobAdapter,
    zk: &'a dyn ZkVerifier,
    treasury: &'a mut dyn Treasury,
}

impl<'a, S: CapabilityState> SyscallProvider<'a, S> {
    /// Wires a provider over the block's store batch and collaborators.
    pub fn new(
        store: &'a mut S,
        config: &'a CapabilityConfig,
        blob: &'a dyn BlobAdapter,
        zk: &'a dyn ZkVerifier,
        treasury: &'a mut dyn Treasury,
    ) -> Self {
        Self {
            store,
            config,
            blob,
            zk,
            treasury,
        }
    }

    /// Routes one call to its operation.
    pub fn dispatch(
        &mut self,
        ctx: &SyscallContext,
        gas: &mut GasMeter,
        call: SyscallCall,
    ) -> Result<SyscallReturn, SyscallError> {
        match call {
            SyscallCall::BlobPin { ns, data } => {
                let (commitment, length) = self.blob_pin(ctx, gas, ns, &data)?;
                Ok(SyscallReturn::Pinned { commitment, length })
            }
            SyscallCall::AiEnqueue {
                model,
                prompt,
                opts,
            } => self
                .ai_enqueue(ctx, gas, &model, &prompt, opts.as_deref())
                .map(SyscallReturn::Receipt),
            SyscallCall::QuantumEnqueue {
                circuit,
                shots,
                opts,
            } => self
                .quantum_enqueue(ctx, gas, &circuit, shots, opts.as_deref())
                .map(SyscallReturn::Receipt),
            SyscallCall::ReadResult { task_id } => self
                .read_result(ctx, gas, &task_id)
                .map(SyscallReturn::Record),
            SyscallCall::ZkVerify {
                circuit,
                proof,
                public_input,
            } => {
                let (ok, units) = self.zk_verify(ctx, gas, &circuit, &proof, &public_input)?;
                Ok(SyscallReturn::ZkVerified { ok, units })
            }
            SyscallCall::Random { n } => self.random(ctx, gas, n).map(SyscallReturn::Bytes),
        }
    }

    /// Pins `data` under namespace `ns` through the DA adapter.
    pub fn blob_pin(
        &mut self,
        _ctx: &SyscallContext,
        gas: &mut GasMeter,
        ns: u32,
        data: &[u8],
    ) -> Result<(Commitment, u64), SyscallError> {
        if !self.config.features.enable_blob {
            return Err(CapError::Unsupported.into());
        }
        gas.charge(self.config.gas.g_base_blob)?;
        if !self.config.policy.namespace_allowed(ns) {
            return Err(CapError::Unsupported.into());
        }
        if data.len() > self.config.limits.blob_pin_max {
            return Err(CapError::LimitExceeded.into());
        }
        gas.charge_per_byte(self.config.gas.g_per_byte_blob, data.len() as u64)?;
        let commitment = self.blob.pin(ns, data)?;
        Ok((commitment, data.len() as u64))
    }

    /// Enqueues an AI inference job and returns the canonical receipt.
    pub fn ai_enqueue(
        &mut self,
        ctx: &SyscallContext,
        gas: &mut GasMeter,
        model: &[u8],
        prompt: &[u8],
        opts: Option<&[u8]>,
    ) -> Result<Vec<u8>, SyscallError> {
        if !self.config.features.enable_ai {
            return Err(CapError::Unsupported.into());
        }
        gas.charge(self.config.gas.g_base_enqueue)?;
        if model.len() > self.config.limits.ai_model_max
            || prompt.len() > self.config.limits.ai_prompt_max
            || opts.map_or(false, |o| o.len() > self.config.limits.ai_opts_max)
        {
            return Err(CapError::LimitExceeded.into());
        }
        let input_size = model.len() + prompt.len() + opts.map_or(0, <[u8]>::len);
        gas.charge_per_byte(self.config.gas.g_per_byte_enqueue, input_size as u64)?;

        let (opts_canonical, opts_value) = decode_opts(opts)?;
        if let Some(allow) = &self.config.policy.model_allowlist {
            if !allow.contains(&digest32(model)) {
                return Err(CapError::Unsupported.into());
            }
        }
        let payload_digest = ident::ai_payload_digest(model, prompt, &opts_canonical);
        self.finish_enqueue(
            ctx,
            JobKind::Ai,
            payload_digest,
            &opts_canonical,
            &opts_value,
            input_size as u64,
        )
    }

    /// Enqueues a quantum circuit job and returns the canonical receipt.
    pub fn quantum_enqueue(
        &mut self,
        ctx: &SyscallContext,
        gas: &mut GasMeter,
        circuit: &[u8],
        shots: u64,
        opts: Option<&[u8]>,
    ) -> Result<Vec<u8>, SyscallError> {
        if !self.config.features.enable_quantum {
            return Err(CapError::Unsupported.into());
        }
        gas.charge(self.config.gas.g_base_enqueue)?;
        if circuit.len() > self.config.limits.q_circuit_max
            || shots > self.config.limits.q_max_shots
            || opts.map_or(false, |o| o.len() > self.config.limits.q_opts_max)
        {
            return Err(CapError::LimitExceeded.into());
        }
        let input_size = circuit.len() + opts.map_or(0, <[u8]>::len);
        gas.charge_per_byte(self.config.gas.g_per_byte_enqueue, input_size as u64)?;

        let (opts_canonical, opts_value) = decode_opts(opts)?;
        let payload_digest = ident::quantum_payload_digest(circuit, shots, &opts_canonical);
        self.finish_enqueue(
            ctx,
            JobKind::Quantum,
            payload_digest,
            &opts_canonical,
            &opts_value,
            input_size as u64,
        )
    }

    fn finish_enqueue(
        &mut self,
        ctx: &SyscallContext,
        kind: JobKind,
        payload_digest: [u8; 32],
        opts_canonical: &[u8],
        opts_value: &EnqueueOpts,
        input_size: u64,
    ) -> Result<Vec<u8>, SyscallError> {
        if self.store.job_count()? >= self.config.limits.max_queue_depth {
            return Err(CapError::LimitExceeded.into());
        }
        let task_id = ident::derive_task_id(
            ident::enqueue_domain(kind),
            ctx.chain_id,
            ctx.height,
            &ctx.tx_hash,
            &ctx.caller,
            &payload_digest,
        );
        if self.store.job(&task_id)?.is_some() {
            // An identical enqueue in the same transaction context.
            return Err(CapError::Other.into());
        }
        let reserved_units = opts_value
            .max_units
            .unwrap_or(self.config.gas.default_reserved_units);
        self.treasury.reserve(&ctx.caller, reserved_units)?;

        let opts_digest = if opts_canonical.is_empty() {
            [0u8; 32]
        } else {
            digest32(opts_canonical)
        };
        let request = JobRequest {
            task_id,
            kind,
            caller: ctx.caller,
            height_enqueued: ctx.height,
            payload_digest,
            reserved_units,
            opts_digest,
            input_size,
        };
        self.store.put_job(&request)?;
        log::debug!(
            target: "capability",
            "enqueued task {} at height {}",
            opal_types::job::display_id(&task_id),
            ctx.height
        );

        let receipt = JobReceipt {
            task_id,
            kind,
            payload_digest,
            reserved_units,
        };
        codec::to_bytes_canonical(&receipt).map_err(SyscallError::Cap)
    }

    /// Serves a finalized result record, canonical-encoded.
    pub fn read_result(
        &mut self,
        ctx: &SyscallContext,
        gas: &mut GasMeter,
        task_id: &TaskId,
    ) -> Result<Vec<u8>, SyscallError> {
        gas.charge(self.config.gas.g_base_read)?;
        let record = match self.store.result(task_id)? {
            Some(record) => record,
            None => return Err(CapError::NoResultYet.into()),
        };
        // Results become visible one block after enqueue at the earliest;
        // reads after pruning fall out as NoResultYet above.
        if let Some(job) = self.store.job(task_id)? {
            if ctx.height <= job.height_enqueued {
                return Err(CapError::NoResultYet.into());
            }
        }
        codec::to_bytes_canonical(&record).map_err(SyscallError::Cap)
    }

    /// Verifies a zero-knowledge proof through the registered predicate.
    pub fn zk_verify(
        &mut self,
        _ctx: &SyscallContext,
        gas: &mut GasMeter,
        circuit: &[u8],
        proof: &[u8],
        public_input: &[u8],
    ) -> Result<(bool, u64), SyscallError> {
        if !self.config.features.enable_zk {
            return Err(CapError::Unsupported.into());
        }
        gas.charge(self.config.gas.g_base_zk)?;
        if circuit.len() > self.config.limits.zk_circuit_max
            || proof.len() > self.config.limits.zk_proof_max
            || public_input.len() > self.config.limits.zk_input_max
        {
            return Err(CapError::LimitExceeded.into());
        }
        let total = circuit.len() + proof.len() + public_input.len();
        gas.charge_per_byte(self.config.gas.g_per_byte_zk, total as u64)?;
        if let Some(allow) = &self.config.policy.circuit_allowlist {
            if !allow.contains(&digest32(circuit)) {
                return Err(CapError::Unsupported.into());
            }
        }
        let outcome = self.zk.verify(circuit, proof, public_input);
        if outcome.ok {
            let premium = outcome
                .units
                .saturating_mul(self.config.gas.g_zk_success_mult);
            gas.charge(premium)?;
        }
        Ok((outcome.ok, outcome.units))
    }

    /// Draws `n` deterministic bytes.
    pub fn random(
        &mut self,
        ctx: &SyscallContext,
        gas: &mut GasMeter,
        n: u32,
    ) -> Result<Vec<u8>, SyscallError> {
        if !self.config.features.enable_random {
            return Err(CapError::Unsupported.into());
        }
        gas.charge(self.config.gas.g_base_rand)?;
        if n > self.config.limits.rand_max_bytes {
            return Err(CapError::LimitExceeded.into());
        }
        gas.charge_per_byte(self.config.gas.g_per_byte_rand, u64::from(n))?;
        let transcript = RandTranscript {
            chain_id: ctx.chain_id,
            height: ctx.height,
            tx_hash: &ctx.tx_hash,
            caller: &ctx.caller,
            call_index: ctx.call_index,
            beacon: ctx.beacon.as_ref(),
        };
        Ok(rand::random_bytes(&transcript, n as usize))
    }
}

fn decode_opts(opts: Option<&[u8]>) -> Result<(Vec<u8>, EnqueueOpts), CapError> {
    match opts {
        Some(bytes) => {
            let value: EnqueueOpts = codec::from_bytes_canonical(bytes)?;
            Ok((bytes.to_vec(), value))
        }
        None => Ok((Vec::new(), EnqueueOpts::default())),
    }
}

/// The task id an AI enqueue with these consensus inputs derives. Exposed so
/// observers can precompute ids without constructing a provider.
pub fn ai_task_id(
    chain_id: ChainId,
    height: Height,
    tx_hash: &TxHash,
    caller: &Address,
    model: &[u8],
    prompt: &[u8],
    opts_canonical: &[u8],
) -> TaskId {
    let payload_digest = ident::ai_payload_digest(model, prompt, opts_canonical);
    ident::derive_task_id(
        domain::ENQUEUE_AI,
        chain_id,
        height,
        tx_hash,
        caller,
        &payload_digest,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use opal_api::mock::{FixedTreasury, MerkleBlobAdapter, StaticZk};
    use opal_storage::MemoryStore;
    use opal_types::{ResultRecord, ResultStatus};

    const CALLER: [u8; 32] = [0xaa; 32];

    fn ctx(height: Height) -> SyscallContext {
        SyscallContext {
            chain_id: 1,
            height,
            tx_hash: [0x11; 32],
            caller: CALLER,
            call_index: 0,
            beacon: None,
        }
    }

    struct Fixture {
        store: MemoryStore,
        treasury: FixedTreasury,
        config: CapabilityConfig,
        blob: MerkleBlobAdapter,
        zk: StaticZk,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                treasury: FixedTreasury::with_balances(&[(CALLER, 1_000_000)]),
                config: CapabilityConfig::permissive(),
                blob: MerkleBlobAdapter,
                zk: StaticZk { ok: true },
            }
        }

        fn provider(&mut self) -> SyscallProvider<'_, MemoryStore> {
            SyscallProvider::new(
                &mut self.store,
                &self.config,
                &self.blob,
                &self.zk,
                &mut self.treasury,
            )
        }
    }

    #[test]
    fn enqueue_returns_a_decodable_receipt_and_queues_the_job() {
        let mut fx = Fixture::new();
        let mut gas = GasMeter::new(1_000_000);
        let receipt_bytes = fx
            .provider()
            .ai_enqueue(&ctx(100), &mut gas, b"demo", b"count to 5", None)
            .unwrap();
        let receipt: JobReceipt = codec::from_bytes_canonical(&receipt_bytes).unwrap();
        assert_eq!(
            receipt.task_id,
            ai_task_id(1, 100, &[0x11; 32], &CALLER, b"demo", b"count to 5", &[])
        );
        let job = fx.store.job(&receipt.task_id).unwrap().unwrap();
        assert_eq!(job.height_enqueued, 100);
        assert_eq!(job.kind, JobKind::Ai);
        assert_eq!(job.reserved_units, fx.config.gas.default_reserved_units);
        assert_eq!(job.input_size, (b"demo".len() + b"count to 5".len()) as u64);
    }

    #[test]
    fn duplicate_enqueue_in_the_same_context_fails() {
        let mut fx = Fixture::new();
        let mut gas = GasMeter::new(1_000_000);
        let mut provider = fx.provider();
        provider
            .ai_enqueue(&ctx(100), &mut gas, b"demo", b"p", None)
            .unwrap();
        let err = provider
            .ai_enqueue(&ctx(100), &mut gas, b"demo", b"p", None)
            .unwrap_err();
        assert_eq!(err.cap(), Some(CapError::Other));
    }

    #[test]
    fn disabled_features_fail_unsupported() {
        let mut fx = Fixture::new();
        fx.config.features = opal_types::config::FeatureFlags {
            enable_ai: false,
            enable_quantum: false,
            enable_blob: false,
            enable_zk: false,
            enable_random: false,
        };
        let mut gas = GasMeter::new(1_000_000);
        let mut provider = fx.provider();
        let c = ctx(100);
        assert_eq!(
            provider
                .ai_enqueue(&c, &mut gas, b"m", b"p", None)
                .unwrap_err()
                .cap(),
            Some(CapError::Unsupported)
        );
        assert_eq!(
            provider
                .quantum_enqueue(&c, &mut gas, b"c", 1, None)
                .unwrap_err()
                .cap(),
            Some(CapError::Unsupported)
        );
        assert_eq!(
            provider.blob_pin(&c, &mut gas, 0, b"d").unwrap_err().cap(),
            Some(CapError::Unsupported)
        );
        assert_eq!(
            provider
                .zk_verify(&c, &mut gas, b"c", b"p", b"i")
                .unwrap_err()
                .cap(),
            Some(CapError::Unsupported)
        );
        assert_eq!(
            provider.random(&c, &mut gas, 8).unwrap_err().cap(),
            Some(CapError::Unsupported)
        );
    }

    #[test]
    fn oversize_blob_charges_base_gas_only() {
        let mut fx = Fixture::new();
        fx.config.limits.blob_pin_max = 8;
        let base = fx.config.gas.g_base_blob;
        let mut gas = GasMeter::new(1_000_000);
        let err = fx
            .provider()
            .blob_pin(&ctx(100), &mut gas, 24, &[0u8; 9])
            .unwrap_err();
        assert_eq!(err.cap(), Some(CapError::LimitExceeded));
        assert_eq!(gas.used(), base);
        assert_eq!(fx.store.job_count().unwrap(), 0);
    }

    #[test]
    fn cap_sized_blob_succeeds() {
        let mut fx = Fixture::new();
        fx.config.limits.blob_pin_max = 8;
        let mut gas = GasMeter::new(1_000_000);
        let (commitment, length) = fx
            .provider()
            .blob_pin(&ctx(100), &mut gas, 24, &[0u8; 8])
            .unwrap();
        assert_eq!(length, 8);
        assert_ne!(commitment, [0u8; 32]);
    }

    #[test]
    fn namespace_outside_policy_is_unsupported() {
        let mut fx = Fixture::new();
        fx.config.policy.allowed_namespaces =
            vec![opal_types::config::NamespaceRange { start: 16, end: 24 }];
        let mut gas = GasMeter::new(1_000_000);
        let err = fx
            .provider()
            .blob_pin(&ctx(100), &mut gas, 25, b"data")
            .unwrap_err();
        assert_eq!(err.cap(), Some(CapError::Unsupported));
    }

    #[test]
    fn non_canonical_opts_fail_not_deterministic() {
        let mut fx = Fixture::new();
        let mut gas = GasMeter::new(1_000_000);
        // {0: 5} with the value widened to a non-minimal encoding.
        let widened = vec![0xa1, 0x00, 0x18, 0x05];
        let err = fx
            .provider()
            .ai_enqueue(&ctx(100), &mut gas, b"demo", b"p", Some(&widened))
            .unwrap_err();
        assert_eq!(err.cap(), Some(CapError::NotDeterministic));
        assert_eq!(fx.store.job_count().unwrap(), 0);
    }

    #[test]
    fn canonical_opts_bound_the_reservation() {
        let mut fx = Fixture::new();
        let mut gas = GasMeter::new(1_000_000);
        let opts = codec::to_bytes_canonical(&EnqueueOpts {
            max_units: Some(42),
        })
        .unwrap();
        let receipt_bytes = fx
            .provider()
            .quantum_enqueue(&ctx(100), &mut gas, b"circuit", 1024, Some(&opts))
            .unwrap();
        let receipt: JobReceipt = codec::from_bytes_canonical(&receipt_bytes).unwrap();
        assert_eq!(receipt.reserved_units, 42);
        assert_eq!(receipt.kind, JobKind::Quantum);
        assert_eq!(fx.treasury.reserved(&CALLER), 42);
    }

    #[test]
    fn treasury_shortfall_leaves_no_state() {
        let mut fx = Fixture::new();
        fx.treasury = FixedTreasury::with_balances(&[(CALLER, 10)]);
        let mut gas = GasMeter::new(1_000_000);
        let err = fx
            .provider()
            .ai_enqueue(&ctx(100), &mut gas, b"demo", b"p", None)
            .unwrap_err();
        assert_eq!(err.cap(), Some(CapError::TreasuryInsufficient));
        assert_eq!(fx.store.job_count().unwrap(), 0);
        assert_eq!(fx.treasury.balance(&CALLER), 10);
    }

    #[test]
    fn queue_depth_cap_is_enforced() {
        let mut fx = Fixture::new();
        fx.config.limits.max_queue_depth = 1;
        let mut gas = GasMeter::new(1_000_000);
        let mut provider = fx.provider();
        provider
            .ai_enqueue(&ctx(100), &mut gas, b"demo", b"first", None)
            .unwrap();
        let err = provider
            .ai_enqueue(&ctx(100), &mut gas, b"demo", b"second", None)
            .unwrap_err();
        assert_eq!(err.cap(), Some(CapError::LimitExceeded));
    }

    #[test]
    fn read_result_respects_the_visibility_schedule() {
        let mut fx = Fixture::new();
        let mut gas = GasMeter::new(1_000_000);
        let receipt_bytes = fx
            .provider()
            .ai_enqueue(&ctx(100), &mut gas, b"demo", b"p", None)
            .unwrap();
        let receipt: JobReceipt = codec::from_bytes_canonical(&receipt_bytes).unwrap();

        // Same block: nothing to read.
        let err = fx
            .provider()
            .read_result(&ctx(100), &mut gas, &receipt.task_id)
            .unwrap_err();
        assert_eq!(err.cap(), Some(CapError::NoResultYet));

        // Next block, still unresolved.
        let err = fx
            .provider()
            .read_result(&ctx(101), &mut gas, &receipt.task_id)
            .unwrap_err();
        assert_eq!(err.cap(), Some(CapError::NoResultYet));

        // A record finalized at 101 is served at 101.
        let record = ResultRecord {
            task_id: receipt.task_id,
            status: ResultStatus::Ok,
            output: b"hello".to_vec(),
            metrics: Default::default(),
            proof_ref: [0x33; 32],
            finalized_at_height: 101,
            nullifier: [0x44; 32],
        };
        fx.store.put_result(&record).unwrap();
        let served = fx
            .provider()
            .read_result(&ctx(101), &mut gas, &receipt.task_id)
            .unwrap();
        let decoded: ResultRecord = codec::from_bytes_canonical(&served).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn unknown_task_reads_as_no_result_yet() {
        let mut fx = Fixture::new();
        let mut gas = GasMeter::new(1_000_000);
        let err = fx
            .provider()
            .read_result(&ctx(100), &mut gas, &[0x99; 32])
            .unwrap_err();
        assert_eq!(err.cap(), Some(CapError::NoResultYet));
    }

    #[test]
    fn zk_success_charges_the_premium() {
        let mut fx = Fixture::new();
        let mut gas = GasMeter::new(1_000_000);
        let proof = vec![0u8; 10];
        let (ok, units) = fx
            .provider()
            .zk_verify(&ctx(100), &mut gas, b"circuit", &proof, b"input")
            .unwrap();
        assert!(ok);
        assert_eq!(units, 10);
        let schedule = &fx.config.gas;
        let total = (b"circuit".len() + proof.len() + b"input".len()) as u64;
        let expected = schedule.g_base_zk
            + schedule.g_per_byte_zk * total
            + units * schedule.g_zk_success_mult;
        assert_eq!(gas.used(), expected);
    }

    #[test]
    fn zk_failure_skips_the_premium_without_error() {
        let mut fx = Fixture::new();
        fx.zk = StaticZk { ok: false };
        let mut gas = GasMeter::new(1_000_000);
        let (ok, _units) = fx
            .provider()
            .zk_verify(&ctx(100), &mut gas, b"circuit", &[0u8; 10], b"input")
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn circuit_allowlist_gates_zk_verify() {
        let mut fx = Fixture::new();
        fx.config.policy.circuit_allowlist = Some([digest32(b"known")].into_iter().collect());
        let mut gas = GasMeter::new(1_000_000);
        let err = fx
            .provider()
            .zk_verify(&ctx(100), &mut gas, b"unknown", b"p", b"i")
            .unwrap_err();
        assert_eq!(err.cap(), Some(CapError::Unsupported));
        assert!(fx
            .provider()
            .zk_verify(&ctx(100), &mut gas, b"known", b"p", b"i")
            .is_ok());
    }

    #[test]
    fn random_respects_cap_and_zero_length() {
        let mut fx = Fixture::new();
        fx.config.limits.rand_max_bytes = 32;
        let mut gas = GasMeter::new(1_000_000);
        let mut provider = fx.provider();
        assert!(provider.random(&ctx(100), &mut gas, 0).unwrap().is_empty());
        assert_eq!(provider.random(&ctx(100), &mut gas, 32).unwrap().len(), 32);
        let err = provider.random(&ctx(100), &mut gas, 33).unwrap_err();
        assert_eq!(err.cap(), Some(CapError::LimitExceeded));
    }

    #[test]
    fn dispatch_routes_every_call() {
        let mut fx = Fixture::new();
        let mut gas = GasMeter::new(10_000_000);
        let mut provider = fx.provider();
        let c = ctx(100);
        let pinned = provider
            .dispatch(
                &c,
                &mut gas,
                SyscallCall::BlobPin {
                    ns: 24,
                    data: b"blob".to_vec(),
                },
            )
            .unwrap();
        assert!(matches!(pinned, SyscallReturn::Pinned { length: 4, .. }));
        let bytes = provider
            .dispatch(&c, &mut gas, SyscallCall::Random { n: 16 })
            .unwrap();
        assert!(matches!(bytes, SyscallReturn::Bytes(ref b) if b.len() == 16));
    }
}
