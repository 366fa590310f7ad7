//! The evidence resolver: joins verified off-chain attestations to queued
//! jobs during block application and commits normalized result records.
//!
//! Envelopes are processed in the deterministic order they appear within the
//! block. Acceptance is independent of that order because the result store
//! is write-once and nullifiers deduplicate replays. Individual envelope
//! failures never abort block application: invalid evidence with an
//! identifiable target becomes an `Err`-status record; unknown targets,
//! replays and malformed envelopes are dropped without a trace in state.

use crate::ident;
use opal_api::state::{CapabilityState, PutOutcome};
use opal_api::{EvidenceVerifier, Treasury, VerifyContext};
use opal_types::config::CapabilityConfig;
use opal_types::error::StorageError;
use opal_types::{
    codec, ChainId, EnvelopeBody, EvidenceEnvelope, Height, ProofKind, ProofMetrics, ResultRecord,
    ResultStatus,
};

/// Maps a QoS score in parts per million onto the fixed 16-bucket domain.
pub fn qos_bucket(qos_ppm: u32) -> u8 {
    ((qos_ppm / 62_500).min(15)) as u8
}

/// Maps a latency in milliseconds onto the fixed 16-bucket log domain.
pub fn latency_bucket(latency_ms: u32) -> u8 {
    if latency_ms == 0 {
        return 0;
    }
    ((u32::BITS - latency_ms.leading_zeros()) as u8).min(15)
}

/// The block being applied.
#[derive(Debug, Clone, Copy)]
pub struct BlockContext {
    /// The chain identifier.
    pub chain_id: ChainId,
    /// The height of the block under application.
    pub height: Height,
}

/// The closed registry of evidence verifiers.
///
/// Dispatch is a closed match over [`ProofKind`]; production wiring supplies
/// all six slots, and an envelope whose kind has no verifier is dropped.
#[derive(Default)]
pub struct VerifierRegistry<'a> {
    hash_share: Option<&'a dyn EvidenceVerifier>,
    ai: Option<&'a dyn EvidenceVerifier>,
    quantum: Option<&'a dyn EvidenceVerifier>,
    storage: Option<&'a dyn EvidenceVerifier>,
    vdf: Option<&'a dyn EvidenceVerifier>,
    zk: Option<&'a dyn EvidenceVerifier>,
}

impl<'a> VerifierRegistry<'a> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a verifier for `kind`, replacing any previous one.
    pub fn with(mut self, kind: ProofKind, verifier: &'a dyn EvidenceVerifier) -> Self {
        match kind {
            ProofKind::HashShare => self.hash_share = Some(verifier),
            ProofKind::Ai => self.ai = Some(verifier),
            ProofKind::Quantum => self.quantum = Some(verifier),
            ProofKind::Storage => self.storage = Some(verifier),
            ProofKind::Vdf => self.vdf = Some(verifier),
            ProofKind::Zk => self.zk = Some(verifier),
        }
        self
    }

    /// The verifier registered for `kind`, if any.
    pub fn get(&self, kind: ProofKind) -> Option<&'a dyn EvidenceVerifier> {
        match kind {
            ProofKind::HashShare => self.hash_share,
            ProofKind::Ai => self.ai,
            ProofKind::Quantum => self.quantum,
            ProofKind::Storage => self.storage,
            ProofKind::Vdf => self.vdf,
            ProofKind::Zk => self.zk,
        }
    }
}

/// Why an envelope produced no state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Non-canonical encoding, nullifier mismatch or missing attestation.
    Malformed,
    /// The type id maps to no registered proof kind or verifier.
    UnknownKind,
    /// The nullifier was already observed inside the window.
    Replay,
    /// No queued job carries the targeted task id.
    UnknownTarget,
    /// A record for the targeted task id already exists.
    AlreadyResolved,
}

/// The outcome of applying one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A result record was committed with the given status.
    Finalized(ResultStatus),
    /// The envelope was dropped; state is unchanged.
    Dropped(DropReason),
}

/// The evidence resolver for one block application.
pub struct Resolver<'a> {
    config: &'a CapabilityConfig,
    registry: VerifierRegistry<'a>,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over the given configuration and verifier set.
    pub fn new(config: &'a CapabilityConfig, registry: VerifierRegistry<'a>) -> Self {
        Self { config, registry }
    }

    /// Applies one raw envelope in block order.
    pub fn apply_envelope<S: CapabilityState>(
        &self,
        store: &mut S,
        treasury: &mut dyn Treasury,
        ctx: &BlockContext,
        raw: &[u8],
    ) -> Result<Applied, StorageError> {
        let envelope: EvidenceEnvelope = match codec::from_bytes_canonical(raw) {
            Ok(envelope) => envelope,
            Err(_) => return Ok(Applied::Dropped(DropReason::Malformed)),
        };
        let kind = match ProofKind::from_type_id(envelope.type_id) {
            Some(kind) => kind,
            None => return Ok(Applied::Dropped(DropReason::UnknownKind)),
        };

        let nullifier = ident::derive_nullifier(
            ident::null_domain(kind),
            ctx.chain_id,
            envelope.type_id,
            0,
            &envelope.body,
        );
        if nullifier != envelope.nullifier {
            return Ok(Applied::Dropped(DropReason::Malformed));
        }
        if store.nullifier_seen(&nullifier)? {
            return Ok(Applied::Dropped(DropReason::Replay));
        }

        let body: EnvelopeBody = match codec::from_bytes_canonical(&envelope.body) {
            Ok(body) => body,
            Err(_) => return Ok(Applied::Dropped(DropReason::Malformed)),
        };
        let job = match store.job(&body.task_id)? {
            Some(job) => job,
            None => return Ok(Applied::Dropped(DropReason::UnknownTarget)),
        };
        if store.result(&body.task_id)?.is_some() {
            return Ok(Applied::Dropped(DropReason::AlreadyResolved));
        }
        if self.config.policy.attestation_required.contains(&kind) && body.attestation.is_empty() {
            return Ok(Applied::Dropped(DropReason::Malformed));
        }
        let verifier = match self.registry.get(kind) {
            Some(verifier) => verifier,
            None => return Ok(Applied::Dropped(DropReason::UnknownKind)),
        };

        let outcome = verifier.verify(
            &body,
            &VerifyContext {
                chain_id: ctx.chain_id,
                height: ctx.height,
                job: &job,
            },
        );

        let accepted = outcome.ok && body.output.len() <= self.config.limits.read_result_max;
        let record = if accepted {
            ResultRecord {
                task_id: body.task_id,
                status: ResultStatus::Ok,
                output: body.output.clone(),
                metrics: ProofMetrics {
                    units: outcome.units,
                    qos_bucket: qos_bucket(outcome.qos_ppm),
                    latency_bucket: latency_bucket(outcome.latency_ms),
                },
                proof_ref: ident::proof_ref(raw),
                finalized_at_height: ctx.height,
                nullifier,
            }
        } else {
            ResultRecord {
                task_id: body.task_id,
                status: ResultStatus::Err,
                output: Vec::new(),
                metrics: ProofMetrics::default(),
                proof_ref: ident::proof_ref(raw),
                finalized_at_height: ctx.height,
                nullifier,
            }
        };

        match store.put_result(&record)? {
            PutOutcome::Exists => Ok(Applied::Dropped(DropReason::AlreadyResolved)),
            PutOutcome::Inserted => {
                store.insert_nullifier(&nullifier, ctx.height)?;
                if record.status == ResultStatus::Ok {
                    let units = outcome.units.min(job.reserved_units);
                    if treasury.debit(&job.caller, units).is_err() {
                        log::warn!(
                            target: "capability",
                            "treasury debit failed for task {}",
                            opal_types::job::display_id(&body.task_id)
                        );
                    }
                }
                Ok(Applied::Finalized(record.status))
            }
        }
    }

    /// Seals every job whose TTL elapsed without evidence, writing synthetic
    /// `Ttl` records. Returns the number of jobs sealed.
    pub fn sweep_expired<S: CapabilityState>(
        &self,
        store: &mut S,
        current_height: Height,
    ) -> Result<u64, StorageError> {
        let expired =
            store.expired_jobs(current_height, self.config.timing.result_ttl_blocks)?;
        let mut sealed = 0u64;
        for task_id in expired {
            let record = ResultRecord::sealed_by_ttl(task_id, current_height);
            if store.put_result(&record)? == PutOutcome::Inserted {
                sealed += 1;
            }
        }
        if sealed > 0 {
            log::debug!(target: "capability", "ttl sweep sealed {} jobs", sealed);
        }
        Ok(sealed)
    }
}
