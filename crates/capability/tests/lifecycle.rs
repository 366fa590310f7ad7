//! End-to-end lifecycle tests driving the capability core the way the block
//! executor does: syscalls during block N, evidence ingest and TTL sweep at
//! the start of block N+1 application, retention GC at block end.

use opal_api::mock::{FixedTreasury, MerkleBlobAdapter, StaticVerifier, StaticZk};
use opal_api::state::CapabilityState;
use opal_capability::block;
use opal_capability::ident;
use opal_capability::provider::{SyscallContext, SyscallProvider};
use opal_capability::resolver::{Applied, BlockContext, DropReason, Resolver, VerifierRegistry};
use opal_capability::GasMeter;
use opal_storage::{MemoryStore, RedbStore};
use opal_types::config::CapabilityConfig;
use opal_types::error::CapError;
use opal_types::{
    codec, ChainId, EnvelopeBody, EvidenceEnvelope, JobReceipt, ProofKind, ResultRecord,
    ResultStatus, TaskId,
};

const CHAIN: ChainId = 1;
const CALLER: [u8; 32] = [0xaa; 32];
const TX_HASH: [u8; 32] = [0x11; 32];

fn ctx(height: u64) -> SyscallContext {
    SyscallContext {
        chain_id: CHAIN,
        height,
        tx_hash: TX_HASH,
        caller: CALLER,
        call_index: 0,
        beacon: None,
    }
}

fn ai_envelope(task_id: TaskId, output: &[u8], units: u64) -> Vec<u8> {
    let body = EnvelopeBody {
        task_id,
        output: output.to_vec(),
        units,
        qos_ppm: 980_000,
        latency_ms: 12,
        attestation: vec![0x01],
    };
    let body_bytes = codec::to_bytes_canonical(&body).unwrap();
    let nullifier = ident::derive_nullifier(
        ident::null_domain(ProofKind::Ai),
        CHAIN,
        ProofKind::Ai.type_id(),
        0,
        &body_bytes,
    );
    codec::to_bytes_canonical(&EvidenceEnvelope {
        type_id: ProofKind::Ai.type_id(),
        body: body_bytes,
        nullifier,
    })
    .unwrap()
}

fn enqueue_demo_job<S: CapabilityState>(
    store: &mut S,
    treasury: &mut FixedTreasury,
    config: &CapabilityConfig,
    height: u64,
) -> JobReceipt {
    let blob = MerkleBlobAdapter;
    let zk = StaticZk { ok: true };
    let mut provider = SyscallProvider::new(store, config, &blob, &zk, treasury);
    let mut gas = GasMeter::new(1_000_000);
    let receipt_bytes = provider
        .ai_enqueue(&ctx(height), &mut gas, b"demo", b"count to 5", None)
        .unwrap();
    codec::from_bytes_canonical(&receipt_bytes).unwrap()
}

fn read_result<S: CapabilityState>(
    store: &mut S,
    treasury: &mut FixedTreasury,
    config: &CapabilityConfig,
    height: u64,
    task_id: &TaskId,
) -> Result<ResultRecord, CapError> {
    let blob = MerkleBlobAdapter;
    let zk = StaticZk { ok: true };
    let mut provider = SyscallProvider::new(store, config, &blob, &zk, treasury);
    let mut gas = GasMeter::new(1_000_000);
    match provider.read_result(&ctx(height), &mut gas, task_id) {
        Ok(bytes) => Ok(codec::from_bytes_canonical(&bytes).unwrap()),
        Err(err) => Err(err.cap().unwrap()),
    }
}

#[test]
fn scenario_a_enqueue_resolve_read() {
    let config = CapabilityConfig::permissive();
    let mut store = MemoryStore::new();
    let mut treasury = FixedTreasury::with_balances(&[(CALLER, 1_000_000)]);

    // Block 100: the contract enqueues and cannot read back yet.
    let receipt = enqueue_demo_job(&mut store, &mut treasury, &config, 100);
    assert_eq!(
        read_result(&mut store, &mut treasury, &config, 100, &receipt.task_id),
        Err(CapError::NoResultYet)
    );

    // Block 101 application: the envelope lands and finalizes the record.
    let verifier = StaticVerifier { ok: true };
    let registry = VerifierRegistry::new().with(ProofKind::Ai, &verifier);
    let resolver = Resolver::new(&config, registry);
    let outcomes = block::begin_block(
        &resolver,
        &mut store,
        &mut treasury,
        &BlockContext {
            chain_id: CHAIN,
            height: 101,
        },
        &[ai_envelope(receipt.task_id, b"hello", 120)],
    )
    .unwrap();
    assert_eq!(outcomes, vec![Applied::Finalized(ResultStatus::Ok)]);

    let record = read_result(&mut store, &mut treasury, &config, 101, &receipt.task_id).unwrap();
    assert_eq!(record.status, ResultStatus::Ok);
    assert_eq!(record.output, b"hello");
    assert_eq!(record.metrics.units, 120);
    assert_eq!(record.finalized_at_height, 101);
}

#[test]
fn scenario_b_ttl_expiry() {
    let config = CapabilityConfig::permissive();
    let mut store = MemoryStore::new();
    let mut treasury = FixedTreasury::with_balances(&[(CALLER, 1_000_000)]);
    let receipt = enqueue_demo_job(&mut store, &mut treasury, &config, 100);

    let resolver = Resolver::new(&config, VerifierRegistry::new());
    // Blocks pass without evidence; at 151 the sweep seals the job.
    for height in 101..=151 {
        block::begin_block(
            &resolver,
            &mut store,
            &mut treasury,
            &BlockContext {
                chain_id: CHAIN,
                height,
            },
            &[],
        )
        .unwrap();
    }
    let record = read_result(&mut store, &mut treasury, &config, 151, &receipt.task_id).unwrap();
    assert_eq!(record.status, ResultStatus::Ttl);
    assert!(record.output.is_empty());
    assert_eq!(record.metrics.units, 0);
}

#[test]
fn scenario_c_replay_is_rejected() {
    let config = CapabilityConfig::permissive();
    let mut store = MemoryStore::new();
    let mut treasury = FixedTreasury::with_balances(&[(CALLER, 1_000_000)]);
    let receipt = enqueue_demo_job(&mut store, &mut treasury, &config, 100);
    let raw = ai_envelope(receipt.task_id, b"hello", 120);

    let verifier = StaticVerifier { ok: true };
    let registry = VerifierRegistry::new().with(ProofKind::Ai, &verifier);
    let resolver = Resolver::new(&config, registry);

    let outcomes = block::begin_block(
        &resolver,
        &mut store,
        &mut treasury,
        &BlockContext {
            chain_id: CHAIN,
            height: 101,
        },
        &[raw.clone()],
    )
    .unwrap();
    assert_eq!(outcomes, vec![Applied::Finalized(ResultStatus::Ok)]);
    let reserved_after_first = treasury.reserved(&CALLER);
    let record = store.result(&receipt.task_id).unwrap().unwrap();

    // The identical envelope in the next block changes nothing.
    let outcomes = block::begin_block(
        &resolver,
        &mut store,
        &mut treasury,
        &BlockContext {
            chain_id: CHAIN,
            height: 102,
        },
        &[raw],
    )
    .unwrap();
    assert_eq!(outcomes, vec![Applied::Dropped(DropReason::Replay)]);
    assert_eq!(store.result(&receipt.task_id).unwrap().unwrap(), record);
    assert_eq!(treasury.reserved(&CALLER), reserved_after_first);
}

#[test]
fn retention_prunes_and_reads_fall_back_to_no_result() {
    let config = CapabilityConfig::permissive();
    let mut store = MemoryStore::new();
    let mut treasury = FixedTreasury::with_balances(&[(CALLER, 1_000_000)]);
    let receipt = enqueue_demo_job(&mut store, &mut treasury, &config, 100);

    let verifier = StaticVerifier { ok: true };
    let registry = VerifierRegistry::new().with(ProofKind::Ai, &verifier);
    let resolver = Resolver::new(&config, registry);
    block::begin_block(
        &resolver,
        &mut store,
        &mut treasury,
        &BlockContext {
            chain_id: CHAIN,
            height: 101,
        },
        &[ai_envelope(receipt.task_id, b"hello", 120)],
    )
    .unwrap();

    // Inside the retention window the record survives GC.
    let far = 100 + config.timing.retention_blocks;
    assert_eq!(block::end_block(&mut store, &config.timing, far).unwrap(), 0);
    // One block later it is pruned, and reads degrade to NoResultYet.
    assert_eq!(
        block::end_block(&mut store, &config.timing, far + 1).unwrap(),
        1
    );
    assert_eq!(
        read_result(&mut store, &mut treasury, &config, far + 1, &receipt.task_id),
        Err(CapError::NoResultYet)
    );
}

fn run_one_instance<S: CapabilityState>(
    store: &mut S,
    config: &CapabilityConfig,
) -> (TaskId, Vec<u8>) {
    let mut treasury = FixedTreasury::with_balances(&[(CALLER, 1_000_000)]);
    let receipt = enqueue_demo_job(store, &mut treasury, config, 100);

    let verifier = StaticVerifier { ok: true };
    let registry = VerifierRegistry::new().with(ProofKind::Ai, &verifier);
    let resolver = Resolver::new(config, registry);
    resolver
        .apply_envelope(
            store,
            &mut treasury,
            &BlockContext {
                chain_id: CHAIN,
                height: 101,
            },
            &ai_envelope(receipt.task_id, b"hello", 120),
        )
        .unwrap();
    let record = store.result(&receipt.task_id).unwrap().unwrap();
    (receipt.task_id, codec::to_bytes_canonical(&record).unwrap())
}

#[test]
fn two_instances_derive_identical_state() {
    let config = CapabilityConfig::permissive();
    let mut first = MemoryStore::new();
    let mut second = MemoryStore::new();
    let (id_a, bytes_a) = run_one_instance(&mut first, &config);
    let (id_b, bytes_b) = run_one_instance(&mut second, &config);
    assert_eq!(id_a, id_b);
    assert_eq!(bytes_a, bytes_b);
}

#[test]
fn full_cycle_over_the_persistent_store() {
    let dir = tempfile::tempdir().unwrap();
    let db = RedbStore::open(dir.path().join("cap.redb")).unwrap();
    let config = CapabilityConfig::permissive();
    let mut treasury = FixedTreasury::with_balances(&[(CALLER, 1_000_000)]);

    // Block 100: enqueue inside a batch, commit at block end.
    let receipt = {
        let mut batch = db.begin_block();
        let receipt = enqueue_demo_job(&mut batch, &mut treasury, &config, 100);
        batch.commit().unwrap();
        receipt
    };

    // Block 101: evidence ingest at the start of application.
    let verifier = StaticVerifier { ok: true };
    let registry = VerifierRegistry::new().with(ProofKind::Ai, &verifier);
    let resolver = Resolver::new(&config, registry);
    {
        let mut batch = db.begin_block();
        let outcomes = block::begin_block(
            &resolver,
            &mut batch,
            &mut treasury,
            &BlockContext {
                chain_id: CHAIN,
                height: 101,
            },
            &[ai_envelope(receipt.task_id, b"hello", 120)],
        )
        .unwrap();
        assert_eq!(outcomes, vec![Applied::Finalized(ResultStatus::Ok)]);
        batch.commit().unwrap();
    }

    // The record is visible to reads in later blocks and identical to the
    // memory-store derivation.
    let mut batch = db.begin_block();
    let record = read_result(&mut batch, &mut treasury, &config, 102, &receipt.task_id).unwrap();
    assert_eq!(record.status, ResultStatus::Ok);
    assert_eq!(record.output, b"hello");

    let mut memory = MemoryStore::new();
    let mut mem_treasury = FixedTreasury::with_balances(&[(CALLER, 1_000_000)]);
    let mem_receipt = enqueue_demo_job(&mut memory, &mut mem_treasury, &config, 100);
    assert_eq!(mem_receipt.task_id, receipt.task_id);
}
