//! Block-lifecycle helpers for the executor.
//!
//! The block executor drives the capability core at two points: the start of
//! block application (evidence ingest and the TTL sweep, before any
//! transaction executes) and the end (retention GC, before the batch
//! commits). Keeping both behind these helpers pins the ordering that the
//! visibility schedule depends on.

use crate::resolver::{Applied, BlockContext, Resolver};
use opal_api::state::CapabilityState;
use opal_api::Treasury;
use opal_types::config::TimingParams;
use opal_types::error::StorageError;
use opal_types::Height;

/// Ingests this block's evidence envelopes in block order, then seals every
/// job whose TTL elapsed. Returns the per-envelope outcomes.
pub fn begin_block<S: CapabilityState>(
    resolver: &Resolver<'_>,
    store: &mut S,
    treasury: &mut dyn Treasury,
    ctx: &BlockContext,
    envelopes: &[Vec<u8>],
) -> Result<Vec<Applied>, StorageError> {
    let mut outcomes = Vec::with_capacity(envelopes.len());
    for raw in envelopes {
        outcomes.push(resolver.apply_envelope(store, treasury, ctx, raw)?);
    }
    resolver.sweep_expired(store, ctx.height)?;
    Ok(outcomes)
}

/// Prunes terminal jobs past the retention window and nullifiers outside the
/// sliding window. Returns the number of jobs removed.
pub fn end_block<S: CapabilityState>(
    store: &mut S,
    timing: &TimingParams,
    current_height: Height,
) -> Result<u64, StorageError> {
    let before = current_height.saturating_sub(timing.retention_blocks);
    let null_floor = current_height.saturating_sub(timing.null_window_blocks);
    store.prune(before, null_floor)
}
