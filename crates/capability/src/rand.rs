//! The deterministic byte stream behind the `random` syscall.
//!
//! The seed pins the stream to consensus inputs: chain, height, transaction,
//! caller and the per-transaction call index, so that replaying the same
//! block yields the exact same bytes on every node, while two `random` calls
//! at different instruction indices diverge. When consensus flags a beacon
//! value as present for the block it is mixed into the transcript; when
//! absent the field is omitted entirely, so all nodes agree on the shape of
//! the transcript.

use crate::ident::{domain, DomainHasher};
use opal_types::{Address, ChainId, Height, TxHash};
use sha2::{Digest, Sha256};

/// The consensus inputs a `random` call is derived from.
#[derive(Debug, Clone, Copy)]
pub struct RandTranscript<'a> {
    /// The chain identifier.
    pub chain_id: ChainId,
    /// The height of the executing block.
    pub height: Height,
    /// The hash of the executing transaction.
    pub tx_hash: &'a TxHash,
    /// The calling contract's address.
    pub caller: &'a Address,
    /// The instruction index of this call within the transaction.
    pub call_index: u32,
    /// The prior-block beacon value, iff consensus flags one as present.
    pub beacon: Option<&'a [u8; 32]>,
}

/// Derives the 32-byte stream seed from the transcript.
pub fn derive_seed(t: &RandTranscript<'_>) -> [u8; 32] {
    let mut h = DomainHasher::new(domain::RAND_SEED)
        .u64(t.chain_id)
        .u64(t.height)
        .fixed32(t.tx_hash)
        .fixed32(t.caller)
        .u32(t.call_index);
    if let Some(beacon) = t.beacon {
        h = h.fixed32(beacon);
    }
    h.finalize()
}

/// Expands `seed` into `n` bytes by concatenating counter-indexed hash
/// blocks and truncating.
pub fn expand(seed: &[u8; 32], n: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(n);
    let mut counter: u64 = 0;
    while out.len() < n {
        let mut h = Sha256::new();
        h.update([domain::RAND_STREAM]);
        h.update(seed);
        h.update(counter.to_le_bytes());
        let block: [u8; 32] = h.finalize().into();
        let take = (n - out.len()).min(block.len());
        out.extend_from_slice(&block[..take]);
        counter += 1;
    }
    out
}

/// Derives the full byte stream for one `random` call.
pub fn random_bytes(t: &RandTranscript<'_>, n: usize) -> Vec<u8> {
    expand(&derive_seed(t), n)
}
