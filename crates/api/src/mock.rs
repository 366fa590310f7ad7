//! Deterministic mock collaborators for tests and local networks.
//!
//! These implementations are consensus-safe in their own right (pure
//! functions of their inputs plus explicit in-memory state), so integration
//! tests exercising the full capability flow produce byte-identical results
//! on every machine.

use crate::adapters::{
    BlobAdapter, EvidenceVerifier, Treasury, VerifierOutcome, VerifyContext, ZkOutcome, ZkVerifier,
};
use opal_types::error::CapError;
use opal_types::{Address, Commitment, EnvelopeBody};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Leaf size used by the mock DA adapter's erasure layout.
const MERKLE_LEAF_BYTES: usize = 1024;

/// A blob adapter computing a namespaced binary Merkle root over fixed-size
/// leaves, standing in for the DA collaborator.
#[derive(Debug, Default, Clone)]
pub struct MerkleBlobAdapter;

impl MerkleBlobAdapter {
    fn leaf(ns: u32, chunk: &[u8]) -> [u8; 32] {
        let mut h = Sha256::new();
        h.update([0x00]);
        h.update(ns.to_be_bytes());
        h.update((chunk.len() as u64).to_be_bytes());
        h.update(chunk);
        h.finalize().into()
    }

    fn node(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        let mut h = Sha256::new();
        h.update([0x01]);
        h.update(left);
        h.update(right);
        h.finalize().into()
    }
}

impl BlobAdapter for MerkleBlobAdapter {
    fn pin(&self, ns: u32, data: &[u8]) -> Result<Commitment, CapError> {
        let mut level: Vec<[u8; 32]> = if data.is_empty() {
            vec![Self::leaf(ns, &[])]
        } else {
            data.chunks(MERKLE_LEAF_BYTES)
                .map(|chunk| Self::leaf(ns, chunk))
                .collect()
        };
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => Self::node(left, right),
                    // Odd tail nodes are promoted unchanged.
                    [single] => *single,
                    _ => unreachable!(),
                })
                .collect();
        }
        Ok(level[0])
    }
}

/// An in-memory treasury with explicit balances per caller.
#[derive(Debug, Default, Clone)]
pub struct FixedTreasury {
    balances: BTreeMap<Address, u64>,
    reserved: BTreeMap<Address, u64>,
}

impl FixedTreasury {
    /// Creates a treasury crediting `balance` to each listed caller.
    pub fn with_balances(entries: &[(Address, u64)]) -> Self {
        Self {
            balances: entries.iter().copied().collect(),
            reserved: BTreeMap::new(),
        }
    }

    /// The spendable balance of `caller`.
    pub fn balance(&self, caller: &Address) -> u64 {
        self.balances.get(caller).copied().unwrap_or(0)
    }

    /// The units currently reserved for `caller`.
    pub fn reserved(&self, caller: &Address) -> u64 {
        self.reserved.get(caller).copied().unwrap_or(0)
    }
}

impl Treasury for FixedTreasury {
    fn reserve(&mut self, caller: &Address, units: u64) -> Result<(), CapError> {
        let balance = self.balances.get_mut(caller).ok_or(CapError::TreasuryInsufficient)?;
        if *balance < units {
            return Err(CapError::TreasuryInsufficient);
        }
        *balance -= units;
        *self.reserved.entry(*caller).or_insert(0) += units;
        Ok(())
    }

    fn debit(&mut self, caller: &Address, units: u64) -> Result<(), CapError> {
        let reserved = self.reserved.get_mut(caller).ok_or(CapError::TreasuryInsufficient)?;
        if *reserved < units {
            return Err(CapError::TreasuryInsufficient);
        }
        *reserved -= units;
        Ok(())
    }
}

/// An evidence verifier with a fixed verdict, echoing the body's metrics.
#[derive(Debug, Clone, Copy)]
pub struct StaticVerifier {
    /// The verdict returned for every body.
    pub ok: bool,
}

impl EvidenceVerifier for StaticVerifier {
    fn verify(&self, body: &EnvelopeBody, _ctx: &VerifyContext<'_>) -> VerifierOutcome {
        VerifierOutcome {
            ok: self.ok,
            units: body.units,
            qos_ppm: body.qos_ppm,
            latency_ms: body.latency_ms,
        }
    }
}

/// A zk predicate with a fixed verdict and unit cost proportional to the
/// proof size.
#[derive(Debug, Clone, Copy)]
pub struct StaticZk {
    /// The verdict returned for every proof.
    pub ok: bool,
}

impl ZkVerifier for StaticZk {
    fn verify(&self, _circuit: &[u8], proof: &[u8], _public_input: &[u8]) -> ZkOutcome {
        ZkOutcome {
            ok: self.ok,
            units: proof.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_is_deterministic_and_namespace_separated() {
        let adapter = MerkleBlobAdapter;
        let a = adapter.pin(24, b"some blob data").unwrap();
        let b = adapter.pin(24, b"some blob data").unwrap();
        let c = adapter.pin(25, b"some blob data").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn pin_covers_multi_leaf_blobs() {
        let adapter = MerkleBlobAdapter;
        let big = vec![0xabu8; MERKLE_LEAF_BYTES * 3 + 17];
        let root = adapter.pin(1, &big).unwrap();
        let mut tweaked = big.clone();
        tweaked[MERKLE_LEAF_BYTES * 2] ^= 1;
        assert_ne!(root, adapter.pin(1, &tweaked).unwrap());
    }

    #[test]
    fn treasury_reserve_then_debit() {
        let caller = [0xaa; 32];
        let mut treasury = FixedTreasury::with_balances(&[(caller, 1_000)]);
        treasury.reserve(&caller, 600).unwrap();
        assert_eq!(treasury.balance(&caller), 400);
        assert_eq!(treasury.reserved(&caller), 600);
        treasury.debit(&caller, 120).unwrap();
        assert_eq!(treasury.reserved(&caller), 480);
        assert_eq!(
            treasury.reserve(&caller, 500).unwrap_err(),
            CapError::TreasuryInsufficient
        );
    }
}
