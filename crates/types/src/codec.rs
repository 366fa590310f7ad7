//! Defines the canonical, deterministic binary codec for all consensus-critical state.
//!
//! This module provides thin wrappers around `minicbor`, which encodes structs
//! as definite-length CBOR maps with minimal-width integer keys in ascending
//! order. By centralizing the codec logic here in the base `types` crate, we
//! ensure that all components use the exact same serialization format for
//! state, preventing consensus failures due to different binary
//! representations of the same data.
//!
//! Canonicity is enforced on the way in: [`from_bytes_canonical`] decodes and
//! then re-encodes the value, and rejects the input unless the bytes match
//! exactly. Non-minimal integers, reordered map keys, indefinite-length items
//! and trailing garbage all fail deterministically with
//! [`CapError::NotDeterministic`], which is precisely the round-trip law
//! `encode(decode(b)) = b` required for consensus surfaces.

use crate::error::CapError;

/// Encodes a value into its canonical byte representation.
///
/// This function should be used for all data that is written to
/// consensus-critical state or is included in a hash for identity or replay
/// protection.
pub fn to_bytes_canonical<T>(v: &T) -> Result<Vec<u8>, CapError>
where
    T: minicbor::Encode<()>,
{
    // Encoding into a Vec cannot fail; surface the generic code anyway
    // rather than panicking on a consensus path.
    minicbor::to_vec(v).map_err(|_| CapError::Other)
}

/// Decodes a value from a canonical byte representation.
///
/// Fails fast with [`CapError::NotDeterministic`] on any malformed or
/// non-canonical input, including inputs with trailing bytes. This is
/// critical for preventing two honest nodes from accepting different byte
/// representations of the same logical value.
pub fn from_bytes_canonical<T>(b: &[u8]) -> Result<T, CapError>
where
    T: minicbor::Encode<()> + for<'a> minicbor::Decode<'a, ()>,
{
    let v: T = minicbor::decode(b).map_err(|_| CapError::NotDeterministic)?;
    let reencoded = to_bytes_canonical(&v)?;
    if reencoded.as_slice() != b {
        return Err(CapError::NotDeterministic);
    }
    Ok(v)
}
