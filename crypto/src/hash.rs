//! Blake2b hashing for events.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use weft_types::{EventHash, HashedEventData};

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash the signed part of an event.
///
/// Fields are fed in declaration order as little-endian integers. An absent
/// parent is encoded as a zero tag byte, a present one as `1` followed by its
/// hash, so `(None, Some(h))` and `(Some(h), None)` never collide. Each
/// transaction is length-prefixed.
pub fn hash_event(data: &HashedEventData) -> EventHash {
    let mut hasher = Blake2b256::new();
    hasher.update(data.creator.id().to_le_bytes());
    hasher.update(data.generation.to_le_bytes());
    hasher.update(data.birth_round.to_le_bytes());
    for parent in [&data.self_parent, &data.other_parent] {
        match parent {
            Some(hash) => {
                hasher.update([1u8]);
                hasher.update(hash.as_bytes());
            }
            None => hasher.update([0u8]),
        }
    }
    hasher.update(data.time_created.as_nanos().to_le_bytes());
    hasher.update((data.transactions.len() as u64).to_le_bytes());
    for tx in &data.transactions {
        hasher.update((tx.len() as u64).to_le_bytes());
        hasher.update(tx);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    EventHash::new(output)
}
