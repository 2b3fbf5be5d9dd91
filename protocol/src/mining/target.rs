//! Difficulty targets.
//!
//! Difficulty is a count of leading zero bits. The target is the largest hash
//! value that still qualifies: `(2^256 - 1) >> difficulty`. A hash meets the
//! target when its big-endian integer value is `<=` the target. This is a
//! numeric comparison, so odd difficulties are exact (there is no hex-nibble
//! rounding).

use primitive_types::U256;

use crate::config::HASH_BITS;
use crate::crypto::Hash;

/// The numeric threshold for `difficulty` leading zero bits.
///
/// Difficulties of 256 and above collapse to a target of zero.
pub fn target(difficulty: u32) -> U256 {
    if difficulty >= HASH_BITS {
        return U256::zero();
    }
    U256::MAX >> difficulty
}

/// Interpret a digest as a big-endian unsigned 256-bit integer.
pub fn hash_to_u256(hash: &Hash) -> U256 {
    U256::from_big_endian(hash)
}

/// Whether `hash` is numerically at or below `target`.
pub fn meets_target(hash: &Hash, target: &U256) -> bool {
    hash_to_u256(hash) <= *target
}
