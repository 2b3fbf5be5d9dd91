//! # Hashing Utilities
//!
//! Every digest in chainstore is SHA-256: chunk fingerprints, Merkle nodes,
//! and block hashes.
//!
//! Digests are passed around as fixed-size [`Hash`] arrays. Hex encoding only
//! happens at the edges (index keys, JSON, log lines).

use sha2::{Digest, Sha256};

use crate::config::HASH_LENGTH;

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; HASH_LENGTH];

/// Compute the SHA-256 digest of `data`.
///
/// # Example
///
/// ```
/// use chainstore_protocol::crypto::sha256;
///
/// let hash = sha256(b"chainstore");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash several byte slices as if they were concatenated.
///
/// Feeds each part into the hasher in order, so callers don't have to build
/// a temporary buffer for `left || right` style preimages.
pub fn sha256_multi(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Digest of two child hashes: `SHA-256(left || right)`.
///
/// This is the interior-node rule of the Merkle tree and the folding rule of
/// proof verification, so both sides must go through this one function.
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    sha256_multi(&[left.as_slice(), right.as_slice()])
}

/// Serde adapter that stores a [`Hash`] as a lowercase hex string.
pub mod hex_hash {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Hash, HASH_LENGTH};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut out = [0u8; HASH_LENGTH];
        hex::decode_to_slice(&s, &mut out).map_err(serde::de::Error::custom)?;
        Ok(out)
    }
}

/// Serde adapter for an optional [`Hash`]. `None` is written as an empty
/// string, which is how the genesis block records its missing parent.
pub mod hex_hash_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Hash, HASH_LENGTH};

    pub fn serialize<S: Serializer>(hash: &Option<Hash>, serializer: S) -> Result<S::Ok, S::Error> {
        match hash {
            Some(h) => serializer.serialize_str(&hex::encode(h)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Hash>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if s.is_empty() {
            return Ok(None);
        }
        let mut out = [0u8; HASH_LENGTH];
        hex::decode_to_slice(&s, &mut out).map_err(serde::de::Error::custom)?;
        Ok(Some(out))
    }
}

/// Serde adapter for arbitrary byte payloads (chunk data) as hex.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
