//! # Merkle Tree
//!
//! A binary SHA-256 Merkle tree over the ordered chunks of a file.
//!
//! ## Layout
//!
//! The tree is stored as levels, leaves first and root last:
//!
//! ```text
//! levels[2]:            R = H(A || B)
//! levels[1]:      A = H(h0 || h1)     B = H(h2 || h2)
//! levels[0]:      h0        h1        h2
//! ```
//!
//! Leaf `i` is `SHA-256(chunk i)`. When a level has an odd number of nodes,
//! the last node is paired with itself, so every interior node has exactly
//! two children. The duplicate is not stored; it is implied by the odd
//! length of the level.
//!
//! Only the root leaves this module in practice. It is embedded in a block,
//! and the tree itself is discarded or rebuilt on demand to answer proofs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::hash::{hash_pair, hex_hash, sha256, Hash};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    /// A tree needs at least one leaf to have a root.
    #[error("cannot build a Merkle tree from zero chunks")]
    Empty,

    #[error("leaf index {index} out of range for tree with {leaves} leaves")]
    LeafOutOfRange { index: usize, leaves: usize },
}

/// One step of an inclusion proof: the sibling hash at a given level and
/// whether that sibling sits to the left of the node being proven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProofStep {
    #[serde(with = "hex_hash")]
    pub hash: Hash,
    pub is_left: bool,
}

/// Immutable Merkle tree built from an ordered sequence of chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build a tree over `chunks`, preserving their order as leaf order.
    pub fn build<T: AsRef<[u8]>>(chunks: &[T]) -> Result<Self, MerkleError> {
        let leaves = chunks.iter().map(|c| sha256(c.as_ref())).collect();
        Self::from_leaf_hashes(leaves)
    }

    /// Build a tree from already-computed leaf hashes.
    pub fn from_leaf_hashes(leaves: Vec<Hash>) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::Empty);
        }

        let mut levels = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next: Vec<Hash> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [only] => hash_pair(only, only),
                    _ => unreachable!("chunks(2) yields one or two items"),
                })
                .collect();
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// The root hash committing to every leaf.
    pub fn root(&self) -> Hash {
        // Construction guarantees at least one level with exactly one node at the top.
        self.levels[self.levels.len() - 1][0]
    }

    /// Leaf hashes in chunk order.
    pub fn leaves(&self) -> &[Hash] {
        &self.levels[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Number of hashing levels above the leaves (0 for a single-leaf tree).
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Produce the inclusion proof for leaf `leaf_index`, ordered leaf to root.
    pub fn generate_proof(&self, leaf_index: usize) -> Result<Vec<MerkleProofStep>, MerkleError> {
        if leaf_index >= self.leaf_count() {
            return Err(MerkleError::LeafOutOfRange {
                index: leaf_index,
                leaves: self.leaf_count(),
            });
        }

        let mut proof = Vec::with_capacity(self.depth());
        let mut index = leaf_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let is_left = index % 2 == 1;
            let sibling = if is_left {
                index - 1
            } else {
                // The odd last node is its own sibling.
                (index + 1).min(level.len() - 1)
            };
            proof.push(MerkleProofStep {
                hash: level[sibling],
                is_left,
            });
            index /= 2;
        }
        Ok(proof)
    }
}

/// Check that `data` is included under `claimed_root` according to `proof`.
pub fn verify_proof(data: &[u8], claimed_root: &Hash, proof: &[MerkleProofStep]) -> bool {
    let computed = proof.iter().fold(sha256(data), |acc, step| {
        if step.is_left {
            hash_pair(&step.hash, &acc)
        } else {
            hash_pair(&acc, &step.hash)
        }
    });
    computed == *claimed_root
}
