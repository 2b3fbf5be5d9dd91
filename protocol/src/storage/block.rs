//! # Block Structure
//!
//! A block records one upload: the Merkle root of the file's chunks, linked
//! to the previous block by hash and sealed with proof of work.
//!
//! ## Block Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  index: u64          position in the chain   │
//! │  timestamp: UTC      creation / last retry   │
//! │  merkle_root: [u8;32]                        │
//! │  prev_hash: [u8;32]  (absent for genesis)    │
//! │  hash: [u8;32]       SHA-256 of the above    │
//! │  nonce: u64          proof-of-work solution  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! The preimage is `index || timestamp || nonce || merkle_root || prev_hash`,
//! with integers big-endian and the timestamp split into whole seconds (i64)
//! and sub-second nanoseconds (u32). The genesis block contributes zero bytes
//! for its missing parent.
//!
//! ## Lifecycle
//!
//! `Block::create` produces an unsealed block whose hash is consistent with
//! its fields but not yet below any target. The miner seals it by choosing a
//! nonce. Sealed blocks are not mutated again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::hash::{hex_hash, hex_hash_opt, sha256, sha256_multi, Hash};
use crate::mining::miner::{Miner, MinerConfig, MiningError, MiningOutcome};
use crate::mining::target::{meets_target, target};
use crate::storage::chain::Blockchain;

/// Coinbase message committed to by the genesis block's Merkle root.
pub const GENESIS_MESSAGE: &[u8] = b"chainstore genesis: every chunk accounted for";

// ---------------------------------------------------------------------------
// Validation Errors
// ---------------------------------------------------------------------------

/// Reasons a block fails validation against its predecessor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("block {index} hash mismatch: stored={stored}, computed={computed}")]
    HashMismatch {
        index: u64,
        stored: String,
        computed: String,
    },

    #[error("block {index} does not link to previous block {expected}")]
    PrevHashMismatch { index: u64, expected: String },

    #[error("block index {got} does not follow previous index {prev}")]
    NonSequentialIndex { prev: u64, got: u64 },

    #[error("block {index} hash does not meet difficulty {difficulty}")]
    InsufficientWork { index: u64, difficulty: u32 },

    #[error("invalid genesis block: {0}")]
    InvalidGenesis(String),
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A single ledger entry. Serialized field names match the on-disk chain
/// format (`merkleRoot`, `prevHash`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "hex_hash")]
    pub merkle_root: Hash,
    /// Hash of the previous block. `None` only for genesis.
    #[serde(with = "hex_hash_opt", default)]
    pub prev_hash: Option<Hash>,
    #[serde(with = "hex_hash")]
    pub hash: Hash,
    pub nonce: u64,
}

impl Block {
    /// The deterministic genesis block every chain starts from.
    ///
    /// Timestamp is the Unix epoch and the Merkle root is the digest of
    /// [`GENESIS_MESSAGE`], so every node derives the identical block.
    /// Genesis is not mined.
    pub fn genesis() -> Self {
        let mut block = Block {
            index: 0,
            timestamp: DateTime::UNIX_EPOCH,
            merkle_root: sha256(GENESIS_MESSAGE),
            prev_hash: None,
            hash: [0u8; 32],
            nonce: 0,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Create an unsealed successor of `chain`'s last block.
    pub fn create(chain: &Blockchain, merkle_root: Hash) -> Self {
        let prev = chain.last_block();
        let mut block = Block {
            index: prev.index.saturating_add(1),
            timestamp: Utc::now(),
            merkle_root,
            prev_hash: Some(prev.hash),
            hash: [0u8; 32],
            nonce: 0,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// SHA-256 over `index || timestamp || nonce || merkle_root || prev_hash`.
    pub fn calculate_hash(&self) -> Hash {
        self.hash_with_nonce(self.nonce)
    }

    /// Same as [`calculate_hash`](Self::calculate_hash) with a substitute nonce.
    /// Miners call this in their hot loop.
    pub(crate) fn hash_with_nonce(&self, nonce: u64) -> Hash {
        let index = self.index.to_be_bytes();
        let secs = self.timestamp.timestamp().to_be_bytes();
        let nanos = self.timestamp.timestamp_subsec_nanos().to_be_bytes();
        let nonce = nonce.to_be_bytes();
        let prev: &[u8] = match &self.prev_hash {
            Some(h) => h,
            None => &[],
        };
        sha256_multi(&[
            &index[..],
            &secs[..],
            &nanos[..],
            &nonce[..],
            &self.merkle_root[..],
            prev,
        ])
    }

    /// Whether the stored hash is at or below the target for `difficulty`.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        meets_target(&self.hash, &target(difficulty))
    }

    /// Validate this block as the successor of `prev`.
    ///
    /// Checks, in order: stored hash matches the fields, `prev_hash` links to
    /// `prev`, the index is exactly one past `prev`, and the hash meets the
    /// difficulty target. Genesis has no predecessor; use
    /// [`verify_genesis`](Self::verify_genesis) for it.
    pub fn validate(&self, prev: &Block, difficulty: u32) -> Result<(), BlockError> {
        let computed = self.calculate_hash();
        if self.hash != computed {
            return Err(BlockError::HashMismatch {
                index: self.index,
                stored: hex::encode(self.hash),
                computed: hex::encode(computed),
            });
        }

        if self.prev_hash != Some(prev.hash) {
            return Err(BlockError::PrevHashMismatch {
                index: self.index,
                expected: prev.hash_hex(),
            });
        }

        if prev.index.checked_add(1) != Some(self.index) {
            return Err(BlockError::NonSequentialIndex {
                prev: prev.index,
                got: self.index,
            });
        }

        if !self.meets_difficulty(difficulty) {
            return Err(BlockError::InsufficientWork {
                index: self.index,
                difficulty,
            });
        }

        Ok(())
    }

    /// Boolean form of [`validate`](Self::validate).
    pub fn is_valid(&self, prev: &Block, difficulty: u32) -> bool {
        self.validate(prev, difficulty).is_ok()
    }

    /// Structural check for a chain's first block: index 0, no parent, and a
    /// hash consistent with its fields.
    pub fn verify_genesis(&self) -> Result<(), BlockError> {
        if self.index != 0 {
            return Err(BlockError::InvalidGenesis(format!(
                "index must be 0, got {}",
                self.index
            )));
        }
        if self.prev_hash.is_some() {
            return Err(BlockError::InvalidGenesis(
                "genesis must not reference a previous block".to_string(),
            ));
        }
        let computed = self.calculate_hash();
        if self.hash != computed {
            return Err(BlockError::HashMismatch {
                index: 0,
                stored: hex::encode(self.hash),
                computed: hex::encode(computed),
            });
        }
        Ok(())
    }

    /// Seal this block with a fresh [`Miner`] built from `config`.
    pub fn mine(&mut self, config: &MinerConfig) -> Result<MiningOutcome, MiningError> {
        Miner::new(config.clone()).mine(self)
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn merkle_root_hex(&self) -> String {
        hex::encode(self.merkle_root)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
