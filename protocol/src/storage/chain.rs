//! In-memory chain management with validation.
//!
//! The chain is an ordered `Vec<Block>` plus two lookup indices (block hash
//! and Merkle root, both hex-keyed) pointing into it. The indices are derived
//! data: every append updates both, and loading from disk rebuilds them.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use super::block::{Block, BlockError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("block rejected: {0}")]
    InvalidBlock(#[from] BlockError),

    #[error("chain broken between blocks {prev} and {next}")]
    BrokenLink { prev: u64, next: u64 },
}

/// Ordered chain of sealed blocks, rooted at a genesis block.
///
/// A `Blockchain` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blockchain {
    blocks: Vec<Block>,
    by_hash: HashMap<String, usize>,
    by_merkle_root: HashMap<String, usize>,
}

impl Blockchain {
    /// Start a chain from `genesis`, which must pass [`Block::verify_genesis`].
    pub fn new(genesis: Block) -> Result<Self, ChainError> {
        genesis.verify_genesis()?;
        let mut chain = Self::empty();
        chain.append_unchecked(genesis);
        Ok(chain)
    }

    /// A chain holding only the well-known [`Block::genesis`].
    pub fn with_genesis() -> Self {
        let mut chain = Self::empty();
        chain.append_unchecked(Block::genesis());
        chain
    }

    /// Rebuild a chain (and both indices) from an already ordered sequence.
    /// Returns `None` for an empty sequence.
    pub(crate) fn from_blocks(blocks: Vec<Block>) -> Option<Self> {
        if blocks.is_empty() {
            return None;
        }
        let mut chain = Self::empty();
        chain.blocks.reserve(blocks.len());
        for block in blocks {
            chain.append_unchecked(block);
        }
        Some(chain)
    }

    fn empty() -> Self {
        Self {
            blocks: Vec::new(),
            by_hash: HashMap::new(),
            by_merkle_root: HashMap::new(),
        }
    }

    /// Validate `block` against the current tip and append it.
    ///
    /// The chain is unchanged if validation fails.
    pub fn add_block(&mut self, block: Block, difficulty: u32) -> Result<(), ChainError> {
        block.validate(self.last_block(), difficulty)?;
        debug!(index = block.index, hash = %block.hash_hex(), "block appended");
        self.append_unchecked(block);
        Ok(())
    }

    /// Append without validation. Meant for replaying blocks that were
    /// already validated, e.g. when loading a persisted chain.
    pub fn append_unchecked(&mut self, block: Block) {
        let position = self.blocks.len();
        self.by_hash.insert(block.hash_hex(), position);
        // A re-uploaded file points the root index at its newest block.
        self.by_merkle_root.insert(block.merkle_root_hex(), position);
        self.blocks.push(block);
    }

    pub fn get_by_hash(&self, hash: &[u8]) -> Option<&Block> {
        self.by_hash
            .get(&hex::encode(hash))
            .map(|&position| &self.blocks[position])
    }

    pub fn get_by_merkle_root(&self, merkle_root: &[u8]) -> Option<&Block> {
        self.by_merkle_root
            .get(&hex::encode(merkle_root))
            .map(|&position| &self.blocks[position])
    }

    /// The chain tip.
    pub fn last_block(&self) -> &Block {
        // Every constructor seeds at least one block and nothing removes them.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Check hash linkage and index sequence for every adjacent pair.
    ///
    /// Does not re-hash blocks or check proof of work; see [`verify`](Self::verify).
    pub fn validate_chain(&self) -> bool {
        self.first_broken_link().is_none()
    }

    /// Full verification: genesis integrity, then [`Block::validate`] for
    /// every block against its predecessor at `difficulty`.
    pub fn verify(&self, difficulty: u32) -> Result<(), ChainError> {
        self.genesis().verify_genesis()?;
        for pair in self.blocks.windows(2) {
            pair[1].validate(&pair[0], difficulty)?;
        }
        Ok(())
    }

    fn first_broken_link(&self) -> Option<ChainError> {
        self.blocks.windows(2).find_map(|pair| {
            let (prev, next) = (&pair[0], &pair[1]);
            let linked = next.prev_hash == Some(prev.hash)
                && prev.index.checked_add(1) == Some(next.index);
            (!linked).then(|| ChainError::BrokenLink {
                prev: prev.index,
                next: next.index,
            })
        })
    }

    /// Like [`validate_chain`](Self::validate_chain) but reports where the
    /// chain breaks.
    pub fn check_links(&self) -> Result<(), ChainError> {
        match self.first_broken_link() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::with_genesis()
    }
}

impl<'a> IntoIterator for &'a Blockchain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
