// Copyright (c) 2026 chainstore contributors. MIT License.
// See LICENSE for details.

//! # chainstore Core Library
//!
//! A content-addressed storage ledger. Files are split into fixed-size
//! chunks, the chunks are committed to with a SHA-256 Merkle tree, and each
//! upload's Merkle root is recorded in a proof-of-work blockchain.
//!
//! ## Architecture
//!
//! - **crypto**: SHA-256 helpers and hex serde adapters.
//! - **merkle**: Merkle tree construction and inclusion proofs.
//! - **mining**: Difficulty targets and the multi-threaded nonce search.
//! - **storage**: Chunker, blocks, the chain and its JSON persistence.
//! - **network**: Peer wire messages and the peer registry.
//! - **config**: Protocol constants and defaults.
//!
//! ## Quick Tour
//!
//! ```no_run
//! use chainstore_protocol::merkle::MerkleTree;
//! use chainstore_protocol::mining::MinerConfig;
//! use chainstore_protocol::storage::{chunk_file, Block, Blockchain};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let chunks = chunk_file("upload.bin", 64 * 1024 * 1024)?;
//! let tree = MerkleTree::build(&chunks)?;
//!
//! let mut chain = Blockchain::with_genesis();
//! let mut block = Block::create(&chain, tree.root());
//! block.mine(&MinerConfig::default())?;
//! chain.add_block(block, MinerConfig::default().difficulty)?;
//! chain.persist("storage/blockchain.json")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod merkle;
pub mod mining;
pub mod network;
pub mod storage;
