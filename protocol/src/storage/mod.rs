//! # Storage Module
//!
//! Everything that turns files into ledger entries and keeps the ledger on
//! disk.
//!
//! ## Architecture
//!
//! ```text
//! chunker.rs : File <-> fixed-size chunks
//! block.rs   : Block structure, genesis, hash and validity rules
//! chain.rs   : Ordered chain with hash / Merkle-root indices
//! persist.rs : JSON chain file, atomic writes
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! file ─► chunks ─► MerkleTree ─► Block ─► Miner ─► Blockchain ─► chain.json
//! ```

pub mod block;
pub mod chain;
pub mod chunker;
pub mod persist;

pub use block::{Block, BlockError, GENESIS_MESSAGE};
pub use chain::{Blockchain, ChainError};
pub use chunker::{build_file, chunk_bytes, chunk_file, ChunkError};
pub use persist::PersistError;
