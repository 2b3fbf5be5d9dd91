//! # Mining Module
//!
//! Proof of work for sealing blocks.
//!
//! ```text
//! target.rs: difficulty (leading zero bits) -> 256-bit numeric target
//! miner.rs : multi-threaded nonce search with cancellation and retries
//! ```

pub mod miner;
pub mod target;

pub use miner::{Miner, MinerConfig, MiningError, MiningOutcome};
pub use target::{hash_to_u256, meets_target, target};
