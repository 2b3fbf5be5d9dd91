//! # Protocol Configuration & Constants
//!
//! Every tunable number in chainstore lives here. The CLI exposes most of
//! them as flags; these are the defaults and the hard bounds.

// ---------------------------------------------------------------------------
// Protocol Identity
// ---------------------------------------------------------------------------

/// Stream protocol name peers advertise and dial on.
pub const PROTOCOL_ID: &str = "blockchain-storage";

/// Crate version, surfaced by `chainstore-node version`.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// SHA-256 output length in bytes.
pub const HASH_LENGTH: usize = 32;

/// Bit width of a block hash interpreted as an unsigned integer.
pub const HASH_BITS: u32 = 256;

// ---------------------------------------------------------------------------
// Chunking
// ---------------------------------------------------------------------------

/// Default chunk size in MiB for uploads.
pub const DEFAULT_CHUNK_SIZE_MB: u64 = 64;

/// Bytes per MiB.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// Mining
// ---------------------------------------------------------------------------

/// Default difficulty: number of leading zero bits a block hash must have.
/// 16 bits is ~65k hashes on average, well under a second on one core.
pub const DEFAULT_DIFFICULTY: u32 = 16;

/// Default number of parallel mining workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Upper bound on mining workers accepted by the CLI.
pub const MAX_WORKERS: usize = 12;

/// Default number of mining attempts before giving up.
pub const DEFAULT_RETRIES: u32 = 3;

/// Upper bound on mining attempts accepted by the CLI.
pub const MAX_RETRIES: u32 = 5;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Default location of the persisted chain, relative to the working directory.
pub const DEFAULT_CHAIN_PATH: &str = "storage/blockchain.json";

/// Converts a chunk size in MiB to bytes, saturating instead of overflowing.
pub fn chunk_size_from_mb(mb: u64) -> u64 {
    mb.saturating_mul(BYTES_PER_MB)
}
