//! # CLI Interface
//!
//! Defines the command-line argument structure for `chainstore-node` using
//! `clap` derive. Every flag can also be supplied through a `CHAINSTORE_*`
//! environment variable.

use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use chainstore_protocol::config::{
    DEFAULT_CHAIN_PATH, DEFAULT_CHUNK_SIZE_MB, DEFAULT_DIFFICULTY, DEFAULT_RETRIES,
    DEFAULT_WORKERS, MAX_RETRIES, MAX_WORKERS,
};

/// chainstore storage node.
///
/// Splits files into chunks, commits to them with a Merkle tree, and records
/// each upload in a proof-of-work blockchain kept as a JSON file.
#[derive(Parser, Debug)]
#[command(
    name = "chainstore-node",
    about = "Content-addressed storage ledger node",
    version,
    propagate_version = true
)]
pub struct ChainstoreCli {
    /// Log output format: `pretty` or `json`.
    #[arg(
        long,
        global = true,
        env = "CHAINSTORE_LOG_FORMAT",
        default_value = "pretty"
    )]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a chain file containing only the genesis block.
    Init(InitArgs),
    /// Chunk a file, mine a block for its Merkle root, and append it.
    Upload(UploadArgs),
    /// Load the chain file and verify every block.
    Validate(ValidateArgs),
    /// Print the blocks in the chain file.
    Show(ChainArgs),
    /// Prove that one chunk of a file belongs to an upload on the chain.
    Prove(ProveArgs),
    /// Print version information and exit.
    Version,
}

/// Location of the chain file.
#[derive(Args, Debug, Clone)]
pub struct ChainArgs {
    #[arg(long, env = "CHAINSTORE_CHAIN", default_value = DEFAULT_CHAIN_PATH)]
    pub chain: PathBuf,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub chain: ChainArgs,

    /// Overwrite an existing chain file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// File to upload.
    pub file: PathBuf,

    #[command(flatten)]
    pub chain: ChainArgs,

    #[command(flatten)]
    pub chunking: ChunkingArgs,

    /// Number of parallel mining threads.
    #[arg(
        long,
        short = 'w',
        env = "CHAINSTORE_WORKERS",
        default_value_t = DEFAULT_WORKERS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_WORKERS as u64)
    )]
    pub workers: usize,

    /// Mining attempts before giving up.
    #[arg(
        long,
        short = 'r',
        env = "CHAINSTORE_RETRIES",
        default_value_t = DEFAULT_RETRIES,
        value_parser = clap::value_parser!(u32).range(1..=MAX_RETRIES as i64)
    )]
    pub retries: u32,

    #[command(flatten)]
    pub difficulty: DifficultyArgs,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub chain: ChainArgs,

    #[command(flatten)]
    pub difficulty: DifficultyArgs,
}

#[derive(Args, Debug)]
pub struct ProveArgs {
    /// The uploaded file.
    pub file: PathBuf,

    /// Zero-based chunk index to prove.
    #[arg(long, short = 'i')]
    pub index: usize,

    #[command(flatten)]
    pub chain: ChainArgs,

    #[command(flatten)]
    pub chunking: ChunkingArgs,

    /// Print the proof as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ChunkingArgs {
    /// Chunk size in megabytes. Must match the size used at upload time.
    #[arg(
        long,
        env = "CHAINSTORE_CHUNK_SIZE_MB",
        default_value_t = DEFAULT_CHUNK_SIZE_MB,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub chunk_size_mb: u64,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct DifficultyArgs {
    /// Required leading zero bits in block hashes.
    #[arg(
        long,
        short = 'd',
        env = "CHAINSTORE_DIFFICULTY",
        default_value_t = DEFAULT_DIFFICULTY,
        value_parser = clap::value_parser!(u32).range(0..=256)
    )]
    pub difficulty: u32,
}
