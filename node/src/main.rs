// Copyright (c) 2026 chainstore contributors. MIT License.
// See LICENSE for details.

//! # chainstore Node
//!
//! Entry point for the `chainstore-node` binary. Parses CLI arguments,
//! initializes logging, and runs one ledger command against a chain file.
//!
//! The binary supports these subcommands:
//!
//! - `init`    : write a genesis-only chain file
//! - `upload`  : chunk a file, mine a block for it, append and persist
//! - `validate`: fully verify a chain file
//! - `show`    : print the block table
//! - `prove`   : prove a chunk's inclusion against the on-chain root
//! - `version` : print build version information

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use chrono::SecondsFormat;
use clap::Parser;
use std::path::Path;
use tokio::signal;
use tracing::{info, warn};

use chainstore_protocol::config::{chunk_size_from_mb, PROTOCOL_ID, PROTOCOL_VERSION};
use chainstore_protocol::merkle::{verify_proof, MerkleTree};
use chainstore_protocol::mining::{Miner, MinerConfig, MiningOutcome};
use chainstore_protocol::storage::{chunk_file, Block, Blockchain};

use cli::{ChainstoreCli, Commands};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ChainstoreCli::parse();
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&cli.log_format),
    );

    match cli.command {
        Commands::Init(args) => init_chain(args),
        Commands::Upload(args) => upload(args).await,
        Commands::Validate(args) => validate(args),
        Commands::Show(args) => show(args),
        Commands::Prove(args) => prove(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Writes a chain file holding only the genesis block.
fn init_chain(args: cli::InitArgs) -> Result<()> {
    let path = &args.chain.chain;
    if path.exists() && !args.force {
        bail!(
            "chain file {} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let chain = Blockchain::with_genesis();
    chain
        .persist(path)
        .with_context(|| format!("failed to write chain file {}", path.display()))?;

    println!("Chain initialized.");
    println!("  Chain file : {}", path.display());
    println!("  Genesis    : {}", chain.genesis().hash_hex());
    Ok(())
}

/// Chunks a file, mines a block committing to its Merkle root, appends the
/// block and persists the chain.
async fn upload(args: cli::UploadArgs) -> Result<()> {
    let path = &args.chain.chain;
    let difficulty = args.difficulty.difficulty;

    let mut chain = load_or_genesis(path)?;
    chain
        .check_links()
        .with_context(|| format!("refusing to extend broken chain {}", path.display()))?;

    let chunk_size = chunk_size_from_mb(args.chunking.chunk_size_mb);
    let chunks = chunk_file(&args.file, chunk_size)
        .with_context(|| format!("failed to chunk {}", args.file.display()))?;
    let tree = MerkleTree::build(&chunks)
        .with_context(|| format!("{} is empty, nothing to upload", args.file.display()))?;
    info!(
        file = %args.file.display(),
        chunks = chunks.len(),
        chunk_size,
        merkle_root = %hex::encode(tree.root()),
        "file chunked"
    );
    // Release chunk buffers before the long mining run.
    drop(chunks);

    let miner = Miner::new(MinerConfig {
        difficulty,
        workers: args.workers,
        max_retries: args.retries,
        ..MinerConfig::default()
    });
    let block = Block::create(&chain, tree.root());
    let (block, outcome) = mine_until_interrupted(miner, block).await?;

    chain
        .add_block(block.clone(), difficulty)
        .context("mined block was rejected by the chain")?;
    chain
        .persist(path)
        .with_context(|| format!("failed to write chain file {}", path.display()))?;

    println!("Block {} appended.", block.index);
    println!("  Hash        : {}", block.hash_hex());
    println!("  Merkle root : {}", block.merkle_root_hex());
    println!("  Nonce       : {}", block.nonce);
    println!(
        "  Mined in    : {:.2?} ({} attempt(s), worker {})",
        outcome.elapsed, outcome.attempts, outcome.worker
    );
    Ok(())
}

/// Runs the CPU-bound search on the blocking pool. Ctrl+C or SIGTERM
/// cancels the miner and waits for its workers to wind down.
async fn mine_until_interrupted(miner: Miner, mut block: Block) -> Result<(Block, MiningOutcome)> {
    let cancel = miner.cancel_token();
    let task = tokio::task::spawn_blocking(move || {
        let result = miner.mine(&mut block);
        result.map(|outcome| (block, outcome))
    });

    let watcher = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("interrupt received, stopping miners");
        cancel.cancel();
    });
    let joined = task.await;
    watcher.abort();

    joined
        .context("mining task panicked")?
        .context("mining failed")
}

/// Loads the chain and runs linkage and full block verification.
fn validate(args: cli::ValidateArgs) -> Result<()> {
    let path = &args.chain.chain;
    let difficulty = args.difficulty.difficulty;
    let chain = load_chain(path)?;

    chain
        .check_links()
        .with_context(|| format!("chain {} is not linked", path.display()))?;
    chain
        .verify(difficulty)
        .with_context(|| format!("chain {} failed verification", path.display()))?;

    println!(
        "Chain valid: {} block(s), difficulty {}, tip {}",
        chain.len(),
        difficulty,
        chain.last_block().hash_hex()
    );
    Ok(())
}

fn show(args: cli::ChainArgs) -> Result<()> {
    let chain = load_chain(&args.chain)?;

    println!(
        "{:>6}  {:<24}  {:>12}  {:<16}  MERKLE ROOT",
        "INDEX", "TIMESTAMP", "NONCE", "HASH"
    );
    for block in &chain {
        println!(
            "{:>6}  {:<24}  {:>12}  {:<16}  {}",
            block.index,
            block.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            block.nonce,
            &block.hash_hex()[..16],
            block.merkle_root_hex()
        );
    }
    Ok(())
}

/// Re-chunks the file, finds the block that recorded its Merkle root, and
/// checks an inclusion proof for one chunk against that block.
fn prove(args: cli::ProveArgs) -> Result<()> {
    let chain = load_chain(&args.chain.chain)?;
    let chunks = chunk_file(&args.file, chunk_size_from_mb(args.chunking.chunk_size_mb))
        .with_context(|| format!("failed to chunk {}", args.file.display()))?;
    let tree = MerkleTree::build(&chunks)
        .with_context(|| format!("{} is empty", args.file.display()))?;

    let block = chain.get_by_merkle_root(&tree.root()).with_context(|| {
        format!(
            "no block records merkle root {} (was a different chunk size used?)",
            hex::encode(tree.root())
        )
    })?;
    let proof = tree
        .generate_proof(args.index)
        .with_context(|| format!("cannot prove chunk {}", args.index))?;

    if !verify_proof(&chunks[args.index], &block.merkle_root, &proof) {
        bail!(
            "chunk {} does not verify against block {}",
            args.index,
            block.index
        );
    }

    if args.json {
        let report = serde_json::json!({
            "blockIndex": block.index,
            "blockHash": block.hash_hex(),
            "merkleRoot": block.merkle_root_hex(),
            "chunkIndex": args.index,
            "proof": proof,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Chunk {} of {} verified against block {} ({} proof step(s)).",
            args.index,
            tree.leaf_count(),
            block.index,
            proof.len()
        );
        println!("  Merkle root : {}", block.merkle_root_hex());
    }
    Ok(())
}

fn load_chain(path: &Path) -> Result<Blockchain> {
    Blockchain::load(path).with_context(|| format!("failed to load chain from {}", path.display()))
}

/// Loads the chain at `path`, or starts a fresh genesis chain if the file
/// does not exist yet.
fn load_or_genesis(path: &Path) -> Result<Blockchain> {
    if path.exists() {
        load_chain(path)
    } else {
        info!(path = %path.display(), "no chain file yet, starting from genesis");
        Ok(Blockchain::with_genesis())
    }
}

/// Prints version information to stdout.
fn print_version() {
    println!("chainstore-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol        {} {}", PROTOCOL_ID, PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    use cli::{ChainArgs, ChunkingArgs, DifficultyArgs, InitArgs, ProveArgs, UploadArgs, ValidateArgs};

    fn chain_args(path: &Path) -> ChainArgs {
        ChainArgs {
            chain: path.to_path_buf(),
        }
    }

    fn upload_args(file: PathBuf, chain: &Path) -> UploadArgs {
        UploadArgs {
            file,
            chain: chain_args(chain),
            chunking: ChunkingArgs { chunk_size_mb: 1 },
            workers: 2,
            retries: 3,
            difficulty: DifficultyArgs { difficulty: 6 },
        }
    }

    #[test]
    fn init_refuses_to_clobber_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        let init = |force| InitArgs {
            chain: chain_args(&path),
            force,
        };

        init_chain(init(false)).unwrap();
        assert!(init_chain(init(false)).is_err());
        init_chain(init(true)).unwrap();
        assert_eq!(Blockchain::load(&path).unwrap().len(), 1);
    }

    #[test]
    fn missing_chain_starts_from_genesis() {
        let dir = tempfile::tempdir().unwrap();
        let chain = load_or_genesis(&dir.path().join("absent.json")).unwrap();
        assert_eq!(chain.len(), 1);
        assert!(load_chain(&dir.path().join("absent.json")).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upload_validate_and_prove() {
        let dir = tempfile::tempdir().unwrap();
        let chain_path = dir.path().join("storage").join("chain.json");
        let file = dir.path().join("data.bin");
        let data: Vec<u8> = (0..(2 * 1024 * 1024 + 10)).map(|i| (i % 7) as u8).collect();
        fs::write(&file, &data).unwrap();

        upload(upload_args(file.clone(), &chain_path)).await.unwrap();
        upload(upload_args(file.clone(), &chain_path)).await.unwrap();

        let chain = Blockchain::load(&chain_path).unwrap();
        assert_eq!(chain.len(), 3);

        validate(ValidateArgs {
            chain: chain_args(&chain_path),
            difficulty: DifficultyArgs { difficulty: 6 },
        })
        .unwrap();

        let prove_args = |index| ProveArgs {
            file: file.clone(),
            index,
            chain: chain_args(&chain_path),
            chunking: ChunkingArgs { chunk_size_mb: 1 },
            json: false,
        };
        prove(prove_args(2)).unwrap();
        assert!(prove(prove_args(3)).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_file_is_not_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let chain_path = dir.path().join("chain.json");
        let file = dir.path().join("empty.bin");
        fs::write(&file, b"").unwrap();

        assert!(upload(upload_args(file, &chain_path)).await.is_err());
        assert!(!chain_path.exists());
    }

    #[test]
    fn prove_fails_for_unrecorded_file() {
        let dir = tempfile::tempdir().unwrap();
        let chain_path = dir.path().join("chain.json");
        Blockchain::with_genesis().persist(&chain_path).unwrap();
        let file = dir.path().join("data.bin");
        fs::write(&file, b"never uploaded").unwrap();

        let result = prove(ProveArgs {
            file,
            index: 0,
            chain: chain_args(&chain_path),
            chunking: ChunkingArgs { chunk_size_mb: 1 },
            json: true,
        });
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_tampered_chain() {
        let dir = tempfile::tempdir().unwrap();
        let chain_path = dir.path().join("chain.json");
        let mut chain = Blockchain::with_genesis();
        let mut block = Block::create(&chain, [3u8; 32]);
        block
            .mine(&MinerConfig {
                difficulty: 6,
                workers: 1,
                ..MinerConfig::default()
            })
            .unwrap();
        block.nonce = block.nonce.wrapping_add(1);
        chain.append_unchecked(block);
        chain.persist(&chain_path).unwrap();

        let result = validate(ValidateArgs {
            chain: chain_args(&chain_path),
            difficulty: DifficultyArgs { difficulty: 6 },
        });
        assert!(result.is_err());
    }
}
