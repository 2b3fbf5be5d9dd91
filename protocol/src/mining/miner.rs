//! # Proof-of-Work Miner
//!
//! Finds a nonce that puts a block's hash at or below the difficulty target.
//!
//! ## Attempt
//!
//! ```text
//!            ┌─ worker 0: nonce 0, W, 2W, ...  ─┐
//! block ──►  ├─ worker 1: nonce 1, W+1, ...    ─┼──► mpsc ──► first Found wins
//!            └─ worker W-1: ...                ─┘            cancel the rest
//! ```
//!
//! Every worker runs on its own OS thread with a private copy of the block.
//! Worker `i` starts at nonce `i` and steps by the worker count `W`, so the
//! nonce space is partitioned and no nonce is hashed twice. A worker that
//! would step past `nonce_limit` (or overflow `u64`) reports `Exhausted`.
//!
//! The first `Found` report settles the attempt. The attempt's cancellation
//! token is then cancelled and the remaining workers are joined; each checks
//! the token before every hash, so they stop within one hash computation.
//! The race is deliberate: the winning nonce is whichever arrives first, not
//! the smallest.
//!
//! ## Retries
//!
//! If every worker exhausts its range, the block's timestamp is moved to the
//! current time, which changes the hash domain, and a fresh attempt starts.
//! After `max_retries` exhausted attempts mining fails with
//! [`MiningError::Exhausted`] and the block stays unsealed.
//!
//! ## Cancellation
//!
//! Each [`Miner`] owns a root [`CancellationToken`]. Cancelling it (from any
//! thread or task) stops the current attempt and makes `mine` return
//! [`MiningError::Cancelled`]. A cancelled miner stays cancelled.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use primitive_types::U256;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_DIFFICULTY, DEFAULT_RETRIES, DEFAULT_WORKERS};
use crate::crypto::Hash;
use crate::mining::target::{hash_to_u256, target};
use crate::storage::block::Block;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Parameters for a mining run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerConfig {
    /// Required leading zero bits.
    pub difficulty: u32,
    /// Number of parallel worker threads per attempt.
    pub workers: usize,
    /// Total attempts (first try included) before giving up.
    pub max_retries: u32,
    /// Highest nonce any worker may try. `u64::MAX` searches the full range.
    pub nonce_limit: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            workers: DEFAULT_WORKERS,
            max_retries: DEFAULT_RETRIES,
            nonce_limit: u64::MAX,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors & Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MiningError {
    #[error("mining requires at least one worker")]
    NoWorkers,

    #[error("mining requires at least one attempt")]
    NoAttempts,

    /// Every attempt ended with all workers out of nonces.
    #[error("failed to mine block after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("mining cancelled")]
    Cancelled,

    #[error("failed to spawn mining worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// A worker thread died without reporting (it panicked).
    #[error("mining worker terminated without reporting")]
    WorkerLost,
}

/// What a successful `mine` call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningOutcome {
    pub nonce: u64,
    pub hash: Hash,
    /// Index of the worker that found the nonce.
    pub worker: usize,
    /// Attempt number that succeeded (1-based).
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Message a worker sends when it stops.
#[derive(Debug)]
enum WorkerReport {
    Found { worker: usize, nonce: u64, hash: Hash },
    Exhausted,
    Cancelled,
}

enum Attempt {
    Found { worker: usize, nonce: u64, hash: Hash },
    Exhausted,
    Cancelled,
}

// ---------------------------------------------------------------------------
// Miner
// ---------------------------------------------------------------------------

/// Stateless proof-of-work engine. Holds only its configuration and a
/// cancellation token.
#[derive(Debug, Clone)]
pub struct Miner {
    config: MinerConfig,
    cancel: CancellationToken,
}

impl Miner {
    pub fn new(config: MinerConfig) -> Self {
        Self::with_cancel_token(config, CancellationToken::new())
    }

    /// Build a miner that stops when `cancel` (or any parent of it) is cancelled.
    pub fn with_cancel_token(config: MinerConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Handle for stopping this miner from another thread or task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Seal `block` by finding a nonce whose hash meets the configured target.
    ///
    /// Blocks the calling thread until a nonce is found, the retry budget is
    /// spent, or the miner is cancelled. On success `block.nonce` and
    /// `block.hash` hold the winning values. On failure the block is left
    /// unsealed, though its timestamp (and consistent hash) may have been
    /// advanced by retries.
    pub fn mine(&self, block: &mut Block) -> Result<MiningOutcome, MiningError> {
        if self.config.workers == 0 {
            return Err(MiningError::NoWorkers);
        }
        if self.config.max_retries == 0 {
            return Err(MiningError::NoAttempts);
        }

        let target = target(self.config.difficulty);
        let started = Instant::now();

        for attempt in 1..=self.config.max_retries {
            if self.cancel.is_cancelled() {
                return Err(MiningError::Cancelled);
            }

            debug!(
                index = block.index,
                attempt,
                workers = self.config.workers,
                difficulty = self.config.difficulty,
                "starting mining attempt"
            );

            match self.run_attempt(block, &target)? {
                Attempt::Found {
                    worker,
                    nonce,
                    hash,
                } => {
                    block.nonce = nonce;
                    block.hash = hash;
                    let outcome = MiningOutcome {
                        nonce,
                        hash,
                        worker,
                        attempts: attempt,
                        elapsed: started.elapsed(),
                    };
                    info!(
                        index = block.index,
                        nonce,
                        worker,
                        attempts = attempt,
                        elapsed_ms = outcome.elapsed.as_millis() as u64,
                        hash = %block.hash_hex(),
                        "block mined"
                    );
                    return Ok(outcome);
                }
                Attempt::Exhausted => {
                    warn!(
                        index = block.index,
                        attempt,
                        max_retries = self.config.max_retries,
                        "all mining workers exhausted their nonce range, advancing timestamp"
                    );
                    block.timestamp = Utc::now();
                    block.hash = block.calculate_hash();
                }
                Attempt::Cancelled => return Err(MiningError::Cancelled),
            }
        }

        Err(MiningError::Exhausted {
            attempts: self.config.max_retries,
        })
    }

    /// One race between `workers` threads over a snapshot of `block`.
    fn run_attempt(&self, block: &Block, target: &U256) -> Result<Attempt, MiningError> {
        let workers = self.config.workers;
        let step = workers as u64;
        let attempt_token = self.cancel.child_token();
        let (tx, rx) = mpsc::channel();
        let mut handles = Vec::with_capacity(workers);

        for worker in 0..workers {
            let candidate = block.clone();
            // A token per worker keeps the per-hash cancellation check uncontended.
            let token = attempt_token.child_token();
            let tx = tx.clone();
            let target = *target;
            let limit = self.config.nonce_limit;

            let spawned = thread::Builder::new()
                .name(format!("miner-{worker}"))
                .spawn(move || {
                    let report = search(&candidate, worker, step, limit, &target, &token);
                    // The receiver is gone once a winner has been picked.
                    let _ = tx.send(report);
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    attempt_token.cancel();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(MiningError::Spawn(e));
                }
            }
        }
        drop(tx);

        let mut exhausted = 0usize;
        let mut stopped = 0usize;
        let result = loop {
            match rx.recv() {
                Ok(WorkerReport::Found {
                    worker,
                    nonce,
                    hash,
                }) => {
                    break Ok(Attempt::Found {
                        worker,
                        nonce,
                        hash,
                    })
                }
                Ok(WorkerReport::Exhausted) => {
                    exhausted += 1;
                    stopped += 1;
                }
                Ok(WorkerReport::Cancelled) => stopped += 1,
                Err(_) => break Err(MiningError::WorkerLost),
            }
            if stopped == workers {
                break Ok(if exhausted == workers {
                    Attempt::Exhausted
                } else {
                    Attempt::Cancelled
                });
            }
        };

        attempt_token.cancel();
        for handle in handles {
            if handle.join().is_err() {
                warn!("mining worker panicked");
            }
        }
        result
    }
}

/// A single worker's search loop over `start, start + step, ...` up to `limit`.
fn search(
    block: &Block,
    worker: usize,
    step: u64,
    limit: u64,
    target: &U256,
    cancel: &CancellationToken,
) -> WorkerReport {
    let mut nonce = worker as u64;
    if nonce > limit {
        return WorkerReport::Exhausted;
    }

    loop {
        if cancel.is_cancelled() {
            return WorkerReport::Cancelled;
        }

        let hash = block.hash_with_nonce(nonce);
        if hash_to_u256(&hash) <= *target {
            return WorkerReport::Found {
                worker,
                nonce,
                hash,
            };
        }

        match nonce.checked_add(step) {
            Some(next) if next <= limit => nonce = next,
            _ => {
                debug!(worker, last_nonce = nonce, "mining worker exhausted");
                return WorkerReport::Exhausted;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;
    use crate::mining::target::meets_target;
    use crate::storage::chain::Blockchain;

    fn candidate() -> Block {
        let chain = Blockchain::new(Block::genesis()).unwrap();
        Block::create(&chain, sha256(b"file root"))
    }

    fn config(difficulty: u32, workers: usize, max_retries: u32) -> MinerConfig {
        MinerConfig {
            difficulty,
            workers,
            max_retries,
            nonce_limit: u64::MAX,
        }
    }

    #[test]
    fn mined_hash_meets_target() {
        let mut block = candidate();
        let outcome = Miner::new(config(12, 2, 1)).mine(&mut block).unwrap();

        assert!(meets_target(&block.hash, &target(12)));
        assert_eq!(block.hash, block.calculate_hash());
        assert_eq!(block.nonce, outcome.nonce);
        assert_eq!(block.hash, outcome.hash);
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn winning_nonce_belongs_to_winning_worker() {
        let mut block = candidate();
        let outcome = Miner::new(config(10, 3, 1)).mine(&mut block).unwrap();
        assert_eq!(outcome.nonce % 3, outcome.worker as u64);
    }

    #[test]
    fn different_worker_counts_both_succeed() {
        let base = candidate();

        let mut a = base.clone();
        Miner::new(config(10, 1, 1)).mine(&mut a).unwrap();
        let mut b = base.clone();
        Miner::new(config(10, 7, 1)).mine(&mut b).unwrap();

        assert!(a.meets_difficulty(10));
        assert!(b.meets_difficulty(10));
        assert_eq!(a.calculate_hash(), a.hash);
        assert_eq!(b.calculate_hash(), b.hash);
    }

    #[test]
    fn zero_difficulty_accepts_first_nonce() {
        let mut block = candidate();
        let outcome = Miner::new(config(0, 1, 1)).mine(&mut block).unwrap();
        assert_eq!(outcome.nonce, 0);
    }

    #[test]
    fn exhaustion_after_retry_budget() {
        let mut block = candidate();
        let original_timestamp = block.timestamp;
        let cfg = MinerConfig {
            difficulty: 256,
            workers: 4,
            max_retries: 3,
            nonce_limit: 50,
        };

        let err = Miner::new(cfg).mine(&mut block).unwrap_err();
        assert!(matches!(err, MiningError::Exhausted { attempts: 3 }));

        // Retries moved the timestamp; the block is consistent but unsealed.
        assert!(block.timestamp >= original_timestamp);
        assert_eq!(block.nonce, 0);
        assert_eq!(block.hash, block.calculate_hash());
        assert!(!block.meets_difficulty(256));
    }

    #[test]
    fn worker_past_limit_reports_exhausted() {
        let block = candidate();
        let token = CancellationToken::new();
        let report = search(&block, 5, 8, 3, &U256::zero(), &token);
        assert!(matches!(report, WorkerReport::Exhausted));
    }

    #[test]
    fn nonce_overflow_is_exhaustion() {
        let block = candidate();
        let token = CancellationToken::new();
        // Stepping from nonce 1 by u64::MAX overflows, so the worker stops
        // after a single hash instead of wrapping around.
        let report = search(&block, 1, u64::MAX, u64::MAX, &U256::zero(), &token);
        assert!(matches!(report, WorkerReport::Exhausted));
    }

    #[test]
    fn cancelled_worker_stops() {
        let block = candidate();
        let token = CancellationToken::new();
        token.cancel();
        let report = search(&block, 0, 1, u64::MAX, &U256::zero(), &token);
        assert!(matches!(report, WorkerReport::Cancelled));
    }

    #[test]
    fn cancelled_miner_refuses_to_start() {
        let mut block = candidate();
        let miner = Miner::new(config(8, 2, 1));
        miner.cancel_token().cancel();
        assert!(matches!(miner.mine(&mut block), Err(MiningError::Cancelled)));
        assert_eq!(block.nonce, 0);
    }

    #[test]
    fn cancel_from_another_thread_stops_mining() {
        let mut block = candidate();
        // Target zero: only an all-zero hash qualifies, so this never finishes on its own.
        let miner = Miner::new(config(256, 2, 1));
        let token = miner.cancel_token();

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            token.cancel();
        });

        let result = miner.mine(&mut block);
        canceller.join().unwrap();
        assert!(matches!(result, Err(MiningError::Cancelled)));
    }

    #[test]
    fn parent_token_cancels_miner() {
        let parent = CancellationToken::new();
        let miner = Miner::with_cancel_token(config(8, 1, 1), parent.child_token());
        parent.cancel();
        assert!(miner.cancel_token().is_cancelled());
    }

    #[test]
    fn invalid_configs_rejected() {
        let mut block = candidate();
        assert!(matches!(
            Miner::new(config(8, 0, 1)).mine(&mut block),
            Err(MiningError::NoWorkers)
        ));
        assert!(matches!(
            Miner::new(config(8, 1, 0)).mine(&mut block),
            Err(MiningError::NoAttempts)
        ));
    }
}
