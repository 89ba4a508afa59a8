use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use tracing::debug;

use crate::{Block, ChainError, Rejection, DEFAULT_DIFFICULTY};

/// Returns `true` when `hash` starts with at least `difficulty` `'0'` characters.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// A nonce whose block hash meets the difficulty target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    pub nonce: u64,
    pub hash: String,
    /// Hashes computed across all workers before the search stopped.
    pub attempts: u64,
}

/// Brute-force proof-of-work search over a candidate block's nonce.
#[derive(Debug, Clone)]
pub struct Miner {
    difficulty: usize,
    max_attempts: Option<u64>,
    threads: usize,
}

impl Default for Miner {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl Miner {
    /// Single-threaded, unbounded miner.
    pub fn new(difficulty: usize) -> Self {
        Self {
            difficulty,
            max_attempts: None,
            threads: 1,
        }
    }

    /// Restrict the search to nonces in `[0, max)`.  `None` removes the cap.
    pub fn with_max_attempts(mut self, max_attempts: Option<u64>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Split the nonce space across `threads` workers (minimum 1).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Search for a nonce that makes `candidate` meet the difficulty target.
    ///
    /// On success `candidate` carries the winning nonce and hash.  Setting
    /// `cancel` aborts the search with [`ChainError::Cancelled`]; exhausting
    /// the attempt cap yields [`ChainError::ProofOfWorkTimeout`].
    pub fn search(&self, candidate: &mut Block, cancel: &AtomicBool) -> Result<Proof, ChainError> {
        let limit = self.max_attempts.unwrap_or(u64::MAX);
        let found = AtomicBool::new(false);

        let outcome: Vec<WorkerResult> = if self.threads == 1 {
            vec![search_stride(candidate, 0, 1, limit, self.difficulty, &found, cancel)]
        } else {
            let stride = self.threads as u64;
            thread::scope(|scope| {
                let workers: Vec<_> = (0..stride)
                    .map(|start| {
                        let block = candidate.clone();
                        let found = &found;
                        scope.spawn(move || {
                            search_stride(&block, start, stride, limit, self.difficulty, found, cancel)
                        })
                    })
                    .collect();
                workers
                    .into_iter()
                    .filter_map(|worker| worker.join().ok())
                    .collect()
            })
        };

        let attempts = outcome.iter().map(|w| w.attempts).sum();
        let winner = outcome.iter().filter_map(|w| w.nonce).min();

        let Some(nonce) = winner else {
            if cancel.load(Ordering::Relaxed) {
                return Err(ChainError::Cancelled);
            }
            return Err(ChainError::ProofOfWorkTimeout { attempts });
        };

        candidate.set_nonce(nonce);
        if !meets_difficulty(&candidate.hash, self.difficulty) {
            return Err(Rejection::InsufficientWork(self.difficulty).into());
        }

        debug!(
            index = candidate.index,
            nonce,
            attempts,
            hash = %candidate.hash,
            "Proof of work found"
        );

        Ok(Proof {
            nonce,
            hash: candidate.hash.clone(),
            attempts,
        })
    }
}

struct WorkerResult {
    nonce: Option<u64>,
    attempts: u64,
}

/// Try nonces `start, start + stride, ...` below `limit` until a hash meets
/// `difficulty`, another worker wins, or the search is cancelled.
fn search_stride(
    template: &Block,
    start: u64,
    stride: u64,
    limit: u64,
    difficulty: usize,
    found: &AtomicBool,
    cancel: &AtomicBool,
) -> WorkerResult {
    let mut block = template.clone();
    let mut attempts = 0;
    let mut nonce = start;

    while nonce < limit {
        if found.load(Ordering::Relaxed) || cancel.load(Ordering::Relaxed) {
            break;
        }
        block.nonce = nonce;
        attempts += 1;
        if meets_difficulty(&block.compute_hash(), difficulty) {
            found.store(true, Ordering::Relaxed);
            return WorkerResult {
                nonce: Some(nonce),
                attempts,
            };
        }
        nonce = match nonce.checked_add(stride) {
            Some(next) => next,
            None => break,
        };
    }

    WorkerResult {
        nonce: None,
        attempts,
    }
}
