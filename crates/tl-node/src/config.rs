use std::{path::PathBuf, time::Duration};

use tl_chain::{Miner, DEFAULT_DIFFICULTY, MAX_DIFFICULTY};

use crate::{error::NodeError, requeue::RequeuePolicy};

/// Default location of the chain file, relative to the working directory.
pub const DEFAULT_CHAIN_PATH: &str = "truthlink_chain.json";

/// Default cap on nonces tried per mining attempt.
pub const DEFAULT_MAX_ATTEMPTS: u64 = 50_000_000;

/// Full configuration for a [`crate::Node`].
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// JSON file the ledger is loaded from and saved to.
    pub chain_path: PathBuf,

    /// Leading `'0'` hex characters required of every mined block hash.
    pub difficulty: usize,

    /// Upper bound on nonces tried before a mining attempt gives up.
    /// `None` searches without limit.
    pub max_attempts: Option<u64>,

    /// Worker threads used for a single proof-of-work search.
    pub mining_threads: usize,

    /// Where claims go when mining them fails.
    pub requeue_policy: RequeuePolicy,

    /// If set, the host binary mines the oldest pending claim on this period.
    pub auto_mine_interval: Option<Duration>,

    /// When `true` the binary embedding this node should suppress log output.
    /// The library itself does not initialise a tracing subscriber.
    pub quiet: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain_path: PathBuf::from(DEFAULT_CHAIN_PATH),
            difficulty: DEFAULT_DIFFICULTY,
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            mining_threads: 1,
            requeue_policy: RequeuePolicy::default(),
            auto_mine_interval: None,
            quiet: false,
        }
    }
}

impl NodeConfig {
    /// Default config writing to `chain_path`.
    pub fn at_path(chain_path: impl Into<PathBuf>) -> Self {
        Self {
            chain_path: chain_path.into(),
            ..Self::default()
        }
    }

    /// Override the difficulty target.
    pub fn with_difficulty(mut self, difficulty: usize) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Reject settings no miner could ever satisfy.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(NodeError::Config(format!(
                "difficulty {} exceeds the {MAX_DIFFICULTY} hex characters of a block hash",
                self.difficulty
            )));
        }
        Ok(())
    }

    /// Build the [`Miner`] this configuration describes.
    pub fn miner(&self) -> Miner {
        Miner::new(self.difficulty)
            .with_max_attempts(self.max_attempts)
            .with_threads(self.mining_threads)
    }
}
