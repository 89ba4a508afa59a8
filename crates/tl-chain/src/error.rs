use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,

    #[error("block rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("corrupt ledger at block {index}: {reason}")]
    Corrupt { index: u64, reason: String },

    #[error("no proof of work found within {attempts} attempts")]
    ProofOfWorkTimeout { attempts: u64 },

    #[error("mining cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The check a candidate block failed when offered to [`crate::Ledger::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("previous_hash does not match the current tip")]
    StaleTip,

    #[error("index {got} does not follow tip index {tip}")]
    IndexMismatch { tip: u64, got: u64 },

    #[error("hash does not carry {0} leading zeros")]
    InsufficientWork(usize),

    #[error("proof does not match the recomputed block hash")]
    HashMismatch,
}

impl ChainError {
    pub(crate) fn corrupt(index: u64, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            index,
            reason: reason.into(),
        }
    }
}
