use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("invalid claim: {0}")]
    Claim(#[from] tl_claim::ClaimError),

    #[error("ledger error: {0}")]
    Chain(#[from] tl_chain::ChainError),

    #[error("mining task failed: {0}")]
    MiningTask(#[from] tokio::task::JoinError),

    #[error("invalid configuration: {0}")]
    Config(String),
}
