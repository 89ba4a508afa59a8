pub mod block;
pub mod error;
pub mod ledger;
pub mod miner;
pub mod store;

pub use block::Block;
pub use error::{ChainError, Rejection};
pub use ledger::Ledger;
pub use miner::{meets_difficulty, Miner, Proof};
pub use store::{ChainStore, JsonFileStore, MemoryStore};

/// Number of leading `'0'` hex characters a block hash must carry to be
/// accepted, unless a ledger is configured otherwise.
pub const DEFAULT_DIFFICULTY: usize = 3;

/// Length of a hex-encoded SHA-256 digest; no hash can carry more zeros.
pub const MAX_DIFFICULTY: usize = 64;

/// `previous_hash` recorded by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";
