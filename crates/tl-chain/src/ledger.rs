use std::fmt;

use tl_claim::Claim;
use tracing::info;

use crate::{
    block::Block,
    error::{ChainError, Rejection},
    miner::meets_difficulty,
    store::ChainStore,
};

/// The append-only sequence of [`Block`]s that makes up the TruthLink ledger.
///
/// Invariants maintained by this type:
/// - Always starts with the fixed genesis block.
/// - Every block's `previous_hash` matches the hash of the preceding block.
/// - Block indices are contiguous starting from 0.
/// - Every non-genesis block's hash meets the difficulty target.
pub struct Ledger {
    blocks: Vec<Block>,
    difficulty: usize,
    store: Box<dyn ChainStore>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("len", &self.blocks.len())
            .field("difficulty", &self.difficulty)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Initialise a genesis-only ledger backed by `store`.
    ///
    /// Nothing is written until the first block is appended.
    pub fn new(store: Box<dyn ChainStore>, difficulty: usize) -> Self {
        Self {
            blocks: vec![Block::genesis()],
            difficulty,
            store,
        }
    }

    /// Restore the ledger from `store`, re-verifying every block.
    ///
    /// An empty store yields a genesis-only ledger.  Any block whose hash,
    /// linkage, index or proof of work does not check out fails with
    /// [`ChainError::Corrupt`].
    pub fn load(store: Box<dyn ChainStore>, difficulty: usize) -> Result<Self, ChainError> {
        let Some(blocks) = store.load()? else {
            info!("No stored chain found, starting from genesis");
            return Ok(Self::new(store, difficulty));
        };

        verify_chain(&blocks, difficulty)?;
        info!(blocks = blocks.len(), "Loaded and verified chain");

        Ok(Self {
            blocks,
            difficulty,
            store,
        })
    }

    /// Number of blocks in the chain (including genesis).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always `false` for a well-formed ledger.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The most recent block.
    pub fn tip(&self) -> Result<&Block, ChainError> {
        self.blocks.last().ok_or(ChainError::Empty)
    }

    /// Build an unmined candidate on top of the current tip.
    pub fn candidate(&self, claim: Claim) -> Result<Block, ChainError> {
        let tip = self.tip()?;
        Ok(Block::new(tip.index + 1, tip.hash.clone(), claim))
    }

    /// Append `candidate` if it extends the tip and `proof` is its genuine,
    /// sufficiently difficult hash, then persist the chain.
    ///
    /// Nothing changes on failure; if persisting fails the block is removed
    /// again before the error is returned.
    pub fn append(&mut self, candidate: Block, proof: &str) -> Result<&Block, ChainError> {
        let tip = self.tip()?;
        if candidate.previous_hash != tip.hash {
            return Err(Rejection::StaleTip.into());
        }
        if candidate.index != tip.index + 1 {
            return Err(Rejection::IndexMismatch {
                tip: tip.index,
                got: candidate.index,
            }
            .into());
        }
        if !meets_difficulty(proof, self.difficulty) {
            return Err(Rejection::InsufficientWork(self.difficulty).into());
        }
        if proof != candidate.compute_hash() {
            return Err(Rejection::HashMismatch.into());
        }

        let mut block = candidate;
        block.hash = proof.to_string();
        self.blocks.push(block);

        if let Err(e) = self.store.save(&self.blocks) {
            self.blocks.pop();
            return Err(e);
        }

        let block = self.tip()?;
        info!(index = block.index, hash = %block.hash, "Appended block");
        Ok(block)
    }

    /// All blocks in the chain.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Re-run the full integrity check over the in-memory chain.
    pub fn validate(&self) -> Result<(), ChainError> {
        verify_chain(&self.blocks, self.difficulty)
    }
}

/// Check a block sequence from scratch without trusting any stored hash.
pub fn verify_chain(blocks: &[Block], difficulty: usize) -> Result<(), ChainError> {
    let genesis = blocks
        .first()
        .ok_or_else(|| ChainError::corrupt(0, "chain has no genesis block"))?;
    if !genesis.is_genesis() {
        return Err(ChainError::corrupt(0, "genesis block does not match the sentinel"));
    }

    for (position, block) in blocks.iter().enumerate() {
        if block.index != position as u64 {
            return Err(ChainError::corrupt(
                block.index,
                format!("found at position {position}"),
            ));
        }
        if !block.has_valid_hash() {
            return Err(ChainError::corrupt(
                block.index,
                "stored hash does not match block contents",
            ));
        }
    }

    for window in blocks.windows(2) {
        let (prev, next) = (&window[0], &window[1]);
        if next.previous_hash != prev.hash {
            return Err(ChainError::corrupt(
                next.index,
                "previous_hash does not match predecessor",
            ));
        }
        if !meets_difficulty(&next.hash, difficulty) {
            return Err(ChainError::corrupt(
                next.index,
                format!("hash does not carry {difficulty} leading zeros"),
            ));
        }
    }

    Ok(())
}
