use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tl_claim::{Claim, ValidationLevel};

use crate::GENESIS_PREVIOUS_HASH;

/// A single mined claim and its position in the TruthLink ledger.
///
/// `hash` is a cache of [`Block::compute_hash`].  Whenever integrity matters
/// (loading from disk, appending to the ledger) it is recomputed and compared
/// rather than trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (genesis = 0).
    pub index: u64,

    /// Unix timestamp (seconds) when the candidate was built.
    pub timestamp: i64,

    /// Identifier of the claim this block absorbed; `"GENESIS"` for the root.
    pub claim_id: String,

    pub statement: String,
    pub sources: Vec<String>,
    pub validation_level: ValidationLevel,
    pub ai_opinion: String,
    pub validator_signature: String,

    /// Hex hash of the preceding block, or `"0"` for genesis.
    pub previous_hash: String,

    /// Proof-of-work counter.  Only the miner changes it.
    pub nonce: u64,

    /// Hex-encoded SHA-256 digest of every other field.
    pub hash: String,
}

impl Block {
    /// Build an unmined candidate (`nonce = 0`) that absorbs `claim`.
    pub fn new(index: u64, previous_hash: String, claim: Claim) -> Self {
        let mut block = Self {
            index,
            timestamp: Utc::now().timestamp(),
            claim_id: claim.claim_id.to_string(),
            statement: claim.statement,
            sources: claim.sources,
            validation_level: claim.validation_level,
            ai_opinion: claim.ai_opinion,
            validator_signature: claim.validator_signature,
            previous_hash,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// The fixed root of every TruthLink ledger.
    pub fn genesis() -> Self {
        let mut block = Self {
            index: 0,
            timestamp: 0,
            claim_id: "GENESIS".to_string(),
            statement: "This is the root of TruthLink.".to_string(),
            sources: Vec::new(),
            validation_level: ValidationLevel::Absolute,
            ai_opinion: "true".to_string(),
            validator_signature: "root-signature".to_string(),
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// SHA-256 over a canonical JSON object of every field except `hash`.
    ///
    /// Keys are sorted, so the digest depends only on field values.
    pub fn compute_hash(&self) -> String {
        // Keys are listed alphabetically so the output stays sorted even if
        // serde_json's `preserve_order` feature is switched on elsewhere.
        let canonical = json!({
            "ai_opinion": self.ai_opinion,
            "claim_id": self.claim_id,
            "index": self.index,
            "nonce": self.nonce,
            "previous_hash": self.previous_hash,
            "sources": self.sources,
            "statement": self.statement,
            "timestamp": self.timestamp,
            "validation_level": self.validation_level,
            "validator_signature": self.validator_signature,
        });
        hex::encode(Sha256::digest(canonical.to_string().as_bytes()))
    }

    /// Set `nonce` and refresh the cached hash.
    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
        self.hash = self.compute_hash();
    }

    /// `true` when the cached `hash` matches the block's current contents.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    pub fn is_genesis(&self) -> bool {
        *self == Self::genesis()
    }
}
