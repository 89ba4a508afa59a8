use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ClaimError, ValidationLevel};

/// A raw claim submission as received from a caller.
///
/// Every field is required and must be non-blank; `sources` must contain at
/// least one non-blank reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimInput {
    pub statement: String,
    pub sources: Vec<String>,
    pub validation_level: String,
    pub ai_opinion: String,
    pub validator_signature: String,
}

/// A validated statement waiting in the queue to be mined into a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier assigned at submission.
    pub claim_id: Uuid,

    pub statement: String,

    /// Ordered references supporting the statement.
    pub sources: Vec<String>,

    pub validation_level: ValidationLevel,

    /// Verdict produced by the AI reviewer (e.g. `"true"`, `"disputed"`).
    pub ai_opinion: String,

    /// Opaque token supplied by the validator.
    pub validator_signature: String,
}

impl Claim {
    /// Validate `input` and assign it a fresh identifier.
    pub fn new(input: ClaimInput) -> Result<Self, ClaimError> {
        let validation_level = input.validate()?;
        Ok(Self {
            claim_id: Uuid::new_v4(),
            statement: input.statement,
            sources: input.sources,
            validation_level,
            ai_opinion: input.ai_opinion,
            validator_signature: input.validator_signature,
        })
    }
}

impl ClaimInput {
    /// Check every required field, returning the parsed validation level.
    pub fn validate(&self) -> Result<ValidationLevel, ClaimError> {
        if self.statement.trim().is_empty() {
            return Err(ClaimError::MissingField("statement"));
        }
        if self.sources.is_empty() || self.sources.iter().any(|s| s.trim().is_empty()) {
            return Err(ClaimError::MissingField("sources"));
        }
        let level = self.validation_level.parse()?;
        if self.ai_opinion.trim().is_empty() {
            return Err(ClaimError::MissingField("ai_opinion"));
        }
        if self.validator_signature.trim().is_empty() {
            return Err(ClaimError::MissingField("validator_signature"));
        }
        Ok(level)
    }
}
