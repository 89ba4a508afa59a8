use uuid::Uuid;

/// High-level events emitted by a [`crate::Node`] that callers can subscribe
/// to via a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// A claim passed validation and joined the queue.
    ClaimSubmitted { claim_id: Uuid },

    /// A claim was mined and appended to the ledger.
    BlockMined {
        index: u64,
        hash: String,
        attempts: u64,
    },

    /// A mining attempt failed and the claim went back into the queue.
    ClaimRequeued { claim_id: Uuid, reason: String },
}
