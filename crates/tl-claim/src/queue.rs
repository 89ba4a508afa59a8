use std::collections::VecDeque;

use uuid::Uuid;

use crate::Claim;

/// FIFO buffer of claims that have been submitted but not yet mined.
///
/// The queue is unbounded and never rejects a claim; validation happens when
/// the [`Claim`] is constructed.
#[derive(Debug, Clone, Default)]
pub struct ClaimQueue {
    pending: VecDeque<Claim>,
}

impl ClaimQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `claim` to the back of the queue and return its identifier.
    pub fn enqueue(&mut self, claim: Claim) -> Uuid {
        let id = claim.claim_id;
        self.pending.push_back(claim);
        id
    }

    /// Remove the oldest claim.  `None` means there is nothing to mine.
    pub fn dequeue(&mut self) -> Option<Claim> {
        self.pending.pop_front()
    }

    /// Return a claim to the head of the queue so it is mined next.
    pub fn push_front(&mut self, claim: Claim) {
        self.pending.push_front(claim);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Iterate pending claims from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.pending.iter()
    }
}
