use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tl_chain::{Block, ChainError, ChainStore, JsonFileStore, Ledger, Miner, Proof, Rejection};
use tl_claim::{Claim, ClaimInput, ClaimQueue};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{config::NodeConfig, error::NodeError, event::NodeEvent, requeue::RequeuePolicy};

/// How many times a claim is re-mined on a fresh tip before it is requeued.
const STALE_TIP_RETRIES: usize = 3;

/// Result of a successful [`Node::mine`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MineOutcome {
    /// The oldest claim was sealed into the block at `index`.
    Mined { index: u64, hash: String },

    /// The queue was empty; the ledger is unchanged.
    NothingToMine,
}

/// The TruthLink ledger service.
///
/// Owns the pending-claim queue and the ledger behind async locks and exposes
/// the operations a front end needs:
/// - Submitting a claim
/// - Mining the oldest pending claim
/// - Reading the chain
///
/// Cloning a `Node` yields another handle to the same queue and ledger.
#[derive(Clone)]
pub struct Node {
    queue: Arc<Mutex<ClaimQueue>>,
    ledger: Arc<RwLock<Ledger>>,
    miner: Miner,
    requeue_policy: RequeuePolicy,
    /// Set on shutdown; in-flight proof-of-work searches watch it.
    cancel: Arc<AtomicBool>,
    event_tx: mpsc::UnboundedSender<NodeEvent>,
}

impl Node {
    /// Load the ledger from `config.chain_path` and start a node around it.
    ///
    /// Returns the node together with a receiver for [`NodeEvent`]s.  Fails
    /// if the stored chain does not verify.
    pub fn open(
        config: NodeConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<NodeEvent>), NodeError> {
        let store = JsonFileStore::new(config.chain_path.clone());
        Self::with_store(config, Box::new(store))
    }

    /// Like [`Node::open`] but with an explicit persistence backend.
    pub fn with_store(
        config: NodeConfig,
        store: Box<dyn ChainStore>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<NodeEvent>), NodeError> {
        config.validate()?;
        let ledger = Ledger::load(store, config.difficulty)?;
        info!(
            blocks = ledger.len(),
            difficulty = config.difficulty,
            "Ledger ready"
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let node = Self {
            queue: Arc::new(Mutex::new(ClaimQueue::new())),
            ledger: Arc::new(RwLock::new(ledger)),
            miner: config.miner(),
            requeue_policy: config.requeue_policy,
            cancel: Arc::new(AtomicBool::new(false)),
            event_tx,
        };

        Ok((node, event_rx))
    }

    /// Validate `input` and queue it for mining.
    pub async fn submit_claim(&self, input: ClaimInput) -> Result<Uuid, NodeError> {
        let claim = Claim::new(input)?;
        let claim_id = self.queue.lock().await.enqueue(claim);

        debug!(%claim_id, "Claim submitted");
        let _ = self.event_tx.send(NodeEvent::ClaimSubmitted { claim_id });
        Ok(claim_id)
    }

    /// Mine the oldest pending claim into a new block.
    ///
    /// The queue lock is held only to dequeue and the ledger write lock only
    /// to append; the proof-of-work search runs on a blocking thread with no
    /// lock held.  If another block lands first the claim is re-mined on the
    /// new tip.  Any failure puts the claim back in the queue.
    pub async fn mine(&self) -> Result<MineOutcome, NodeError> {
        let Some(claim) = self.queue.lock().await.dequeue() else {
            debug!("No claims to mine");
            return Ok(MineOutcome::NothingToMine);
        };

        let mut retries = 0;
        loop {
            match self.seal(claim.clone()).await {
                Ok((block, proof)) => {
                    info!(
                        index = block.index,
                        claim_id = %claim.claim_id,
                        attempts = proof.attempts,
                        "Block mined"
                    );
                    let _ = self.event_tx.send(NodeEvent::BlockMined {
                        index: block.index,
                        hash: block.hash.clone(),
                        attempts: proof.attempts,
                    });
                    return Ok(MineOutcome::Mined {
                        index: block.index,
                        hash: block.hash,
                    });
                }

                Err(NodeError::Chain(ChainError::Rejected(
                    Rejection::StaleTip | Rejection::IndexMismatch { .. },
                ))) if retries < STALE_TIP_RETRIES => {
                    retries += 1;
                    debug!(claim_id = %claim.claim_id, retries, "Tip moved while mining, retrying");
                }

                Err(e) => {
                    warn!(claim_id = %claim.claim_id, "Mining failed: {e}");
                    self.requeue(claim, &e).await;
                    return Err(e);
                }
            }
        }
    }

    /// Build a candidate on the current tip, search for its proof without
    /// holding any lock, then offer it to the ledger on a blocking thread.
    async fn seal(&self, claim: Claim) -> Result<(Block, Proof), NodeError> {
        let mut candidate = self.ledger.read().await.candidate(claim)?;

        let miner = self.miner.clone();
        let cancel = Arc::clone(&self.cancel);
        let (candidate, proof) = tokio::task::spawn_blocking(move || {
            let proof = miner.search(&mut candidate, &cancel)?;
            Ok::<_, ChainError>((candidate, proof))
        })
        .await??;

        // Appending persists the chain, which blocks on file I/O.
        let mut ledger = Arc::clone(&self.ledger).write_owned().await;
        let hash = proof.hash.clone();
        let block = tokio::task::spawn_blocking(move || {
            ledger.append(candidate, &hash).map(Block::clone)
        })
        .await??;
        Ok((block, proof))
    }

    async fn requeue(&self, claim: Claim, reason: &NodeError) {
        let claim_id = claim.claim_id;
        {
            let mut queue = self.queue.lock().await;
            match self.requeue_policy {
                RequeuePolicy::Front => queue.push_front(claim),
                RequeuePolicy::Back => {
                    queue.enqueue(claim);
                }
            }
        }
        let _ = self.event_tx.send(NodeEvent::ClaimRequeued {
            claim_id,
            reason: reason.to_string(),
        });
    }

    /// Copy of every block in the chain, genesis first.
    pub async fn chain(&self) -> Vec<Block> {
        self.ledger.read().await.blocks().to_vec()
    }

    /// The most recent block.
    pub async fn tip(&self) -> Result<Block, NodeError> {
        Ok(self.ledger.read().await.tip()?.clone())
    }

    /// Claims waiting to be mined, oldest first.
    pub async fn pending(&self) -> Vec<Claim> {
        self.queue.lock().await.iter().cloned().collect()
    }

    /// Re-verify the in-memory chain end to end.
    pub async fn validate(&self) -> Result<(), NodeError> {
        Ok(self.ledger.read().await.validate()?)
    }

    /// Signal in-flight and future proof-of-work searches to stop.
    pub fn shutdown(&self) {
        info!("Shutting down, cancelling mining");
        self.cancel.store(true, Ordering::Relaxed);
    }
}
