/// Integration tests that wire together all crates end-to-end.
///
/// These tests exercise the full data path:
///   ClaimInput → claim queue → candidate Block → proof of work → Ledger → chain file
///
/// Difficulty is kept low so the searches finish instantly.
use std::sync::atomic::AtomicBool;

use tl_chain::{
    meets_difficulty, Block, ChainError, ChainStore, JsonFileStore, Ledger, MemoryStore, Miner,
    Rejection,
};
use tl_claim::{Claim, ClaimInput};
use tl_node::{
    protocol::{dispatch, encode_response, respond, Request, Response},
    MineOutcome, Node, NodeConfig, NodeError,
};

const DIFFICULTY: usize = 2;

fn water_claim() -> ClaimInput {
    ClaimInput {
        statement: "Water boils at 100C at sea level".into(),
        sources: vec!["iso-standard-1".into()],
        validation_level: "high".into(),
        ai_opinion: "true".into(),
        validator_signature: "sig-1".into(),
    }
}

fn claim(statement: &str) -> ClaimInput {
    ClaimInput {
        statement: statement.into(),
        ..water_claim()
    }
}

fn file_node(dir: &tempfile::TempDir) -> Node {
    let config = NodeConfig::at_path(dir.path().join("truthlink_chain.json"))
        .with_difficulty(DIFFICULTY);
    let (node, _events) = Node::open(config).expect("node should open");
    node
}

// ── Service scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn submit_then_mine_appends_block_one() {
    let dir = tempfile::tempdir().unwrap();
    let node = file_node(&dir);

    let claim_id = node.submit_claim(water_claim()).await.unwrap();
    let outcome = node.mine().await.unwrap();
    assert!(matches!(outcome, MineOutcome::Mined { index: 1, .. }));

    let chain = node.chain().await;
    assert_eq!(chain.len(), 2);
    assert!(chain[0].is_genesis());
    assert_eq!(chain[1].previous_hash, chain[0].hash);
    assert!(chain[1].hash.starts_with(&"0".repeat(DIFFICULTY)));
    assert_eq!(chain[1].claim_id, claim_id.to_string());
    assert_eq!(chain[1].statement, "Water boils at 100C at sea level");
    assert_eq!(chain[1].sources, vec!["iso-standard-1".to_string()]);
}

#[tokio::test]
async fn mining_an_empty_queue_is_a_no_op_every_time() {
    let dir = tempfile::tempdir().unwrap();
    let node = file_node(&dir);

    assert_eq!(node.mine().await.unwrap(), MineOutcome::NothingToMine);
    assert_eq!(node.mine().await.unwrap(), MineOutcome::NothingToMine);
    assert_eq!(node.chain().await.len(), 1);
    // Nothing was mined, so nothing was written.
    assert!(!dir.path().join("truthlink_chain.json").exists());
}

#[tokio::test]
async fn mining_takes_claims_in_submission_order() {
    let dir = tempfile::tempdir().unwrap();
    let node = file_node(&dir);

    let first = node.submit_claim(claim("first")).await.unwrap();
    let second = node.submit_claim(claim("second")).await.unwrap();
    node.mine().await.unwrap();

    let chain = node.chain().await;
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[1].claim_id, first.to_string());

    let pending = node.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].claim_id, second);
}

#[tokio::test]
async fn restart_reloads_the_same_chain() {
    let dir = tempfile::tempdir().unwrap();
    let before = {
        let node = file_node(&dir);
        for i in 0..3 {
            node.submit_claim(claim(&format!("claim {i}"))).await.unwrap();
            node.mine().await.unwrap();
        }
        node.chain().await
    };

    let node = file_node(&dir);
    assert_eq!(node.chain().await, before);
    assert!(node.validate().await.is_ok());
    assert_eq!(node.tip().await.unwrap().index, 3);
}

#[tokio::test]
async fn tampered_chain_file_refuses_to_load() {
    let dir = tempfile::tempdir().unwrap();
    {
        let node = file_node(&dir);
        node.submit_claim(water_claim()).await.unwrap();
        node.submit_claim(claim("second")).await.unwrap();
        node.mine().await.unwrap();
        node.mine().await.unwrap();
    }

    let path = dir.path().join("truthlink_chain.json");
    let store = JsonFileStore::new(&path);
    let mut blocks = store.load().unwrap().unwrap();
    blocks[1].statement = "Water boils at 50C at sea level".into();
    store.save(&blocks).unwrap();

    let config = NodeConfig::at_path(&path).with_difficulty(DIFFICULTY);
    assert!(matches!(
        Node::open(config),
        Err(NodeError::Chain(ChainError::Corrupt { index: 1, .. }))
    ));
}

#[tokio::test]
async fn concurrent_miners_never_lose_a_claim() {
    let config = NodeConfig::default().with_difficulty(DIFFICULTY);
    let (node, _events) = Node::with_store(config, Box::new(MemoryStore::new())).unwrap();

    let mut ids = Vec::new();
    for i in 0..6 {
        ids.push(node.submit_claim(claim(&format!("claim {i}"))).await.unwrap());
    }

    let mut handles = Vec::new();
    for _ in 0..6 {
        let node = node.clone();
        handles.push(tokio::spawn(async move { node.mine().await }));
    }
    for handle in handles {
        // A miner that keeps losing the race hands its claim back to the queue.
        match handle.await.unwrap() {
            Ok(_) => {}
            Err(NodeError::Chain(ChainError::Rejected(_))) => {}
            Err(e) => panic!("unexpected mining error: {e}"),
        }
    }
    while node.mine().await.unwrap() != MineOutcome::NothingToMine {}

    let chain = node.chain().await;
    assert_eq!(chain.len(), 7);
    assert!(node.validate().await.is_ok());
    assert!(node.pending().await.is_empty());

    let mut mined: Vec<String> = chain[1..].iter().map(|b| b.claim_id.clone()).collect();
    let mut submitted: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    mined.sort();
    submitted.sort();
    assert_eq!(mined, submitted);
}

#[tokio::test]
async fn parallel_mining_threads_produce_valid_blocks() {
    let mut config = NodeConfig::default().with_difficulty(DIFFICULTY);
    config.mining_threads = 4;
    let (node, _events) = Node::with_store(config, Box::new(MemoryStore::new())).unwrap();

    node.submit_claim(water_claim()).await.unwrap();
    node.mine().await.unwrap();
    assert!(node.validate().await.is_ok());
}

// ── Ledger-level properties ─────────────────────────────────────────────────

fn mine_onto(ledger: &mut Ledger, statement: &str) -> Block {
    let mut block = ledger
        .candidate(Claim::new(claim(statement)).unwrap())
        .unwrap();
    let proof = Miner::new(DIFFICULTY)
        .search(&mut block, &AtomicBool::new(false))
        .unwrap();
    ledger.append(block, &proof.hash).unwrap().clone()
}

#[test]
fn every_accepted_block_meets_difficulty_and_links() {
    let mut ledger = Ledger::new(Box::new(MemoryStore::new()), DIFFICULTY);
    for i in 0..5 {
        mine_onto(&mut ledger, &format!("claim {i}"));
    }

    let blocks = ledger.blocks();
    assert!(blocks[0].is_genesis());
    for window in blocks.windows(2) {
        assert_eq!(window[1].previous_hash, window[0].hash);
        assert_eq!(window[1].hash, window[1].compute_hash());
        assert!(meets_difficulty(&window[1].hash, DIFFICULTY));
    }
}

#[test]
fn editing_a_block_breaks_its_successor_link() {
    let mut ledger = Ledger::new(Box::new(MemoryStore::new()), DIFFICULTY);
    mine_onto(&mut ledger, "one");
    mine_onto(&mut ledger, "two");

    let mut blocks = ledger.blocks().to_vec();
    let original = blocks[1].hash.clone();
    blocks[1].statement = "edited".into();
    let recomputed = blocks[1].compute_hash();

    assert_ne!(original, recomputed);
    assert_ne!(blocks[2].previous_hash, recomputed);
}

#[test]
fn candidate_built_on_old_tip_is_rejected() {
    let mut ledger = Ledger::new(Box::new(MemoryStore::new()), DIFFICULTY);
    let mut stale = ledger
        .candidate(Claim::new(claim("slow")).unwrap())
        .unwrap();
    let proof = Miner::new(DIFFICULTY)
        .search(&mut stale, &AtomicBool::new(false))
        .unwrap();

    mine_onto(&mut ledger, "fast");

    assert!(matches!(
        ledger.append(stale, &proof.hash),
        Err(ChainError::Rejected(Rejection::StaleTip))
    ));
    assert_eq!(ledger.len(), 2);
}

// ── Line protocol ───────────────────────────────────────────────────────────

#[tokio::test]
async fn dispatch_mirrors_the_service_operations() {
    let config = NodeConfig::default().with_difficulty(DIFFICULTY);
    let (node, _events) = Node::with_store(config, Box::new(MemoryStore::new())).unwrap();

    let nothing = dispatch(&node, Request::Mine).await;
    assert_eq!(
        encode_response(&nothing).unwrap(),
        r#"{"message":"No claims to mine"}"#
    );

    match dispatch(&node, Request::Submit(water_claim())).await {
        Response::Submitted { message, .. } => assert_eq!(message, "Claim submitted"),
        other => panic!("unexpected response {other:?}"),
    }

    match dispatch(&node, Request::Mine).await {
        Response::Mined { message, index, .. } => {
            assert_eq!(index, 1);
            assert_eq!(message, "Block #1 mined");
        }
        other => panic!("unexpected response {other:?}"),
    }

    match dispatch(&node, Request::Chain).await {
        Response::Chain(blocks) => assert_eq!(blocks.len(), 2),
        other => panic!("unexpected response {other:?}"),
    }

    let mut bad = water_claim();
    bad.statement.clear();
    assert!(matches!(
        dispatch(&node, Request::Submit(bad)).await,
        Response::Error { .. }
    ));
}

#[tokio::test]
async fn undecodable_line_gets_an_error_and_service_keeps_going() {
    let config = NodeConfig::default().with_difficulty(DIFFICULTY);
    let (node, _events) = Node::with_store(config, Box::new(MemoryStore::new())).unwrap();
    node.submit_claim(water_claim()).await.unwrap();

    match respond(&node, b"\xff\xfe bad\n").await {
        Response::Error { error } => assert!(error.starts_with("malformed request")),
        other => panic!("unexpected response {other:?}"),
    }

    // The queued claim survived and later requests are still served.
    assert_eq!(node.pending().await.len(), 1);
    match respond(&node, br#"{"op":"chain"}"#).await {
        Response::Chain(blocks) => assert_eq!(blocks.len(), 1),
        other => panic!("unexpected response {other:?}"),
    }
}
