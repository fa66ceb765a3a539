//! Integration tests for mempool selection and block commit

mod common;

use common::{block, entry, ScriptedLedger};
use simchain::api::MempoolResponse;
use simchain::mempool::{MempoolSelector, ToggleOutcome};
use simchain::ChainError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn listing() -> MempoolResponse {
    MempoolResponse {
        pending_transactions: vec![
            entry("alice", "bob", 5.0, 0.5),
            entry("carol", "dave", 2.0, 1.5),
            entry("erin", "frank", 1.0, 0.25),
        ],
        current_block_reward: 50.0,
    }
}

fn ledger_with_listing() -> ScriptedLedger {
    let ledger = ScriptedLedger::new();
    ledger.set_listing(listing());
    ledger
}

#[tokio::test]
async fn test_refresh_loads_entries_and_reward() {
    let ledger = ledger_with_listing();
    let selector = MempoolSelector::new();
    selector.refresh(&ledger).await.unwrap();

    assert_eq!(selector.entries().len(), 3);
    assert_eq!(selector.base_reward(), 50.0);
    assert_eq!(selector.toggle(1), ToggleOutcome::Selected);
    assert_eq!(selector.toggle(2), ToggleOutcome::Selected);
    assert_eq!(selector.expected_reward(), 51.75);
}

#[tokio::test]
async fn test_mine_without_selection_sends_nothing() {
    let ledger = ledger_with_listing();
    let selector = MempoolSelector::new();
    selector.refresh(&ledger).await.unwrap();

    let result = selector.mine(&ledger, "miner-1").await;
    assert!(matches!(result, Err(ChainError::Validation(_))));
    assert_eq!(ledger.mine_calls(), 0);
}

#[tokio::test]
async fn test_mine_without_address_sends_nothing() {
    let ledger = ledger_with_listing();
    let selector = MempoolSelector::new();
    selector.refresh(&ledger).await.unwrap();
    selector.toggle(0);

    let result = selector.mine(&ledger, "").await;
    assert!(matches!(result, Err(ChainError::Validation(_))));
    assert_eq!(ledger.mine_calls(), 0);
    // Nothing was committed, so the selection stays
    assert_eq!(selector.selection(), vec![0]);
}

#[tokio::test]
async fn test_successful_mine_clears_selection_and_refreshes() {
    let ledger = ledger_with_listing();
    let selector = MempoolSelector::new();
    selector.refresh(&ledger).await.unwrap();
    selector.toggle(2);
    selector.toggle(0);

    let mined = block(4, selector.selected_transactions());
    *ledger.mined_block.lock() = Some(mined.clone());
    *ledger.chain.lock() = vec![block(1, vec![]), block(2, vec![]), block(3, vec![]), mined];
    // The mined entries leave the mempool
    ledger.set_listing(MempoolResponse {
        pending_transactions: vec![entry("carol", "dave", 2.0, 1.5)],
        current_block_reward: 50.0,
    });

    let outcome = selector.mine(&ledger, "miner-1").await.unwrap();

    assert_eq!(outcome.block.index, 4);
    assert_eq!(outcome.chain.map(|c| c.len()), Some(4));
    assert!(selector.selection().is_empty());
    assert_eq!(selector.entries().len(), 1);
    assert!(!selector.is_mining());
    assert_eq!(ledger.mempool_calls(), 2);
    assert_eq!(ledger.chain_calls(), 1);

    // Sent in selection order
    let requests = ledger.mine_requests.lock();
    let sent = requests[0].selected_transactions.clone().unwrap();
    assert_eq!(requests[0].miner_address, "miner-1");
    assert_eq!(sent[0].sender, "erin");
    assert_eq!(sent[1].sender, "alice");
}

#[tokio::test]
async fn test_rejected_mine_keeps_selection() {
    let ledger = ledger_with_listing();
    let selector = MempoolSelector::new();
    selector.refresh(&ledger).await.unwrap();
    selector.toggle(1);

    // No mined block scripted, so the ledger refuses
    let result = selector.mine(&ledger, "miner-1").await;
    assert!(matches!(result, Err(ChainError::Network(_))));
    assert_eq!(selector.selection(), vec![1]);
    assert!(!selector.is_mining());
}

#[tokio::test]
async fn test_overlapping_mine_is_rejected() {
    let gate = Arc::new(Notify::new());
    let ledger = ScriptedLedger::with_mine_gate(gate.clone());
    ledger.set_listing(listing());
    let selector = MempoolSelector::new();
    selector.refresh(&ledger).await.unwrap();
    selector.toggle(0);
    *ledger.mined_block.lock() = Some(block(2, selector.selected_transactions()));

    let (first, second) = tokio::join!(selector.mine(&ledger, "miner-1"), async {
        while ledger.mine_calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(selector.is_mining());
        let second = selector.mine(&ledger, "miner-1").await;
        gate.notify_one();
        second
    });

    assert!(matches!(second, Err(ChainError::Validation(_))));
    assert_eq!(first.unwrap().block.index, 2);
    assert_eq!(ledger.mine_calls(), 1);
    assert!(!selector.is_mining());
}

#[tokio::test]
async fn test_refresh_failure_after_mine_still_reports_block() {
    let ledger = ledger_with_listing();
    let selector = MempoolSelector::new();
    selector.refresh(&ledger).await.unwrap();
    selector.toggle(0);
    *ledger.mined_block.lock() = Some(block(2, selector.selected_transactions()));
    // Listing disappears after the mine; refresh fails and is only logged
    *ledger.listing.lock() = None;

    let outcome = selector.mine(&ledger, "miner-1").await.unwrap();
    assert_eq!(outcome.block.index, 2);
    assert!(selector.selection().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_loop_picks_up_new_entries() {
    let ledger = Arc::new(ledger_with_listing());
    let selector = Arc::new(MempoolSelector::new());

    let handle = selector
        .clone()
        .spawn_refresh_loop(ledger.clone(), Duration::from_secs(5));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(selector.entries().len(), 3);

    let mut grown = listing();
    grown.pending_transactions.push(entry("gina", "hal", 3.0, 2.0));
    ledger.set_listing(grown);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(selector.entries().len(), 4);

    handle.abort();
}
