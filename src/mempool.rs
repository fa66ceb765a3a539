//! Operator-side selection of pending transactions for the next block
//!
//! The selector mirrors the ledger's mempool listing, lets the operator pick up
//! to [`MAX_SELECTION`] entries and commits the mine. All methods take `&self`
//! so one selector can be shared between a refresh task and the caller.

use crate::api::{LedgerApi, MempoolEntry, MempoolResponse, MineRequest};
use crate::blockchain::Block;
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Most entries a single block proposal may carry.
pub const MAX_SELECTION: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Selected,
    Deselected,
    /// Selection full, or the index does not exist.
    Ignored,
}

#[derive(Debug)]
pub struct MineOutcome {
    pub block: Block,
    /// Fresh chain view, `None` if it could not be fetched after the mine.
    pub chain: Option<Vec<Block>>,
}

#[derive(Debug, Default)]
struct SelectorState {
    entries: Vec<MempoolEntry>,
    base_reward: f64,
    /// Indices into `entries`, in the order they were picked.
    selection: Vec<usize>,
}

/// Clears the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct MempoolSelector {
    state: Mutex<SelectorState>,
    mining: AtomicBool,
}

impl MempoolSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<MempoolEntry>, base_reward: f64) -> Self {
        MempoolSelector {
            state: Mutex::new(SelectorState {
                entries,
                base_reward,
                selection: Vec::new(),
            }),
            mining: AtomicBool::new(false),
        }
    }

    pub fn entries(&self) -> Vec<MempoolEntry> {
        self.state.lock().entries.clone()
    }

    pub fn base_reward(&self) -> f64 {
        self.state.lock().base_reward
    }

    pub fn set_base_reward(&self, reward: f64) {
        self.state.lock().base_reward = reward;
    }

    /// Replaces the listing. Selected transactions that are still pending keep
    /// their place in the selection under their new index; the rest drop out.
    pub fn apply_listing(&self, listing: MempoolResponse) {
        let mut state = self.state.lock();
        let previously_selected: Vec<Transaction> = state
            .selection
            .iter()
            .filter_map(|&i| state.entries.get(i).map(|e| e.transaction.clone()))
            .collect();

        let mut selection = Vec::with_capacity(previously_selected.len());
        for tx in &previously_selected {
            let found = listing
                .pending_transactions
                .iter()
                .enumerate()
                .find(|(i, e)| &e.transaction == tx && !selection.contains(i))
                .map(|(i, _)| i);
            if let Some(i) = found {
                selection.push(i);
            }
        }
        if selection.len() != previously_selected.len() {
            debug!(
                dropped = previously_selected.len() - selection.len(),
                "selected transactions left the mempool"
            );
        }

        state.entries = listing.pending_transactions;
        state.base_reward = listing.current_block_reward;
        state.selection = selection;
    }

    pub async fn refresh(&self, api: &dyn LedgerApi) -> Result<()> {
        let listing = api.mempool().await?;
        self.apply_listing(listing);
        Ok(())
    }

    pub fn toggle(&self, index: usize) -> ToggleOutcome {
        let mut state = self.state.lock();
        if let Some(pos) = state.selection.iter().position(|&i| i == index) {
            state.selection.remove(pos);
            return ToggleOutcome::Deselected;
        }
        if index >= state.entries.len() || state.selection.len() >= MAX_SELECTION {
            return ToggleOutcome::Ignored;
        }
        state.selection.push(index);
        ToggleOutcome::Selected
    }

    pub fn selection(&self) -> Vec<usize> {
        self.state.lock().selection.clone()
    }

    pub fn reset(&self) {
        self.state.lock().selection.clear();
    }

    /// Base block reward plus the fees of the selected entries.
    pub fn expected_reward(&self) -> f64 {
        let state = self.state.lock();
        let fees: f64 = state
            .selection
            .iter()
            .filter_map(|&i| state.entries.get(i))
            .map(|entry| entry.fee)
            .sum();
        state.base_reward + fees
    }

    pub fn selected_transactions(&self) -> Vec<Transaction> {
        let state = self.state.lock();
        state
            .selection
            .iter()
            .filter_map(|&i| state.entries.get(i))
            .map(|entry| entry.transaction.clone())
            .collect()
    }

    pub fn is_mining(&self) -> bool {
        self.mining.load(Ordering::Acquire)
    }

    /// Commits a block with the current selection, paying `miner_address`.
    ///
    /// Preconditions are checked before any request goes out. Overlapping calls
    /// on the same selector are rejected rather than queued.
    pub async fn mine(&self, api: &dyn LedgerApi, miner_address: &str) -> Result<MineOutcome> {
        let miner_address = miner_address.trim();
        if miner_address.is_empty() {
            return Err(ChainError::Validation("miner address is empty".to_string()));
        }
        let selected = self.selected_transactions();
        if selected.is_empty() {
            return Err(ChainError::Validation(
                "no transactions selected for mining".to_string(),
            ));
        }
        let _guard = InFlightGuard::acquire(&self.mining)
            .ok_or_else(|| ChainError::Validation("mine already in progress".to_string()))?;

        info!(miner = miner_address, count = selected.len(), "requesting mine");
        let block = api
            .mine(&MineRequest {
                miner_address: miner_address.to_string(),
                selected_transactions: Some(selected),
            })
            .await?;
        info!(index = block.index, "block mined");

        self.reset();
        if let Err(e) = self.refresh(api).await {
            warn!("mempool refresh after mine failed: {}", e);
        }
        let chain = match api.chain().await {
            Ok(chain) => Some(chain),
            Err(e) => {
                warn!("chain refresh after mine failed: {}", e);
                None
            }
        };

        Ok(MineOutcome { block, chain })
    }

    /// Refreshes the listing every `period` until the handle is aborted.
    /// Failures are logged and retried on the next tick.
    pub fn spawn_refresh_loop(
        self: Arc<Self>,
        api: Arc<dyn LedgerApi>,
        period: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh(api.as_ref()).await {
                    warn!("mempool refresh failed: {}", e);
                }
            }
        })
    }
}
