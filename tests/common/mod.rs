//! Scripted in-process ledger shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use simchain::api::{
    LedgerApi, MempoolEntry, MempoolResponse, MineRequest, MiningProgress, MiningProgressRequest,
    VerifyBlockRequest,
};
use simchain::blockchain::Block;
use simchain::transaction::Transaction;
use simchain::{ChainError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Called with the 1-based round number while a progress request is in flight.
pub type ProgressHook = Box<dyn Fn(usize) + Send + Sync>;

#[derive(Default)]
pub struct ScriptedLedger {
    pub chain: Mutex<Vec<Block>>,
    pub listing: Mutex<Option<MempoolResponse>>,
    pub mined_block: Mutex<Option<Block>>,
    progress: Mutex<VecDeque<Result<MiningProgress>>>,
    hook: Mutex<Option<ProgressHook>>,
    mine_gate: Option<Arc<Notify>>,
    pub progress_requests: Mutex<Vec<MiningProgressRequest>>,
    pub mine_requests: Mutex<Vec<MineRequest>>,
    pub progress_calls: AtomicUsize,
    pub mine_calls: AtomicUsize,
    pub mempool_calls: AtomicUsize,
    pub chain_calls: AtomicUsize,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// `mine` waits on `gate` before answering.
    pub fn with_mine_gate(gate: Arc<Notify>) -> Self {
        ScriptedLedger {
            mine_gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn push_progress(&self, nonce: u64, hash: &str, found: bool) {
        self.progress.lock().push_back(Ok(MiningProgress {
            nonce,
            hash: hash.to_string(),
            found,
        }));
    }

    pub fn push_progress_error(&self, err: ChainError) {
        self.progress.lock().push_back(Err(err));
    }

    pub fn set_hook(&self, hook: ProgressHook) {
        *self.hook.lock() = Some(hook);
    }

    pub fn set_listing(&self, listing: MempoolResponse) {
        *self.listing.lock() = Some(listing);
    }

    pub fn progress_calls(&self) -> usize {
        self.progress_calls.load(Ordering::SeqCst)
    }

    pub fn mine_calls(&self) -> usize {
        self.mine_calls.load(Ordering::SeqCst)
    }

    pub fn mempool_calls(&self) -> usize {
        self.mempool_calls.load(Ordering::SeqCst)
    }

    pub fn chain_calls(&self) -> usize {
        self.chain_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerApi for ScriptedLedger {
    async fn chain(&self) -> Result<Vec<Block>> {
        self.chain_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.chain.lock().clone())
    }

    async fn balance(&self, _address: &str) -> Result<f64> {
        Ok(0.0)
    }

    async fn submit_transaction(&self, transaction: &Transaction) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(transaction)?)
    }

    async fn mempool(&self) -> Result<MempoolResponse> {
        self.mempool_calls.fetch_add(1, Ordering::SeqCst);
        self.listing
            .lock()
            .clone()
            .ok_or_else(|| ChainError::Network("mempool unavailable".to_string()))
    }

    async fn mine(&self, request: &MineRequest) -> Result<Block> {
        self.mine_calls.fetch_add(1, Ordering::SeqCst);
        self.mine_requests.lock().push(request.clone());
        if let Some(gate) = &self.mine_gate {
            gate.notified().await;
        }
        self.mined_block
            .lock()
            .clone()
            .ok_or_else(|| ChainError::Network("mine rejected".to_string()))
    }

    async fn mine_progress(&self, request: &MiningProgressRequest) -> Result<MiningProgress> {
        let round = self.progress_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.progress_requests.lock().push(request.clone());
        if let Some(hook) = self.hook.lock().as_ref() {
            hook(round);
        }
        self.progress
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ChainError::Protocol("progress script exhausted".to_string())))
    }

    async fn verify_block(&self, request: &VerifyBlockRequest) -> Result<String> {
        Ok(format!("block {} checked", request.block_index))
    }
}

pub fn entry(sender: &str, recipient: &str, amount: f64, fee: f64) -> MempoolEntry {
    MempoolEntry {
        transaction: Transaction::new(sender, recipient, amount, fee),
        fee,
    }
}

pub fn block(index: u64, transactions: Vec<Transaction>) -> Block {
    Block {
        index,
        timestamp: 1_700_000_000.0 + index as f64,
        nonce: 1000 + index,
        previous_hash: format!("{:064}", index.saturating_sub(1)),
        hash: format!("{:064}", index),
        transactions,
    }
}
