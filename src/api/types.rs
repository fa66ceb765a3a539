/// Request and response bodies of the ledger's JSON API
use crate::blockchain::Block;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: f64,
}

/// A pending transaction together with the fee it pays the miner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MempoolEntryWire")]
pub struct MempoolEntry {
    pub transaction: Transaction,
    pub fee: f64,
}

/// Ledgers either nest the transaction or list it flat with its own `fee`.
#[derive(Deserialize)]
#[serde(untagged)]
enum MempoolEntryWire {
    Nested {
        transaction: Transaction,
        #[serde(default)]
        fee: Option<f64>,
    },
    Flat(Transaction),
}

impl From<MempoolEntryWire> for MempoolEntry {
    fn from(wire: MempoolEntryWire) -> Self {
        match wire {
            MempoolEntryWire::Nested { transaction, fee } => MempoolEntry {
                fee: fee.unwrap_or(transaction.fee),
                transaction,
            },
            MempoolEntryWire::Flat(transaction) => MempoolEntry {
                fee: transaction.fee,
                transaction,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MempoolResponse {
    pub pending_transactions: Vec<MempoolEntry>,
    pub current_block_reward: f64,
}

/// Body of `POST /mine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MineRequest {
    pub miner_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_transactions: Option<Vec<Transaction>>,
}

/// Body of `POST /mine/progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningProgressRequest {
    pub miner_address: String,
    pub selected_transactions: Vec<Transaction>,
}

/// One proof-of-work step as reported by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningProgress {
    pub nonce: u64,
    pub hash: String,
    pub found: bool,
}

/// Body of `POST /verify_block`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyBlockRequest {
    pub block_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl VerifyBlockRequest {
    pub fn block(block_index: u64) -> Self {
        VerifyBlockRequest {
            block_index,
            transaction: None,
            signature: None,
            public_key: None,
        }
    }

    /// Asks the ledger to check one transaction of the block against a key.
    pub fn with_transaction(mut self, transaction: Transaction, public_key: String) -> Self {
        self.signature = Some(transaction.signature.clone());
        self.transaction = Some(transaction);
        self.public_key = Some(public_key);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
