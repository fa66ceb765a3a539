//! Read-only view of blocks served by the ledger

use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Index of the first block in a chain.
pub const GENESIS_INDEX: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Seconds since the Unix epoch, fractional.
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default, alias = "proof")]
    pub nonce: u64,
    pub previous_hash: String,
    #[serde(default)]
    pub hash: String,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.index == GENESIS_INDEX
    }

    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        if !self.timestamp.is_finite() {
            return None;
        }
        let millis = (self.timestamp * 1000.0).round() as i64;
        DateTime::from_timestamp_millis(millis)
    }

    /// Transactions that need a sender key to be checked.
    pub fn signed_transactions(&self) -> impl Iterator<Item = (usize, &Transaction)> {
        self.transactions
            .iter()
            .enumerate()
            .filter(|(_, tx)| !tx.is_reward())
    }
}
