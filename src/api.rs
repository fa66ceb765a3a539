//! Client side of the ledger's JSON-over-HTTP API
//!
//! [`LedgerApi`] is the seam between the core and the remote ledger. The
//! selector and the mining coordinator only ever talk to this trait, so tests
//! can substitute a scripted ledger for [`HttpLedgerClient`].

pub mod http;
pub mod types;

pub use http::HttpLedgerClient;
pub use types::*;

use crate::blockchain::Block;
use crate::error::Result;
use crate::transaction::Transaction;
use async_trait::async_trait;

#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// `GET /chain`
    async fn chain(&self) -> Result<Vec<Block>>;

    /// `GET /balance?address=<addr>`
    async fn balance(&self, address: &str) -> Result<f64>;

    /// `POST /transactions/new`; returns the ledger's echo.
    async fn submit_transaction(&self, transaction: &Transaction) -> Result<serde_json::Value>;

    /// `GET /mempool`
    async fn mempool(&self) -> Result<MempoolResponse>;

    /// `POST /mine`, the final commit of a mined block.
    async fn mine(&self, request: &MineRequest) -> Result<Block>;

    /// `POST /mine/progress`, one proof-of-work step.
    async fn mine_progress(&self, request: &MiningProgressRequest) -> Result<MiningProgress>;

    /// `POST /verify_block`; returns the ledger's message.
    async fn verify_block(&self, request: &VerifyBlockRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mempool_entry_accepts_flat_and_nested_forms() {
        let json = r#"{
            "pending_transactions": [
                {"sender": "a", "recipient": "b", "amount": 2, "fee": 0.5, "signature": "ff"},
                {"transaction": {"sender": "c", "recipient": "d", "amount": 3, "signature": "ee"}, "fee": 0.25}
            ],
            "current_block_reward": 50
        }"#;
        let response: MempoolResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.current_block_reward, 50.0);
        assert_eq!(response.pending_transactions[0].fee, 0.5);
        assert_eq!(response.pending_transactions[0].transaction.sender, "a");
        assert_eq!(response.pending_transactions[1].fee, 0.25);
        assert_eq!(response.pending_transactions[1].transaction.recipient, "d");
    }

    #[test]
    fn test_mine_request_omits_empty_selection() {
        let request = MineRequest {
            miner_address: "m".to_string(),
            selected_transactions: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"miner_address": "m"})
        );
    }

    #[test]
    fn test_verify_block_request_shapes() {
        let bare = VerifyBlockRequest::block(3);
        assert_eq!(
            serde_json::to_value(&bare).unwrap(),
            serde_json::json!({"block_index": 3})
        );

        let tx = Transaction::new("a", "b", 1.0, 0.1).with_signature("ab".to_string());
        let full = VerifyBlockRequest::block(3).with_transaction(tx, "04ff".to_string());
        let value = serde_json::to_value(&full).unwrap();
        assert_eq!(value["signature"], "ab");
        assert_eq!(value["public_key"], "04ff");
        assert_eq!(value["transaction"]["sender"], "a");
    }

    #[test]
    fn test_mining_progress_requires_all_fields() {
        assert!(serde_json::from_str::<MiningProgress>(r#"{"nonce": 1, "hash": "ab"}"#).is_err());
        let progress: MiningProgress =
            serde_json::from_str(r#"{"nonce": 1, "hash": "ab", "found": false}"#).unwrap();
        assert_eq!(progress.nonce, 1);
    }
}
