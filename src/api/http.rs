/// reqwest-backed implementation of [`LedgerApi`]
use super::types::*;
use super::LedgerApi;
use crate::blockchain::Block;
use crate::config::LedgerConfig;
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    base_url: String,
    http: Client,
}

impl HttpLedgerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(HttpLedgerClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &LedgerConfig) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[inline]
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        tracing::debug!(path, "GET");
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        decode(path, response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        tracing::debug!(path, "POST");
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        decode(path, response).await
    }
}

fn transport_error(path: &str, err: reqwest::Error) -> ChainError {
    ChainError::Network(format!("{} request failed: {}", path, err))
}

/// Maps non-2xx statuses to `Network` (with the server's `message` when it
/// sends one) and bodies of the wrong shape to `Protocol`.
async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ChainError::Network(format!("{} response unreadable: {}", path, e)))?;

    if !status.is_success() {
        let detail = serde_json::from_str::<MessageResponse>(&body)
            .map(|m| m.message)
            .unwrap_or_else(|_| body.trim().to_string());
        return Err(ChainError::Network(format!(
            "{} returned HTTP {}: {}",
            path,
            status.as_u16(),
            detail
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| ChainError::Protocol(format!("{} returned an unexpected body: {}", path, e)))
}

#[async_trait]
impl LedgerApi for HttpLedgerClient {
    async fn chain(&self) -> Result<Vec<Block>> {
        let response: ChainResponse = self.get_json("/chain", &[]).await?;
        Ok(response.chain)
    }

    async fn balance(&self, address: &str) -> Result<f64> {
        let response: BalanceResponse = self.get_json("/balance", &[("address", address)]).await?;
        Ok(response.balance)
    }

    async fn submit_transaction(&self, transaction: &Transaction) -> Result<serde_json::Value> {
        self.post_json("/transactions/new", transaction).await
    }

    async fn mempool(&self) -> Result<MempoolResponse> {
        self.get_json("/mempool", &[]).await
    }

    async fn mine(&self, request: &MineRequest) -> Result<Block> {
        self.post_json("/mine", request).await
    }

    async fn mine_progress(&self, request: &MiningProgressRequest) -> Result<MiningProgress> {
        self.post_json("/mine/progress", request).await
    }

    async fn verify_block(&self, request: &VerifyBlockRequest) -> Result<String> {
        let response: MessageResponse = self.post_json("/verify_block", request).await?;
        Ok(response.message)
    }
}
