//! Wallet data and the caller-owned store it lives in
//!
//! The core never reaches for ambient wallet state. Callers hand in a
//! [`WalletStore`] and the core borrows the wallet for a single operation.

use crate::error::{ChainError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    pub public_key: String,
    pub private_key: String,
}

impl Wallet {
    pub fn new(
        address: impl Into<String>,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Wallet {
            address: address.into(),
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }

    /// Shortened key for display, never the full private key.
    pub fn truncated(key: &str) -> String {
        if key.chars().count() > 32 {
            format!("{}...", key.chars().take(32).collect::<String>())
        } else {
            key.to_string()
        }
    }
}

/// Externally owned wallet storage with explicit get/set.
pub trait WalletStore: Send + Sync {
    fn get(&self) -> Result<Option<Wallet>>;
    fn set(&self, wallet: Wallet) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryWalletStore {
    wallet: RwLock<Option<Wallet>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wallet(wallet: Wallet) -> Self {
        MemoryWalletStore {
            wallet: RwLock::new(Some(wallet)),
        }
    }
}

impl WalletStore for MemoryWalletStore {
    fn get(&self) -> Result<Option<Wallet>> {
        Ok(self.wallet.read().clone())
    }

    fn set(&self, wallet: Wallet) -> Result<()> {
        *self.wallet.write() = Some(wallet);
        Ok(())
    }
}

/// Stores the wallet as pretty-printed JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct FileWalletStore {
    path: PathBuf,
}

impl FileWalletStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileWalletStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WalletStore for FileWalletStore {
    fn get(&self) -> Result<Option<Wallet>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let wallet = serde_json::from_str(&contents).map_err(|e| {
            ChainError::Serialization(format!(
                "Invalid wallet file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(Some(wallet))
    }

    fn set(&self, wallet: Wallet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&wallet)?)?;
        Ok(())
    }
}

/// Fetches the wallet or fails with a validation error naming what is missing.
pub fn require_wallet(store: &dyn WalletStore) -> Result<Wallet> {
    store
        .get()?
        .ok_or_else(|| ChainError::Validation("no wallet configured".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_get_set() {
        let store = MemoryWalletStore::new();
        assert_eq!(store.get().unwrap(), None);
        assert!(matches!(
            require_wallet(&store),
            Err(ChainError::Validation(_))
        ));

        let wallet = Wallet::new("addr", "pub", "priv");
        store.set(wallet.clone()).unwrap();
        assert_eq!(store.get().unwrap(), Some(wallet.clone()));
        assert_eq!(require_wallet(&store).unwrap(), wallet);
    }

    #[test]
    fn test_truncated() {
        assert_eq!(Wallet::truncated("abc"), "abc");
        let long = "a".repeat(40);
        assert_eq!(Wallet::truncated(&long), format!("{}...", "a".repeat(32)));
    }
}
