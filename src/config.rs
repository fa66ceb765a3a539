//! Configuration management for SimChain

use crate::error::{ChainError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "simchain.toml";

/// Overrides `ledger.base_url` when set.
pub const LEDGER_URL_ENV: &str = "SIMCHAIN_LEDGER_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub mempool: MempoolConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiningConfig {
    /// Delay between two proof-of-work steps.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Leading zero hex digits of a winning hash.
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
}

impl MiningConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            difficulty: default_difficulty(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MempoolConfig {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl MempoolConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_wallet_path")]
    pub path: PathBuf,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            path: default_wallet_path(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_difficulty() -> usize {
    4
}

fn default_refresh_interval_secs() -> u64 {
    5
}

fn default_wallet_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".simchain").join("wallet.json"))
        .unwrap_or_else(|| PathBuf::from("wallet.json"))
}

impl Config {
    /// Parses TOML, then applies environment overrides and validation.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(LEDGER_URL_ENV) {
            if !url.trim().is_empty() {
                self.ledger.base_url = url.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = &self.ledger.base_url;
        if url.is_empty() {
            return Err(ChainError::Config("ledger.base_url must be set".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ChainError::Config(format!(
                "ledger.base_url must start with http(s)://, got {}",
                url
            )));
        }
        if self.mining.poll_interval_ms == 0 {
            return Err(ChainError::Config(
                "mining.poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.mining.difficulty > 64 {
            return Err(ChainError::Config(format!(
                "mining.difficulty cannot exceed 64 hex digits, got {}",
                self.mining.difficulty
            )));
        }
        Ok(())
    }
}

/// Loads `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("{} not found, using defaults", path.display());
            String::new()
        }
        Err(e) => return Err(e.into()),
    };
    Config::from_toml_str(&contents)
}
