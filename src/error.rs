//! Error types for SimChain

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    /// Caller input failed a precondition; raised before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Transport failure or non-success HTTP status.
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not have the expected shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
