//! SimChain - client core for a proof-of-work ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Ledger Data
//! - [`blockchain`] - Blocks as served by the ledger
//! - [`transaction`] - Transaction type and signed-message encoding
//!
//! ## Cryptography
//! - [`crypto`] - secp256k1 / SHA-256 primitives
//! - [`signer`] - Transaction signing
//! - [`verifier`] - Signature verification with per-transaction reasons
//!
//! ## Mining
//! - [`mempool`] - Pending-transaction selection and block commit
//! - [`mining`] - Cancellable proof-of-work progress polling
//!
//! ## Integration
//! - [`api`] - Ledger HTTP API client
//! - [`wallet`] - Wallet type and caller-owned wallet store
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - Terminal rendering helpers for the `simchain` binary

#![forbid(unsafe_code)]

// ============================================================================
// Ledger Data
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;
pub mod signer;
pub mod verifier;

// ============================================================================
// Mining
// ============================================================================
pub mod mempool;
pub mod mining;

// ============================================================================
// Integration
// ============================================================================
pub mod api;
pub mod wallet;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;

pub use api::{HttpLedgerClient, LedgerApi};
pub use error::{ChainError, Result};
pub use mempool::MempoolSelector;
pub use mining::MiningProgressCoordinator;
pub use signer::TransactionSigner;
pub use verifier::TransactionVerifier;
