//! Transactions: wire type, signed-message encoding and field validation

pub mod types;
pub mod validation;

pub use types::*;
