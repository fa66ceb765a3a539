//! Signature verification for ledger transactions
//!
//! Verification never fails across this boundary: every problem is folded into
//! a [`VerificationOutcome`] whose [`VerifyReason`] tells the caller whether no
//! key was supplied, the key or signature was garbage, or the signature simply
//! does not match.

use crate::blockchain::Block;
use crate::crypto::{
    public_key_from_hex, signature_from_hex, verify_message, SIGNATURE_HEX_LEN,
    UNCOMPRESSED_POINT_PREFIX,
};
use crate::transaction::{MessageEncoding, Transaction};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VerifyReason {
    RewardTransaction,
    ValidSignature,
    MissingPublicKey,
    MalformedPublicKey(String),
    MalformedSignature { length: usize },
    VerificationFailure(String),
    SignatureMismatch,
}

impl fmt::Display for VerifyReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VerifyReason::RewardTransaction => write!(f, "reward transaction"),
            VerifyReason::ValidSignature => write!(f, "valid signature"),
            VerifyReason::MissingPublicKey => write!(f, "sender public key not provided"),
            VerifyReason::MalformedPublicKey(msg) => write!(f, "malformed public key: {}", msg),
            VerifyReason::MalformedSignature { length } => write!(
                f,
                "malformed signature: expected {} hex characters, got {}",
                SIGNATURE_HEX_LEN, length
            ),
            VerifyReason::VerificationFailure(msg) => write!(f, "verification error: {}", msg),
            VerifyReason::SignatureMismatch => write!(f, "signature mismatch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    pub valid: bool,
    pub reason: VerifyReason,
}

impl VerificationOutcome {
    fn valid(reason: VerifyReason) -> Self {
        VerificationOutcome {
            valid: true,
            reason,
        }
    }

    fn invalid(reason: VerifyReason) -> Self {
        VerificationOutcome {
            valid: false,
            reason,
        }
    }
}

/// Result for one transaction of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionVerdict {
    pub index: usize,
    pub outcome: VerificationOutcome,
}

/// Strips whitespace and a `0x` prefix, then makes sure the key starts with
/// the uncompressed-point marker. Applying it twice changes nothing.
pub fn normalize_public_key(public_key: &str) -> String {
    let compact: String = public_key.chars().filter(|c| !c.is_whitespace()).collect();
    let unprefixed = compact.strip_prefix("0x").unwrap_or(&compact);
    if unprefixed.starts_with(UNCOMPRESSED_POINT_PREFIX) {
        unprefixed.to_string()
    } else {
        format!("{}{}", UNCOMPRESSED_POINT_PREFIX, unprefixed)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionVerifier {
    encoding: MessageEncoding,
}

impl TransactionVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoding(encoding: MessageEncoding) -> Self {
        TransactionVerifier { encoding }
    }

    pub fn verify(
        &self,
        transaction: &Transaction,
        sender_public_key: Option<&str>,
    ) -> VerificationOutcome {
        if transaction.is_reward() {
            return VerificationOutcome::valid(VerifyReason::RewardTransaction);
        }

        let raw_key = match sender_public_key.map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => return VerificationOutcome::invalid(VerifyReason::MissingPublicKey),
        };

        // Length is checked before touching any curve code
        let length = transaction.signature.len();
        if length != SIGNATURE_HEX_LEN {
            return VerificationOutcome::invalid(VerifyReason::MalformedSignature { length });
        }

        let public_key = match public_key_from_hex(&normalize_public_key(raw_key)) {
            Ok(key) => key,
            Err(e) => return VerificationOutcome::invalid(VerifyReason::MalformedPublicKey(e.to_string())),
        };

        let signature = match signature_from_hex(&transaction.signature) {
            Ok(sig) => sig,
            Err(e) => {
                return VerificationOutcome::invalid(VerifyReason::VerificationFailure(e.to_string()))
            }
        };

        let message = transaction.signable_message(self.encoding);
        match verify_message(&public_key, &message, &signature) {
            Ok(true) => VerificationOutcome::valid(VerifyReason::ValidSignature),
            Ok(false) => VerificationOutcome::invalid(VerifyReason::SignatureMismatch),
            Err(e) => VerificationOutcome::invalid(VerifyReason::VerificationFailure(e.to_string())),
        }
    }

    /// Verifies every transaction in `block`. `keys` maps transaction index to
    /// the sender public key the operator supplied for it.
    pub fn verify_block(
        &self,
        block: &Block,
        keys: &HashMap<usize, String>,
    ) -> Vec<TransactionVerdict> {
        block
            .transactions
            .iter()
            .enumerate()
            .map(|(index, tx)| {
                let outcome = self.verify(tx, keys.get(&index).map(String::as_str));
                if !outcome.valid {
                    tracing::debug!(block = block.index, index, reason = %outcome.reason, "transaction failed verification");
                }
                TransactionVerdict { index, outcome }
            })
            .collect()
    }
}

/// Verifies with the default (concatenated) message encoding.
pub fn verify(transaction: &Transaction, sender_public_key: Option<&str>) -> VerificationOutcome {
    TransactionVerifier::new().verify(transaction, sender_public_key)
}
