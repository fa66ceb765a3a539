//! Transaction signing
//!
//! A signature is `hex(r) ∥ hex(s)` over SHA-256 of the transaction message,
//! 128 lowercase hex characters with no recovery id.

use crate::crypto::{secret_key_from_hex, sign_message};
use crate::error::Result;
use crate::transaction::{amount_to_message_string, MessageEncoding, Transaction};
use crate::wallet::Wallet;

#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionSigner {
    encoding: MessageEncoding,
}

impl TransactionSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoding(encoding: MessageEncoding) -> Self {
        TransactionSigner { encoding }
    }

    pub fn encoding(&self) -> MessageEncoding {
        self.encoding
    }

    /// Signs `sender ∥ recipient ∥ amount` with `private_key_hex`.
    ///
    /// The key is decoded for the duration of the call only.
    pub fn sign(
        &self,
        sender: &str,
        recipient: &str,
        amount: f64,
        private_key_hex: &str,
    ) -> Result<String> {
        let secret_key = secret_key_from_hex(private_key_hex)?;
        let message = self
            .encoding
            .encode(sender, recipient, &amount_to_message_string(amount));
        let signature = sign_message(&secret_key, &message)?;
        Ok(hex::encode(signature))
    }

    /// Builds a transfer from `wallet` and signs it.
    pub fn sign_transfer(
        &self,
        wallet: &Wallet,
        recipient: &str,
        amount: f64,
        fee: f64,
    ) -> Result<Transaction> {
        let tx = Transaction::new(wallet.address.clone(), recipient, amount, fee);
        tx.validate_fields()?;
        let signature = self.sign(&tx.sender, &tx.recipient, tx.amount, &wallet.private_key)?;
        tracing::debug!(sender = %tx.sender, recipient = %tx.recipient, "signed transfer");
        Ok(tx.with_signature(signature))
    }
}

/// Signs with the default (concatenated) message encoding.
pub fn sign(sender: &str, recipient: &str, amount: f64, private_key_hex: &str) -> Result<String> {
    TransactionSigner::new().sign(sender, recipient, amount, private_key_hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::error::ChainError;

    #[test]
    fn test_signature_is_fixed_width_hex() {
        let keypair = KeyPair::generate();
        let signature = sign("Alice", "Bob", 10.0, &keypair.secret_key_hex()).unwrap();
        assert_eq!(signature.len(), 128);
        assert!(signature
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let keypair = KeyPair::generate();
        let key = keypair.secret_key_hex();
        assert_eq!(
            sign("Alice", "Bob", 10.0, &key).unwrap(),
            sign("Alice", "Bob", 10.0, &key).unwrap()
        );
        assert_ne!(
            sign("Alice", "Bob", 10.0, &key).unwrap(),
            sign("Alice", "Bob", 11.0, &key).unwrap()
        );
    }

    #[test]
    fn test_malformed_private_key_is_crypto_error() {
        let result = sign("Alice", "Bob", 10.0, "not-a-key");
        assert!(matches!(result, Err(ChainError::Crypto(_))));

        let result = sign("Alice", "Bob", 10.0, "");
        assert!(matches!(result, Err(ChainError::Crypto(_))));
    }

    #[test]
    fn test_sign_transfer_rejects_bad_fields() {
        let keypair = KeyPair::generate();
        let wallet = Wallet::new("Alice", keypair.public_key_hex(), keypair.secret_key_hex());
        let result = TransactionSigner::new().sign_transfer(&wallet, "", 1.0, 0.0);
        assert!(matches!(result, Err(ChainError::Validation(_))));
    }
}
