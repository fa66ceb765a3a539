//! Cryptographic primitives for SimChain (secp256k1 + SHA-256)

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Length of a hex-encoded `r ∥ s` signature.
pub const SIGNATURE_HEX_LEN: usize = COMPACT_SIGNATURE_SIZE * 2;

/// Marker byte of an uncompressed SEC1 point, as hex.
pub const UNCOMPRESSED_POINT_PREFIX: &str = "04";

/// SHA-256 digest of `message`.
pub fn digest(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}

/// Strips surrounding whitespace and one optional `0x` prefix.
fn trim_hex(input: &str) -> &str {
    let trimmed = input.trim();
    trimmed.strip_prefix("0x").unwrap_or(trimmed)
}

/// Decodes a hex private key into a secp256k1 scalar.
pub fn secret_key_from_hex(hex_str: &str) -> Result<SecretKey, ChainError> {
    let bytes = hex::decode(trim_hex(hex_str))
        .map_err(|e| ChainError::Crypto(format!("Invalid private key hex: {}", e)))?;
    if bytes.len() != SECRET_KEY_SIZE {
        return Err(ChainError::Crypto(format!(
            "Private key must be {} bytes, got {}",
            SECRET_KEY_SIZE,
            bytes.len()
        )));
    }
    SecretKey::from_slice(&bytes)
        .map_err(|e| ChainError::Crypto(format!("Invalid private key scalar: {}", e)))
}

/// Parses a SEC1-encoded public key given as hex.
pub fn public_key_from_hex(hex_str: &str) -> Result<PublicKey, ChainError> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| ChainError::Crypto(format!("Invalid public key hex: {}", e)))?;
    PublicKey::from_slice(&bytes)
        .map_err(|e| ChainError::Crypto(format!("Invalid public key: {}", e)))
}

/// Decodes a 128-character `r ∥ s` hex signature.
///
/// High-S signatures are normalized; libsecp256k1 only accepts the lower form,
/// while other ECDSA implementations may emit either.
pub fn signature_from_hex(signature_hex: &str) -> Result<Signature, ChainError> {
    if signature_hex.len() != SIGNATURE_HEX_LEN {
        return Err(ChainError::Crypto(format!(
            "Signature must be exactly {} hex characters, got {}",
            SIGNATURE_HEX_LEN,
            signature_hex.len()
        )));
    }
    let bytes = hex::decode(signature_hex)
        .map_err(|e| ChainError::Crypto(format!("Invalid signature hex: {}", e)))?;
    let mut signature = Signature::from_compact(&bytes)
        .map_err(|e| ChainError::Crypto(format!("Invalid signature: {}", e)))?;
    signature.normalize_s();
    Ok(signature)
}

/// Signs SHA-256(`message`) and returns the compact `r ∥ s` bytes.
pub fn sign_message(
    secret_key: &SecretKey,
    message: &[u8],
) -> Result<[u8; COMPACT_SIGNATURE_SIZE], ChainError> {
    let message = Message::from_digest(digest(message));
    let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_compact())
}

/// Checks `signature` over SHA-256(`message`). `Ok(false)` means the curve
/// equation does not hold; errors are reserved for the library rejecting input.
pub fn verify_message(
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<bool, ChainError> {
    let message = Message::from_digest(digest(message));
    match SECP256K1_CONTEXT.verify_ecdsa(&message, signature, public_key) {
        Ok(()) => Ok(true),
        Err(secp256k1::Error::IncorrectSignature) => Ok(false),
        Err(e) => Err(ChainError::Crypto(format!("Curve verification failed: {}", e))),
    }
}

/// Key material for signing. Generation exists for tooling and tests; wallets
/// themselves are owned by the caller.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_hex(hex_str: &str) -> Result<Self, ChainError> {
        Ok(Self::from_secret_key(secret_key_from_hex(hex_str)?))
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Uncompressed SEC1 encoding (`04 ∥ x ∥ y`), 130 hex characters.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize_uncompressed())
    }

    /// Raw `x ∥ y` without the marker byte, the form the ledger hands out.
    pub fn raw_public_key_hex(&self) -> String {
        hex::encode(&self.public_key.serialize_uncompressed()[1..])
    }
}
