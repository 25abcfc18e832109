//! Ed25519 key validation and signature verification
//!
//! Public keys and signatures travel as base58 strings. Every check here is
//! fail-closed: malformed input yields `false`, never an error.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Ed25519 public key length in bytes
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length in bytes
pub const SIGNATURE_LENGTH: usize = 64;

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Crypto operation errors
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Base58 decode error: {0}")]
    Base58(String),
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Signature verification failed")]
    VerificationFailed,
}

/// Decode a base58 string into raw bytes
pub fn decode_base58(value: &str) -> CryptoResult<Vec<u8>> {
    bs58::decode(value)
        .into_vec()
        .map_err(|e| CryptoError::Base58(e.to_string()))
}

/// Check that a base58 string decodes to exactly 32 bytes
pub fn validate_public_key(public_key: &str) -> bool {
    match decode_base58(public_key) {
        Ok(bytes) => bytes.len() == PUBLIC_KEY_LENGTH,
        Err(_) => false,
    }
}

/// Verify a detached Ed25519 signature.
///
/// Both `signature` and `public_key` are base58. Length mismatches return
/// `false` before any curve arithmetic runs.
pub fn verify_signature(message: &[u8], signature: &str, public_key: &str) -> bool {
    match try_verify(message, signature, public_key) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Signature verification error: {}", e);
            false
        }
    }
}

fn try_verify(message: &[u8], signature: &str, public_key: &str) -> CryptoResult<()> {
    let sig_bytes = decode_base58(signature)?;
    let key_bytes = decode_base58(public_key)?;

    let sig_array: [u8; SIGNATURE_LENGTH] = sig_bytes.try_into().map_err(|b: Vec<u8>| {
        CryptoError::InvalidSignature(format!(
            "Ed25519 signature must be {} bytes, got {}",
            SIGNATURE_LENGTH,
            b.len()
        ))
    })?;
    let key_array: [u8; PUBLIC_KEY_LENGTH] = key_bytes.try_into().map_err(|b: Vec<u8>| {
        CryptoError::InvalidPublicKey(format!(
            "Ed25519 key must be {} bytes, got {}",
            PUBLIC_KEY_LENGTH,
            b.len()
        ))
    })?;

    let verifying_key = VerifyingKey::from_bytes(&key_array)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    let signature = Signature::from_bytes(&sig_array);

    verifying_key
        .verify(message, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}
