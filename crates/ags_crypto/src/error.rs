use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Invalid nonce: expected {expected} bytes, got {actual}")]
    InvalidNonce { expected: usize, actual: usize },

    #[error("Signature verification could not run: {0}")]
    SignatureVerification(String),

    #[error("AEAD encryption failed")]
    AeadEncrypt,

    #[error("AEAD decryption failed (authentication tag mismatch, wrong key or tampering)")]
    AeadDecrypt,
}
