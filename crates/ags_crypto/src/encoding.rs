//! Base64 (standard alphabet, padded) as produced by `java.util.Base64`.

use base64::{engine::general_purpose, Engine as _};

use crate::error::CryptoError;

pub fn decode_b64(b64: &str) -> Result<Vec<u8>, CryptoError> {
    Ok(general_purpose::STANDARD.decode(b64.trim())?)
}

pub fn encode_b64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}
