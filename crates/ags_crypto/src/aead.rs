//! AES-GCM for escrow blobs.
//!
//! Key: raw 16 or 32 bytes, released by the escrow service once the target
//! time has passed. IV: 12 bytes (the JCE `AES/GCM/NoPadding` default).
//! Tag: 16 bytes, appended to the ciphertext.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Aes256Gcm, Nonce,
};
use zeroize::Zeroizing;

use crate::encoding::decode_b64;
use crate::error::CryptoError;

pub const IV_LEN: usize = 12;

/// Decrypt-only symmetric key scoped to one escrow time value.
pub struct EscrowKey {
    material: Zeroizing<Vec<u8>>,
}

impl EscrowKey {
    pub fn import_raw(bytes: &[u8]) -> Result<Self, CryptoError> {
        match bytes.len() {
            16 | 32 => Ok(Self {
                material: Zeroizing::new(bytes.to_vec()),
            }),
            n => Err(CryptoError::InvalidKey(format!(
                "AES-GCM key must be 16 or 32 bytes, got {n}"
            ))),
        }
    }

    pub fn import_b64(b64: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(decode_b64(b64)?);
        Self::import_raw(&bytes)
    }

    pub fn bits(&self) -> usize {
        self.material.len() * 8
    }

    pub fn decrypt(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let nonce = nonce(iv)?;
        let plaintext = match self.material.len() {
            16 => Aes128Gcm::new_from_slice(&self.material)
                .map_err(|_| CryptoError::AeadDecrypt)?
                .decrypt(nonce, ciphertext),
            _ => Aes256Gcm::new_from_slice(&self.material)
                .map_err(|_| CryptoError::AeadDecrypt)?
                .decrypt(nonce, ciphertext),
        }
        .map_err(|_| CryptoError::AeadDecrypt)?;
        Ok(Zeroizing::new(plaintext))
    }

    /// Decrypt with IV and ciphertext still in their base64 wire form.
    pub fn decrypt_b64(&self, iv_b64: &str, ct_b64: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let iv = decode_b64(iv_b64)?;
        let ct = decode_b64(ct_b64)?;
        self.decrypt(&iv, &ct)
    }

    /// Inverse of [`EscrowKey::decrypt`]; the service side of the exchange.
    pub fn encrypt(&self, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = nonce(iv)?;
        let ciphertext = match self.material.len() {
            16 => Aes128Gcm::new_from_slice(&self.material)
                .map_err(|_| CryptoError::AeadEncrypt)?
                .encrypt(nonce, plaintext),
            _ => Aes256Gcm::new_from_slice(&self.material)
                .map_err(|_| CryptoError::AeadEncrypt)?
                .encrypt(nonce, plaintext),
        };
        ciphertext.map_err(|_| CryptoError::AeadEncrypt)
    }
}

impl std::fmt::Debug for EscrowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowKey").field("bits", &self.bits()).finish()
    }
}

fn nonce(iv: &[u8]) -> Result<&Nonce<aes_gcm::aead::consts::U12>, CryptoError> {
    if iv.len() != IV_LEN {
        return Err(CryptoError::InvalidNonce {
            expected: IV_LEN,
            actual: iv.len(),
        });
    }
    Ok(Nonce::from_slice(iv))
}
