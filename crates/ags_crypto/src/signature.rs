//! Signed-timestamp verification.
//!
//! The escrow service signs with `SHA256withRSA` and ships its public key as
//! an X.509 `SubjectPublicKeyInfo` (SPKI) DER blob. On our side that is an
//! RSASSA-PKCS1-v1_5 verifying key over SHA-256.

use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};

use crate::encoding::decode_b64;
use crate::error::CryptoError;

pub const SIGNATURE_ALGORITHM: &str = "RSASSA-PKCS1-v1_5";
pub const SIGNATURE_HASH: &str = "SHA-256";

/// Verify-only RSA key imported from SPKI DER.
#[derive(Debug, Clone)]
pub struct TimestampKey {
    key: VerifyingKey<Sha256>,
    modulus_bits: usize,
    fingerprint: String,
}

impl TimestampKey {
    pub fn from_spki_der(der: &[u8]) -> Result<Self, CryptoError> {
        let public = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| CryptoError::InvalidKey(format!("spki: {e}")))?;
        let modulus_bits = public.size() * 8;
        let digest = Sha256::digest(der);
        Ok(Self {
            key: VerifyingKey::<Sha256>::new(public),
            modulus_bits,
            fingerprint: hex::encode(&digest[..8]),
        })
    }

    pub fn from_spki_b64(b64: &str) -> Result<Self, CryptoError> {
        Self::from_spki_der(&decode_b64(b64)?)
    }

    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }

    /// First 8 bytes of SHA-256 over the SPKI DER, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// One-line summary: algorithm, hash, modulus size, usages, fingerprint.
    pub fn describe(&self) -> String {
        format!(
            "public {} {} {} verify ({})",
            SIGNATURE_ALGORITHM, SIGNATURE_HASH, self.modulus_bits, self.fingerprint
        )
    }

    /// `Ok(false)` for a signature that does not match; `Err` only when the
    /// signature bytes cannot even be interpreted.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let signature = Signature::try_from(signature)
            .map_err(|e| CryptoError::SignatureVerification(e.to_string()))?;
        Ok(self.key.verify(message, &signature).is_ok())
    }
}
