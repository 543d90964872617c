//! ags_crypto: the two checks the escrow client performs locally.
//!
//! A signed timestamp is checked against the RSA key shipped with it, and an
//! escrow blob is opened with the AES-GCM key the service releases. Both
//! primitives come from the RustCrypto crates; key material for the
//! symmetric side is zeroized on drop.
//!
//! Inputs stay base64 text until the moment they are used, so a malformed
//! blob surfaces as a `CryptoError` from the operation that needed it.
//!
//! # Modules
//! - `encoding`: base64 helpers
//! - `signature`: SPKI RSA import, RSASSA-PKCS1-v1_5/SHA-256 verify
//! - `aead`: raw AES-GCM key import, decrypt
//! - `error`: `CryptoError`

pub mod aead;
pub mod encoding;
pub mod error;
pub mod signature;

pub use aead::EscrowKey;
pub use error::CryptoError;
pub use signature::TimestampKey;
