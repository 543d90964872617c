use ags_crypto::encoding::decode_b64;
use ags_crypto::{EscrowKey, TimestampKey};
use ags_proto::{EscrowBlob, SignedTimestampRecord};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::EscrowError;

/// Outcome of checking a signed timestamp. A signature that does not match
/// and a check that could not run are kept apart here even though both
/// display as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified,
    Failed,
    Errored(String),
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verification::Verified => "Verified",
            Verification::Failed | Verification::Errored(_) => "FAILED",
        }
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verification::Errored(reason) => write!(f, "FAILED (could not verify: {reason})"),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub fetch: Duration,
    pub import: Duration,
    pub verify: Duration,
}

#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub verification: Verification,
    /// Present when the public key imported.
    pub key_description: Option<String>,
    pub import: Duration,
    pub verify: Duration,
}

/// Stages 1 and 2 together.
#[derive(Debug, Clone)]
pub struct TimestampCheck {
    pub raw: String,
    pub record: SignedTimestampRecord,
    pub issued_at: Option<DateTime<Utc>>,
    pub key_description: Option<String>,
    pub verification: Verification,
    pub timings: StageTimings,
}

/// Stage 3 result: the sealed blob and the time it unlocks at.
#[derive(Debug, Clone)]
pub struct EscrowDeposit {
    pub time: i64,
    pub raw: String,
    pub blob: EscrowBlob,
}

/// Import the record's SPKI key and check its signature over the
/// reconstructed `"<t>:<m>"` bytes.
pub fn verify_timestamp(record: &SignedTimestampRecord) -> VerifyReport {
    let started = Instant::now();
    let imported = TimestampKey::from_spki_b64(&record.public_key);
    let import = started.elapsed();

    let key = match imported {
        Ok(key) => key,
        Err(err) => {
            return VerifyReport {
                verification: Verification::Errored(err.to_string()),
                key_description: None,
                import,
                verify: Duration::ZERO,
            }
        }
    };

    let started = Instant::now();
    let verification = match decode_b64(&record.signature)
        .and_then(|sig| key.verify(&record.signed_bytes(), &sig))
    {
        Ok(true) => Verification::Verified,
        Ok(false) => Verification::Failed,
        Err(err) => Verification::Errored(err.to_string()),
    };

    VerifyReport {
        verification,
        key_description: Some(key.describe()),
        import,
        verify: started.elapsed(),
    }
}

/// AES-GCM open the blob and parse the plaintext as JSON.
pub fn decrypt_blob(key: &EscrowKey, blob: &EscrowBlob) -> Result<Value, EscrowError> {
    let iv = blob.iv().map_err(|_| EscrowError::IncompleteBlob("iv"))?;
    let ct = blob.ct().map_err(|_| EscrowError::IncompleteBlob("ct"))?;
    let plaintext = key.decrypt_b64(iv, ct)?;
    let text =
        std::str::from_utf8(&plaintext).map_err(|e| EscrowError::Plaintext(e.to_string()))?;
    serde_json::from_str(text).map_err(|e| EscrowError::Plaintext(e.to_string()))
}
