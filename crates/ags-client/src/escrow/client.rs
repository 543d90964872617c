use ags_crypto::EscrowKey;
use ags_proto::{EscrowBlob, EscrowRequest, KeyResponse, SignedTimestampRecord};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::stages::{
    decrypt_blob, verify_timestamp, EscrowDeposit, StageTimings, TimestampCheck,
};
use super::transport::EscrowTransport;
use crate::error::EscrowError;
use crate::view::{EscrowStage, EscrowUpdate, EscrowView};

/// Drives the escrow exchanges. Stages share no state: each takes what it
/// needs as arguments and hands back a typed result.
pub struct EscrowClient<T: EscrowTransport> {
    transport: Arc<T>,
    view: Arc<dyn EscrowView>,
}

impl<T: EscrowTransport> EscrowClient<T> {
    pub fn new(transport: Arc<T>, view: Arc<dyn EscrowView>) -> Self {
        Self { transport, view }
    }

    /// Fetch a signed timestamp and verify it.
    pub async fn check_timestamp(&self) -> Result<TimestampCheck, EscrowError> {
        let started = Instant::now();
        let raw = self
            .transport
            .fetch_timestamp()
            .await
            .map_err(|e| self.fail(EscrowStage::Timestamp, e))?;
        let fetch = started.elapsed();

        let record =
            SignedTimestampRecord::parse(&raw).map_err(|e| self.fail(EscrowStage::Timestamp, e.into()))?;
        let issued_at = record.issued_at().ok();
        debug!(time = %record.time, mode = ?record.mode, "signed timestamp received");
        self.view.render(EscrowUpdate::Timestamp {
            raw: raw.clone(),
            record: record.clone(),
            issued_at,
            fetch,
        });

        let report = verify_timestamp(&record);
        if let Some(description) = &report.key_description {
            self.view.render(EscrowUpdate::KeyImported {
                description: description.clone(),
                import: report.import,
            });
        }
        match &report.verification {
            v if v.is_verified() => info!(time = %record.time, "timestamp signature verified"),
            v => warn!(time = %record.time, outcome = %v, "timestamp signature rejected"),
        }
        self.view.render(EscrowUpdate::Verification {
            outcome: report.verification.clone(),
            verify: report.verify,
        });

        Ok(TimestampCheck {
            raw,
            record,
            issued_at,
            key_description: report.key_description,
            verification: report.verification,
            timings: StageTimings {
                fetch,
                import: report.import,
                verify: report.verify,
            },
        })
    }

    /// Ask the service to seal `data` until `time`.
    pub async fn request_escrow(&self, time: i64, data: &str) -> Result<EscrowDeposit, EscrowError> {
        let request = EscrowRequest::new(time, data);
        let raw = self
            .transport
            .request_escrow(&request)
            .await
            .map_err(|e| self.fail(EscrowStage::Escrow, e))?;
        let mut blob =
            EscrowBlob::parse(&raw).map_err(|e| self.fail(EscrowStage::Escrow, e.into()))?;
        blob.stamp_time(time);
        info!(time, "escrow blob stored");
        self.view.render(EscrowUpdate::EscrowStored { raw: raw.clone() });
        Ok(EscrowDeposit { time, raw, blob })
    }

    /// Ask for the key scoped to `time`. A refusal is an error carrying the
    /// service's error value.
    pub async fn request_key(&self, time: i64) -> Result<EscrowKey, EscrowError> {
        let raw = self
            .transport
            .request_key(time)
            .await
            .map_err(|e| self.fail(EscrowStage::Key, e))?;
        self.view.render(EscrowUpdate::KeyReceived { raw: raw.clone() });

        match KeyResponse::parse(&raw).map_err(|e| self.fail(EscrowStage::Key, e.into()))? {
            KeyResponse::Refused(error) => {
                warn!(time, %error, "key request refused");
                self.view.render(EscrowUpdate::KeyRefused(error.clone()));
                Err(EscrowError::KeyRefused(error))
            }
            KeyResponse::Key(k) => {
                let key = EscrowKey::import_b64(&k).map_err(|e| self.fail(EscrowStage::Key, e.into()))?;
                debug!(time, bits = key.bits(), "escrow key imported");
                Ok(key)
            }
        }
    }

    pub fn decrypt(&self, key: &EscrowKey, blob: &EscrowBlob) -> Result<Value, EscrowError> {
        let value = decrypt_blob(key, blob).map_err(|e| self.fail(EscrowStage::Decrypt, e))?;
        info!("escrow blob decrypted");
        self.view.render(EscrowUpdate::Decrypted(value.clone()));
        Ok(value)
    }

    /// Fetch the key for `time` and open `blob` with it.
    pub async fn unlock(&self, time: i64, blob: &EscrowBlob) -> Result<Value, EscrowError> {
        let key = self.request_key(time).await?;
        self.decrypt(&key, blob)
    }

    fn fail(&self, stage: EscrowStage, err: EscrowError) -> EscrowError {
        warn!(?stage, error = %err, "escrow stage failed");
        self.view.render(EscrowUpdate::Failed {
            stage,
            error: err.to_string(),
        });
        err
    }
}
