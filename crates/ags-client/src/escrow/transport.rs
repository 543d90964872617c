use ags_proto::EscrowRequest;
use async_trait::async_trait;

use crate::error::EscrowError;

/// The three exchanges with the escrow service. Each returns the raw
/// response body; parsing happens in the pipeline so the raw text can be
/// shown alongside the result.
#[async_trait]
pub trait EscrowTransport: Send + Sync {
    /// `GET tbe`
    async fn fetch_timestamp(&self) -> Result<String, EscrowError>;

    /// `POST tbe` with `t=<time>&o=<data>`
    async fn request_escrow(&self, request: &EscrowRequest) -> Result<String, EscrowError>;

    /// `GET tbe?t=<time>`
    async fn request_key(&self, time: i64) -> Result<String, EscrowError>;
}
