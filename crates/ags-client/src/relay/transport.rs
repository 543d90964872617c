use ags_proto::OutgoingMessage;
use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RelayError;
use crate::identity::WorkerId;

/// Body of a parked receive request, read as it trickles in.
#[async_trait]
pub trait PollBody: Send {
    /// Next chunk, `None` once the relay completed the response.
    async fn chunk(&mut self) -> Result<Option<Bytes>, RelayError>;
}

#[async_trait]
pub trait RelayTransport: Send + Sync + 'static {
    /// Issue `GET com?w=<worker>`; resolves once response headers are in.
    async fn open_poll(&self, worker: &WorkerId) -> Result<Box<dyn PollBody>, RelayError>;

    /// `POST com` with the urlencoded message form.
    async fn send(&self, message: &OutgoingMessage) -> Result<(), RelayError>;

    /// Raw `GET com?i=1` stats line.
    async fn stats(&self) -> Result<String, RelayError>;
}
