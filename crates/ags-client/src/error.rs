use ags_crypto::CryptoError;
use ags_proto::ProtoError;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("relay answered with status {0}")]
    Status(u16),
    #[error(transparent)]
    Proto(#[from] ProtoError),
    #[error("already connected")]
    AlreadyConnected,
    #[error("worker id must not be empty")]
    EmptyWorkerId,
}

#[derive(Debug, Error)]
pub enum EscrowError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("escrow service answered with status {0}")]
    Status(u16),
    #[error(transparent)]
    Proto(#[from] ProtoError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("key request refused: {0}")]
    KeyRefused(Value),
    #[error("escrow blob has no {0} field")]
    IncompleteBlob(&'static str),
    #[error("plaintext is not UTF-8 JSON: {0}")]
    Plaintext(String),
}
