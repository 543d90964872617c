//! View-model seam between the clients and whatever shows their output.

use ags_proto::{RelayMessage, SignedTimestampRecord};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

use crate::escrow::Verification;
use crate::relay::ConnectionState;

#[derive(Debug, Clone, PartialEq)]
pub enum RelayUpdate {
    Status(ConnectionState),
    Message(RelayMessage),
    Failed(String),
}

pub trait RelayView: Send + Sync {
    fn render(&self, update: RelayUpdate);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowStage {
    Timestamp,
    Escrow,
    Key,
    Decrypt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EscrowUpdate {
    Timestamp {
        raw: String,
        record: SignedTimestampRecord,
        issued_at: Option<DateTime<Utc>>,
        fetch: Duration,
    },
    KeyImported {
        description: String,
        import: Duration,
    },
    Verification {
        outcome: Verification,
        verify: Duration,
    },
    EscrowStored {
        raw: String,
    },
    KeyReceived {
        raw: String,
    },
    KeyRefused(Value),
    Decrypted(Value),
    Failed {
        stage: EscrowStage,
        error: String,
    },
}

pub trait EscrowView: Send + Sync {
    fn render(&self, update: EscrowUpdate);
}

/// Prints updates to stdout, one line each.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleView;

impl RelayView for ConsoleView {
    fn render(&self, update: RelayUpdate) {
        match update {
            RelayUpdate::Status(state) => println!("[{state}]"),
            RelayUpdate::Message(msg) => match &msg.from {
                Some(from) => println!("{} <{}> {}", msg.recipient, from, msg.body),
                None => println!("{} {}", msg.recipient, msg.body),
            },
            RelayUpdate::Failed(error) => println!("[error] {error}"),
        }
    }
}

impl EscrowView for ConsoleView {
    fn render(&self, update: EscrowUpdate) {
        match update {
            EscrowUpdate::Timestamp {
                raw,
                record,
                issued_at,
                fetch,
            } => {
                println!("response   {raw}");
                println!("t          {}", record.time);
                if let Some(at) = issued_at {
                    println!("time       {}", at.to_rfc3339());
                }
                println!("mode       {}", record.mode.as_deref().unwrap_or("-"));
                println!("fetched in {}ms", fetch.as_millis());
            }
            EscrowUpdate::KeyImported {
                description,
                import,
            } => println!("key        {description} (imported in {}ms)", import.as_millis()),
            EscrowUpdate::Verification { outcome, verify } => {
                println!("signature  {outcome} ({}ms)", verify.as_millis())
            }
            EscrowUpdate::EscrowStored { raw } => println!("escrow     {raw}"),
            EscrowUpdate::KeyReceived { raw } => println!("key resp   {raw}"),
            EscrowUpdate::KeyRefused(error) => println!("refused    {error}"),
            EscrowUpdate::Decrypted(value) => println!("plaintext  {value}"),
            EscrowUpdate::Failed { stage, error } => println!("[{stage:?} failed] {error}"),
        }
    }
}
