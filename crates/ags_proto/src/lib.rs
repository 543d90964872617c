//! ags_proto: wire types for the relay and escrow endpoints
//!
//! Both endpoints speak urlencoded forms on the way in and JSON on the way
//! out. Binary values (keys, signatures, IVs, ciphertexts) stay as base64
//! text in this crate; decoding them is `ags_crypto`'s job.
//!
//! # Modules
//! - `relay`: long-poll message, outgoing message form, relay stats line
//! - `escrow`: signed timestamp, escrow request/blob, key response
//! - `error`: protocol error type

pub mod error;
pub mod escrow;
pub mod relay;

mod text;

pub use error::ProtoError;
pub use escrow::{EscrowBlob, EscrowRequest, KeyResponse, SignedTimestampRecord};
pub use relay::{OutgoingMessage, RelayMessage, RelayStats};
