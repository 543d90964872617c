//! Long-poll relay client.
//!
//! One `GET com?w=<worker>` is parked at the relay at any time. When it
//! completes with a message the message is rendered and the next poll is
//! issued straight away; a failure stops the loop, a disconnect aborts it.

mod client;
pub mod state;
pub mod transport;

pub use client::RelayClient;
pub use state::{ConnectionState, PollStage, RelayEvent};
pub use transport::{PollBody, RelayTransport};
