//! Time-based escrow client.
//!
//! 1. fetch a signed timestamp       `GET tbe`
//! 2. verify it                      (chained after 1)
//! 3. seal data until a time         `POST tbe`
//! 4. fetch the key for a time       `GET tbe?t=`
//! 5. decrypt the sealed data        (chained after 4)

mod client;
pub mod stages;
pub mod transport;

pub use client::EscrowClient;
pub use stages::{
    decrypt_blob, verify_timestamp, EscrowDeposit, StageTimings, TimestampCheck, Verification,
    VerifyReport,
};
pub use transport::EscrowTransport;
