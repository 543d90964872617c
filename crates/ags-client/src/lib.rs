//! ags-client: clients for the AGS relay (`com`) and time-based escrow
//! (`tbe`) endpoints.
//!
//! Both clients talk through a transport trait ([`RelayTransport`],
//! [`EscrowTransport`]) and report through a view trait ([`RelayView`],
//! [`EscrowView`]). [`HttpTransport`] and [`ConsoleView`] are the
//! production implementations.

pub mod config;
pub mod error;
pub mod escrow;
pub mod http;
pub mod identity;
pub mod relay;
pub mod view;

pub use config::ClientConfig;
pub use error::{EscrowError, RelayError};
pub use escrow::{EscrowClient, EscrowTransport, Verification};
pub use http::HttpTransport;
pub use identity::WorkerId;
pub use relay::{ConnectionState, RelayClient, RelayTransport};
pub use view::{ConsoleView, EscrowUpdate, EscrowView, RelayUpdate, RelayView};
