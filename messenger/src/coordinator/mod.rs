//! Broadcast coordinator
//!
//! A single monitor task owns the registry of subscriber endpoints and processes one
//! request at a time:
//! - **Subscribe / Unsubscribe:** endpoints join and leave at any time
//! - **Broadcast:** fan a message out to every registered endpoint
//! - **Reset / Shutdown:** close every endpoint, the latter permanently

mod config;
mod core;
mod endpoint;
mod handle;
mod messages;

pub use config::MessengerConfig;
pub use endpoint::Endpoint;
pub use handle::Messenger;
pub use messages::{MessengerError, MessengerMetrics, MessengerState};
