//! Messenger - in-process broadcast coordinator
//!
//! A [`Messenger`] fans out broadcast messages to a dynamic set of subscribers. All
//! registry changes go through one monitor task, so subscribe, unsubscribe, broadcast,
//! reset, and shutdown can race freely from any number of tasks.
//!
//! # Delivery policy
//!
//! - `capacity == 0`: a broadcast waits until each consumer has taken the message
//! - `capacity > 0`: a broadcast waits for room in each endpoint's buffer
//! - `capacity > 0` with `drop_on_full`: full endpoints miss the message
//!
//! # Example
//!
//! ```ignore
//! use messenger::Messenger;
//!
//! let messenger = Messenger::new(16, true);
//! let mut endpoint = messenger.subscribe().await?;
//!
//! messenger.broadcast("hello".to_string()).await;
//! while let Some(msg) = endpoint.recv().await {
//!     println!("{msg}");
//! }
//! ```

pub mod coordinator;
pub mod logging;

pub use coordinator::{Endpoint, Messenger, MessengerConfig, MessengerError, MessengerMetrics, MessengerState};
pub use logging::setup_logging;
