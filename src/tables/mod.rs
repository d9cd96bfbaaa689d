//! Table state propagation.
//!
//! A [`ProducerStateTable`] writes records into the shared store and appends
//! the touched key to the table's [`NotificationChannel`]. A
//! [`SubscriberStateTable`] pops keys from that channel and resolves each one
//! against the store at pop time, so it always observes the latest state of a
//! key and never replays intermediate values.

mod channel;
mod producer;
mod subscriber;
mod table;
mod types;

pub use channel::*;
pub use producer::*;
pub use subscriber::*;
pub use table::*;
pub use types::*;

#[cfg(test)]
mod channel_test;
