//! Table state propagation over a shared key-value store, driven by a
//! single-threaded readiness reactor.
//!
//! - [`ProducerStateTable`] writes records and announces changed keys.
//! - [`SubscriberStateTable`] resolves announced keys into
//!   [`KeyOpFieldsValues`] observations of their latest state.
//! - [`Reactor`] multiplexes subscribers, [`SelectableTimer`]s,
//!   [`SelectableEvent`]s and raw descriptors ([`SelectableFd`]).

mod config;
mod constants;
mod errors;
mod select;
mod store;
mod tables;

pub use config::*;
pub use constants::*;
pub use errors::*;
pub use select::*;
pub use store::*;
pub use tables::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
