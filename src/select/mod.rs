//! Readiness multiplexing over heterogeneous event sources.
//!
//! Timers, in-process events, raw descriptors and table subscribers all
//! implement [`Selectable`] and are driven by one [`Reactor`].

mod event;
mod fd;
mod reactor;
mod selectable;
pub(crate) mod sys;
mod timer;

pub use event::*;
pub use fd::*;
pub use reactor::*;
pub use selectable::*;
pub use timer::*;

#[cfg(test)]
mod timer_test;
