use std::io;
use std::os::fd::AsRawFd;
use std::os::fd::FromRawFd;
use std::os::fd::OwnedFd;
use std::os::fd::RawFd;
use std::sync::Arc;

use tracing::error;
use tracing::trace;

use super::sys::read_counter;
use super::sys::write_counter;
use super::sys::CounterRead;
use super::HandleSet;
use super::Readiness;
use super::Selectable;
use crate::constants::COUNTER_SIZE;
use crate::Result;
use crate::SystemError;

/// Non-blocking `eventfd` counter.
///
/// Any number of `notify` calls between two `drain` calls collapse into one
/// readiness signal.
#[derive(Debug)]
pub struct EventFd {
    fd: OwnedFd,
}

impl EventFd {
    pub fn new() -> Result<Self> {
        // SAFETY: eventfd takes no pointers.
        let raw = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if raw == -1 {
            let source = io::Error::last_os_error();
            error!("failed to create eventfd: {}", source);
            return Err(SystemError::EventCreate { source }.into());
        }

        // SAFETY: `raw` is a freshly created descriptor that nothing else owns.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        Ok(Self { fd })
    }

    pub fn notify(&self) -> Result<()> {
        let fd = self.fd.as_raw_fd();
        match write_counter(fd, 1) {
            // A saturated counter (`false`) is still readable.
            Ok(_) => Ok(()),
            Err(source) => Err(SystemError::EventWrite { fd, source }.into()),
        }
    }

    /// Resets the counter, returning how many notifications it held.
    pub fn drain(&self) -> Result<u64> {
        let fd = self.fd.as_raw_fd();
        match read_counter(fd) {
            Ok(CounterRead::Value(n)) => Ok(n),
            Ok(CounterRead::WouldBlock) => Ok(0),
            Ok(CounterRead::Short(actual)) => Err(SystemError::ShortRead {
                fd,
                expected: COUNTER_SIZE,
                actual,
            }
            .into()),
            Err(source) => Err(SystemError::EventRead { fd, source }.into()),
        }
    }

    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

/// Cloneable handle that wakes a [`SelectableEvent`] from any thread.
#[derive(Debug, Clone)]
pub struct EventNotifier {
    event: Arc<EventFd>,
}

impl EventNotifier {
    pub fn notify(&self) -> Result<()> {
        self.event.notify()
    }
}

/// In-process event object for the reactor.
#[derive(Debug)]
pub struct SelectableEvent {
    event: Arc<EventFd>,
    pending: u64,
}

impl SelectableEvent {
    pub fn new() -> Result<Self> {
        Ok(Self {
            event: Arc::new(EventFd::new()?),
            pending: 0,
        })
    }

    pub fn notify(&self) -> Result<()> {
        self.event.notify()
    }

    pub fn notifier(&self) -> EventNotifier {
        EventNotifier {
            event: self.event.clone(),
        }
    }

    /// Notifications collapsed into the last consumed signal
    pub fn pending(&self) -> u64 {
        self.pending
    }
}

impl Selectable for SelectableEvent {
    fn register_handles(
        &self,
        handles: &mut HandleSet,
    ) {
        handles.insert(self.event.raw_fd());
    }

    fn owns_handle(
        &self,
        ready: &HandleSet,
    ) -> bool {
        ready.contains(self.event.raw_fd())
    }

    fn try_consume(&mut self) -> Result<Readiness> {
        Ok(Readiness::NoData)
    }

    fn consume(&mut self) -> Result<Readiness> {
        self.pending = self.event.drain()?;
        trace!(fd = self.event.raw_fd(), count = self.pending, "event drained");

        if self.pending > 0 {
            Ok(Readiness::HasData)
        } else {
            Ok(Readiness::NoData)
        }
    }
}
