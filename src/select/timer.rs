use std::io;
use std::os::fd::AsRawFd;
use std::os::fd::FromRawFd;
use std::os::fd::OwnedFd;
use std::os::fd::RawFd;
use std::ptr;
use std::time::Duration;

use tracing::debug;
use tracing::error;
use tracing::trace;

use super::sys::read_counter;
use super::sys::retry_eintr;
use super::sys::to_timespec;
use super::sys::CounterRead;
use super::HandleSet;
use super::Readiness;
use super::Selectable;
use crate::constants::COUNTER_SIZE;
use crate::Result;
use crate::SystemError;

/// Smallest arming value; timerfd treats a zero initial expiration as disarm.
const IMMEDIATE: Duration = Duration::from_nanos(1);

/// Periodic or one-shot timer backed by a `timerfd`.
///
/// The handle becomes readable once after the initial delay and then every
/// period. A zero period makes the timer one-shot.
#[derive(Debug)]
pub struct SelectableTimer {
    fd: OwnedFd,
    initial: Duration,
    period: Duration,
    expirations: u64,
}

impl SelectableTimer {
    /// Timer whose initial delay and period are both `interval`.
    pub fn new(interval: Duration) -> Result<Self> {
        Self::with_schedule(interval, interval)
    }

    pub fn with_schedule(
        initial: Duration,
        period: Duration,
    ) -> Result<Self> {
        // SAFETY: timerfd_create takes no pointers.
        let raw = unsafe {
            libc::timerfd_create(libc::CLOCK_MONOTONIC, libc::TFD_NONBLOCK | libc::TFD_CLOEXEC)
        };
        if raw == -1 {
            let source = io::Error::last_os_error();
            error!("failed to create timerfd: {}", source);
            return Err(SystemError::TimerCreate { source }.into());
        }

        // SAFETY: `raw` is a freshly created descriptor that nothing else owns.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        debug!(fd = raw, ?initial, ?period, "timer created");

        Ok(Self {
            fd,
            initial,
            period,
            expirations: 0,
        })
    }

    /// Updates initial delay and period to `interval`. Does not arm.
    pub fn set_interval(
        &mut self,
        interval: Duration,
    ) {
        self.set_schedule(interval, interval);
    }

    /// Does not arm.
    pub fn set_schedule(
        &mut self,
        initial: Duration,
        period: Duration,
    ) {
        self.initial = initial;
        self.period = period;
    }

    pub fn schedule(&self) -> (Duration, Duration) {
        (self.initial, self.period)
    }

    /// Arms the timer with the configured schedule, replacing any running one.
    pub fn start(&self) -> Result<()> {
        let initial = if self.initial.is_zero() && !self.period.is_zero() {
            IMMEDIATE
        } else {
            self.initial
        };
        self.settime(initial, self.period)
    }

    /// Disarms the timer.
    pub fn stop(&self) -> Result<()> {
        self.settime(Duration::ZERO, Duration::ZERO)
    }

    /// True while an expiration is scheduled.
    pub fn is_armed(&self) -> Result<bool> {
        // SAFETY: itimerspec is plain old data; all-zero is a valid value.
        let mut current: libc::itimerspec = unsafe { std::mem::zeroed() };
        let fd = self.fd.as_raw_fd();
        retry_eintr(|| {
            // SAFETY: `current` is a valid, writable itimerspec.
            unsafe { libc::timerfd_gettime(fd, &mut current) as isize }
        })
        .map_err(|source| SystemError::TimerRead { fd, source })?;

        Ok(current.it_value.tv_sec != 0 || current.it_value.tv_nsec != 0)
    }

    /// Expiration count returned by the last successful `consume`.
    pub fn expirations(&self) -> u64 {
        self.expirations
    }

    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    fn settime(
        &self,
        value: Duration,
        interval: Duration,
    ) -> Result<()> {
        let spec = libc::itimerspec {
            it_interval: to_timespec(interval),
            it_value: to_timespec(value),
        };
        let fd = self.fd.as_raw_fd();

        retry_eintr(|| {
            // SAFETY: `spec` outlives the call; the old-value pointer may be null.
            unsafe { libc::timerfd_settime(fd, 0, &spec, ptr::null_mut()) as isize }
        })
        .map_err(|source| {
            error!(fd, "failed to set timerfd: {}", source);
            SystemError::TimerArm { fd, source }
        })?;

        trace!(fd, ?value, ?interval, "timer armed");
        Ok(())
    }
}

impl Selectable for SelectableTimer {
    fn register_handles(
        &self,
        handles: &mut HandleSet,
    ) {
        handles.insert(self.fd.as_raw_fd());
    }

    fn owns_handle(
        &self,
        ready: &HandleSet,
    ) -> bool {
        ready.contains(self.fd.as_raw_fd())
    }

    /// A firing is signalled by the handle alone, there is nothing to buffer.
    fn try_consume(&mut self) -> Result<Readiness> {
        Ok(Readiness::NoData)
    }

    fn consume(&mut self) -> Result<Readiness> {
        let fd = self.fd.as_raw_fd();

        match read_counter(fd) {
            Ok(CounterRead::Value(n)) => {
                self.expirations = n;
                trace!(fd, expirations = n, "timer fired");
                Ok(Readiness::HasData)
            }
            // Stopped or re-armed between poll and read.
            Ok(CounterRead::WouldBlock) => Ok(Readiness::NoData),
            Ok(CounterRead::Short(actual)) => {
                error!(fd, actual, "short read on timerfd");
                Err(SystemError::ShortRead {
                    fd,
                    expected: COUNTER_SIZE,
                    actual,
                }
                .into())
            }
            Err(source) => {
                error!(fd, "read failed: {}", source);
                Err(SystemError::TimerRead { fd, source }.into())
            }
        }
    }
}
