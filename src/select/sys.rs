//! Thin wrappers over the libc calls used by the selectables.
//!
//! Every call that can be interrupted by a signal is retried here so callers
//! never observe `EINTR`.

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use crate::constants::COUNTER_SIZE;

/// Outcome of reading an 8-byte kernel counter (timerfd/eventfd)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CounterRead {
    Value(u64),
    /// Non-blocking descriptor with nothing pending
    WouldBlock,
    /// Fewer than 8 bytes came back
    Short(usize),
}

/// Runs a libc call that reports failure as `-1`, retrying while it is
/// interrupted by a signal.
pub(crate) fn retry_eintr<F>(mut call: F) -> io::Result<isize>
where
    F: FnMut() -> isize,
{
    loop {
        let rc = call();
        if rc != -1 {
            return Ok(rc);
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

pub(crate) fn read_counter(fd: RawFd) -> io::Result<CounterRead> {
    let mut buf = [0u8; COUNTER_SIZE];

    let result = retry_eintr(|| {
        // SAFETY: `buf` is a live, writable buffer of exactly COUNTER_SIZE bytes.
        unsafe { libc::read(fd, buf.as_mut_ptr().cast::<libc::c_void>(), COUNTER_SIZE) as isize }
    });

    match result {
        Ok(n) if n as usize == COUNTER_SIZE => Ok(CounterRead::Value(u64::from_ne_bytes(buf))),
        Ok(n) => Ok(CounterRead::Short(n as usize)),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(CounterRead::WouldBlock),
        Err(e) => Err(e),
    }
}

/// Adds `value` to an eventfd counter. Returns `Ok(false)` if the counter is
/// saturated and the write would block.
pub(crate) fn write_counter(
    fd: RawFd,
    value: u64,
) -> io::Result<bool> {
    let buf = value.to_ne_bytes();

    let result = retry_eintr(|| {
        // SAFETY: `buf` is a live, readable buffer of exactly COUNTER_SIZE bytes.
        unsafe { libc::write(fd, buf.as_ptr().cast::<libc::c_void>(), COUNTER_SIZE) as isize }
    });

    match result {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
        Err(e) => Err(e),
    }
}

pub(crate) fn to_timespec(d: Duration) -> libc::timespec {
    libc::timespec {
        tv_sec: d.as_secs() as libc::time_t,
        tv_nsec: d.subsec_nanos() as libc::c_long,
    }
}

/// Milliseconds for `poll(2)`, rounded up so a sub-millisecond wait does not
/// degrade into a busy poll. `None` maps to an infinite wait.
pub(crate) fn poll_timeout_ms(timeout: Option<Duration>) -> libc::c_int {
    match timeout {
        None => -1,
        Some(d) => {
            let ms = d.as_micros().div_ceil(1_000);
            ms.min(libc::c_int::MAX as u128) as libc::c_int
        }
    }
}
