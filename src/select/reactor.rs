//! Single-threaded readiness multiplexer.
//!
//! Each [`Reactor::select`] call returns at most one ready source. Starting
//! at the round-robin cursor, every source is first asked for already
//! buffered data (`try_consume`) and then, if one of its handles is readable
//! right now, serviced (`consume`). The first source reporting a logical
//! unit is returned. When none does, the union of all handles is passed to
//! `poll(2)` and the pass is repeated once something became readable.
//!
//! The cursor moves past every returned source, so sources that are ready on
//! every call alternate, whether their data was buffered or signalled.

use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tracing::debug;
use tracing::error;
use tracing::trace;

use super::sys::poll_timeout_ms;
use super::HandleSet;
use super::Readiness;
use super::SelectableId;
use super::SharedSelectable;
use crate::ReactorConfig;
use crate::Result;
use crate::SystemError;
use crate::UsageError;

/// Result of a [`Reactor::select`] call. Failures are the `Err` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// `id` has a logical unit ready. `handle` is the OS handle that woke it,
    /// or `None` when the unit was already buffered.
    Object {
        id: SelectableId,
        handle: Option<RawFd>,
    },
    Timeout,
}

struct Registration {
    id: SelectableId,
    source: SharedSelectable,
}

impl Registration {
    fn same_source(
        &self,
        other: &SharedSelectable,
    ) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.source).cast::<()>(),
            Arc::as_ptr(other).cast::<()>(),
        )
    }
}

pub struct Reactor {
    registry: Vec<Registration>,
    next_id: u64,
    /// Registry index where the next fairness scan starts
    cursor: usize,
    /// Wait bound of [`Reactor::select_default`]
    default_timeout: Option<Duration>,
}

impl Default for Reactor {
    fn default() -> Self {
        Self::with_config(&ReactorConfig::default())
    }
}

impl std::fmt::Debug for Reactor {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("registered", &self.registry.len())
            .field("cursor", &self.cursor)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl Reactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reactor whose [`Reactor::select_default`] waits for the configured
    /// `select_timeout_ms`.
    pub fn with_config(config: &ReactorConfig) -> Self {
        Self {
            registry: Vec::new(),
            next_id: 0,
            cursor: 0,
            default_timeout: config.select_timeout(),
        }
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Registers `source`. Registering the same source twice returns the id
    /// it already has.
    pub fn add_selectable(
        &mut self,
        source: SharedSelectable,
    ) -> SelectableId {
        if let Some(existing) = self.registry.iter().find(|r| r.same_source(&source)) {
            return existing.id;
        }

        let id = SelectableId(self.next_id);
        self.next_id += 1;
        self.registry.push(Registration { id, source });
        debug!(%id, "selectable registered");
        id
    }

    pub fn add_selectables<I>(
        &mut self,
        sources: I,
    ) -> Vec<SelectableId>
    where
        I: IntoIterator<Item = SharedSelectable>,
    {
        sources.into_iter().map(|s| self.add_selectable(s)).collect()
    }

    /// Deregisters `id`. Returns false if it was not registered.
    pub fn remove_selectable(
        &mut self,
        id: SelectableId,
    ) -> bool {
        let Some(index) = self.registry.iter().position(|r| r.id == id) else {
            return false;
        };

        self.registry.remove(index);
        if index < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.registry.len() {
            self.cursor = 0;
        }
        debug!(%id, "selectable removed");
        true
    }

    pub fn contains(
        &self,
        id: SelectableId,
    ) -> bool {
        self.registry.iter().any(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Waits for one source to have a logical unit ready.
    ///
    /// `timeout`: `None` waits forever, `Some(Duration::ZERO)` checks once
    /// without blocking.
    pub fn select(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<SelectOutcome> {
        if self.registry.is_empty() && timeout.is_none() {
            return Err(UsageError::NothingToSelect.into());
        }

        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            let (wait_set, per_source) = self.collect_handles();
            let ready = poll_handles(&wait_set, Some(Duration::ZERO))?;

            if let Some(outcome) = self.scan(&ready, &per_source)? {
                return Ok(outcome);
            }

            // Nothing ready now. Wait for a handle, then rescan; a wakeup that
            // only produced spurious signals keeps waiting.
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            if remaining == Some(Duration::ZERO) {
                return Ok(SelectOutcome::Timeout);
            }
            if poll_handles(&wait_set, remaining)?.is_empty() {
                return Ok(SelectOutcome::Timeout);
            }
        }
    }

    /// [`Reactor::select`] with the configured wait bound.
    pub fn select_default(&mut self) -> Result<SelectOutcome> {
        self.select(self.default_timeout)
    }

    fn rotation(&self) -> impl Iterator<Item = usize> {
        let len = self.registry.len();
        let start = self.cursor;
        (0..len).map(move |step| (start + step) % len)
    }

    fn advance_past(
        &mut self,
        index: usize,
    ) {
        self.cursor = (index + 1) % self.registry.len();
    }

    fn collect_handles(&self) -> (HandleSet, Vec<HandleSet>) {
        let mut wait_set = HandleSet::new();
        let per_source = self
            .registry
            .iter()
            .map(|r| {
                let mut handles = HandleSet::new();
                r.source.lock().register_handles(&mut handles);
                wait_set.extend(&handles);
                handles
            })
            .collect();
        (wait_set, per_source)
    }

    /// One round-robin pass from the cursor. Each source first gets to
    /// report buffered data, then is serviced if one of its handles is in
    /// `ready`.
    fn scan(
        &mut self,
        ready: &HandleSet,
        per_source: &[HandleSet],
    ) -> Result<Option<SelectOutcome>> {
        for index in self.rotation() {
            let registration = &self.registry[index];
            let id = registration.id;
            let mut source = registration.source.lock();

            if source.try_consume()?.has_data() {
                drop(source);
                self.advance_past(index);
                trace!(%id, "cached data ready");
                return Ok(Some(SelectOutcome::Object { id, handle: None }));
            }

            if !source.owns_handle(ready) {
                continue;
            }

            match source.consume()? {
                Readiness::HasData => {
                    drop(source);
                    let handle = per_source[index].first_common(ready);
                    self.advance_past(index);
                    trace!(%id, ?handle, "handle ready");
                    return Ok(Some(SelectOutcome::Object { id, handle }));
                }
                Readiness::NoData => {
                    trace!(%id, "spurious wakeup");
                }
            }
        }
        Ok(None)
    }
}

/// Waits on `handles`, retrying on signal interruption with the remaining
/// time. Returns the handles that became readable, empty on timeout. A handle
/// that is not an open descriptor is an error.
fn poll_handles(
    handles: &HandleSet,
    timeout: Option<Duration>,
) -> Result<HandleSet> {
    let mut pollfds: Vec<libc::pollfd> = handles
        .iter()
        .map(|fd| libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();
    let nfds = pollfds.len();
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut remaining = timeout;

    loop {
        // SAFETY: `pollfds` is a live buffer of exactly `nfds` entries.
        let rc = unsafe {
            libc::poll(
                pollfds.as_mut_ptr(),
                nfds as libc::nfds_t,
                poll_timeout_ms(remaining),
            )
        };
        if rc >= 0 {
            break;
        }

        let source = io::Error::last_os_error();
        if source.kind() != io::ErrorKind::Interrupted {
            error!(nfds, "poll failed: {}", source);
            return Err(SystemError::Poll { nfds, source }.into());
        }
        remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
    }

    if let Some(stale) = pollfds.iter().find(|p| p.revents & libc::POLLNVAL != 0) {
        error!(fd = stale.fd, "registered handle is not open");
        return Err(SystemError::InvalidHandle { fd: stale.fd }.into());
    }

    Ok(pollfds
        .iter()
        .filter(|p| p.revents & (libc::POLLIN | libc::POLLERR | libc::POLLHUP) != 0)
        .map(|p| p.fd)
        .collect())
}
