use std::collections::BTreeSet;
use std::fmt;
use std::os::fd::RawFd;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Result;

/// Whether a complete logical unit is available from a selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    NoData,
    HasData,
}

impl Readiness {
    pub fn has_data(self) -> bool {
        self == Readiness::HasData
    }
}

/// Set of OS handles, used both as the wait set handed to `poll` and as the
/// ready set it produces.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HandleSet {
    fds: BTreeSet<RawFd>,
}

impl HandleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        fd: RawFd,
    ) -> bool {
        self.fds.insert(fd)
    }

    pub fn contains(
        &self,
        fd: RawFd,
    ) -> bool {
        self.fds.contains(&fd)
    }

    pub fn extend(
        &mut self,
        other: &HandleSet,
    ) {
        self.fds.extend(other.fds.iter().copied());
    }

    pub fn first_common(
        &self,
        other: &HandleSet,
    ) -> Option<RawFd> {
        self.fds.intersection(&other.fds).next().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.fds.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.fds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }
}

impl FromIterator<RawFd> for HandleSet {
    fn from_iter<I: IntoIterator<Item = RawFd>>(iter: I) -> Self {
        Self {
            fds: iter.into_iter().collect(),
        }
    }
}

/// A pollable event source.
///
/// OS-level readiness of a handle is only a hint: a readable handle may carry
/// zero, one or several logical units. [`Selectable::try_consume`] and
/// [`Selectable::consume`] are the only authority on whether a unit is ready.
pub trait Selectable: Send {
    /// Adds this source's handles to the wait set.
    fn register_handles(
        &self,
        handles: &mut HandleSet,
    );

    /// True if one of this source's handles is in the post-wait ready set.
    fn owns_handle(
        &self,
        ready: &HandleSet,
    ) -> bool;

    /// Non-blocking check for an already available logical unit. Called by
    /// the reactor before it waits on any handle.
    fn try_consume(&mut self) -> Result<Readiness>;

    /// Services one readiness signal. Only called after `owns_handle`
    /// returned true, so it must not block. Returns `NoData` when the signal
    /// turned out to be spurious.
    fn consume(&mut self) -> Result<Readiness>;
}

/// Registration handle shared between the caller and the reactor.
pub type SharedSelectable = Arc<Mutex<dyn Selectable>>;

/// Identifier the reactor hands out on registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectableId(pub(crate) u64);

impl fmt::Display for SelectableId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "selectable#{}", self.0)
    }
}
