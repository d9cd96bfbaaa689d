use std::os::fd::AsRawFd;

use super::HandleSet;
use super::Readiness;
use super::Selectable;
use crate::Result;

/// Registers a caller-owned socket or descriptor with the reactor.
///
/// Readiness is passed through as is: the caller reads from the inner value
/// after `select` returns this source, so `consume` does not touch the handle.
#[derive(Debug)]
pub struct SelectableFd<T> {
    inner: T,
}

impl<T: AsRawFd + Send> SelectableFd<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: AsRawFd + Send> Selectable for SelectableFd<T> {
    fn register_handles(
        &self,
        handles: &mut HandleSet,
    ) {
        handles.insert(self.inner.as_raw_fd());
    }

    fn owns_handle(
        &self,
        ready: &HandleSet,
    ) -> bool {
        ready.contains(self.inner.as_raw_fd())
    }

    fn try_consume(&mut self) -> Result<Readiness> {
        Ok(Readiness::NoData)
    }

    fn consume(&mut self) -> Result<Readiness> {
        Ok(Readiness::HasData)
    }
}
