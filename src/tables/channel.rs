use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::DbConnector;
use crate::EventFd;
use crate::KeyQueue;
use crate::Result;
use crate::StateStore;

/// Per-table FIFO of changed keys.
///
/// Entries carry only the key. A key already waiting in the channel is not
/// queued again, and an entry may reference a key whose record is already
/// gone. Any number of producers push and any number of consumers pop
/// concurrently; each entry is delivered to exactly one popper.
#[derive(Clone)]
pub struct NotificationChannel {
    store: Arc<dyn StateStore>,
    queue: KeyQueue,
}

impl std::fmt::Debug for NotificationChannel {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("name", &self.queue.list())
            .finish_non_exhaustive()
    }
}

impl NotificationChannel {
    pub fn new(
        db: &DbConnector,
        table: &str,
    ) -> Self {
        Self {
            store: db.store().clone(),
            queue: KeyQueue::for_table(table),
        }
    }

    /// `_{table}_KEY_QUEUE`
    pub fn channel_name(table: &str) -> String {
        KeyQueue::for_table(table).list().to_string()
    }

    pub fn name(&self) -> &str {
        self.queue.list()
    }

    pub(crate) fn queue(&self) -> &KeyQueue {
        &self.queue
    }

    pub(crate) fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Appends `key` unless it is already waiting. Returns whether a new
    /// entry was appended. Never blocks.
    pub fn push(
        &self,
        key: &str,
    ) -> Result<bool> {
        let queued = self.store.enqueue(&self.queue, key)?;
        trace!(channel = self.name(), key, queued, "notification pushed");
        Ok(queued)
    }

    /// Oldest entry, or `None` once `timeout` elapses. `None` waits forever,
    /// `Some(Duration::ZERO)` only checks.
    pub fn pop_blocking(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<String>> {
        self.store.dequeue(&self.queue, timeout)
    }

    pub fn len(&self) -> Result<u64> {
        self.store.queue_len(&self.queue)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Signals `waker` on every new entry while `waker` is alive.
    pub fn attach_waker(
        &self,
        waker: &Arc<EventFd>,
    ) -> Result<()> {
        self.store.attach_queue_waker(&self.queue, Arc::downgrade(waker))
    }
}
