//! Shared state store seam.
//!
//! Producers and consumers only talk to the store through [`StateStore`]:
//! hashes (key → field map) hold table records and [`KeyQueue`]s carry change
//! notifications. [`MemStore`] is the in-process implementation; a network
//! client plugs in by implementing the same trait.

mod connector;
mod mem_store;
mod pattern;

pub use connector::*;
pub use mem_store::*;
pub(crate) use pattern::glob_match;


use std::sync::Weak;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use crate::constants::NOTIFICATION_QUEUE_SUFFIX;
use crate::constants::PENDING_SET_SUFFIX;
use crate::EventFd;
use crate::Result;

/// `(field, value)` pair of a table record
pub type FieldValue = (String, String);

/// Mutation applied to one hash record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordWrite {
    /// Writes the given fields, keeping the others
    Merge(Vec<FieldValue>),
    /// Removes the whole record
    Delete,
    /// Removes the named fields; the record goes away with its last field
    DeleteFields(Vec<String>),
}

/// FIFO of members paired with the set of members currently queued in it.
///
/// A member already waiting in the queue is not queued a second time, so a
/// queue never holds more entries than distinct members.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyQueue {
    list: String,
    pending: String,
}

impl KeyQueue {
    /// Queue of table `table`: `_{table}_KEY_QUEUE`, pending set
    /// `_{table}_KEY_SET`.
    pub fn for_table(table: &str) -> Self {
        Self {
            list: format!("_{}{}", table, NOTIFICATION_QUEUE_SUFFIX),
            pending: format!("_{}{}", table, PENDING_SET_SUFFIX),
        }
    }

    pub fn list(&self) -> &str {
        &self.list
    }

    /// Key of the pending set. Stores reserve it along with the list.
    pub(crate) fn pending(&self) -> &str {
        &self.pending
    }
}

#[cfg_attr(test, automock)]
pub trait StateStore: Send + Sync + 'static {
    /// Writes `fields` into the hash at `key`, creating it if needed. Fields
    /// not mentioned keep their value.
    fn hset(
        &self,
        key: &str,
        fields: &[FieldValue],
    ) -> Result<()>;

    /// All fields of the hash at `key`; empty if the key does not exist.
    fn hgetall(
        &self,
        key: &str,
    ) -> Result<Vec<FieldValue>>;

    fn hget(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<String>>;

    fn exists(
        &self,
        key: &str,
    ) -> Result<bool>;

    /// Removes `key` whatever it holds. Returns whether it existed.
    fn del(
        &self,
        key: &str,
    ) -> Result<bool>;

    /// Removes `fields` from the hash at `key`, dropping the key once it has
    /// no field left. Returns the number of fields removed.
    fn hdel(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<u64>;

    /// Keys matching a glob `pattern` (`*`, `?`, `\` escapes).
    fn keys(
        &self,
        pattern: &str,
    ) -> Result<Vec<String>>;

    /// Queues `member` unless it is already pending. Returns whether a new
    /// entry was queued.
    fn enqueue(
        &self,
        queue: &KeyQueue,
        member: &str,
    ) -> Result<bool>;

    /// Takes the oldest member and clears its pending mark. `None` timeout
    /// blocks until a member arrives, `Some(Duration::ZERO)` does not block.
    fn dequeue(
        &self,
        queue: &KeyQueue,
        timeout: Option<Duration>,
    ) -> Result<Option<String>>;

    fn queue_len(
        &self,
        queue: &KeyQueue,
    ) -> Result<u64>;

    /// Signals `waker` after every new entry in `queue` for as long as it is
    /// alive.
    fn attach_queue_waker(
        &self,
        queue: &KeyQueue,
        waker: Weak<EventFd>,
    ) -> Result<()>;

    /// Applies `write` to the hash at `key` and queues `member`, as one atomic
    /// step with respect to [`StateStore::dequeue_and_read`] on the same
    /// queue. Returns whether a new entry was queued.
    fn write_and_enqueue(
        &self,
        key: &str,
        write: &RecordWrite,
        queue: &KeyQueue,
        member: &str,
    ) -> Result<bool>;

    /// Takes the oldest member, clears its pending mark and reads the hash at
    /// `{key_prefix}{member}`, as one atomic step with respect to
    /// [`StateStore::write_and_enqueue`] on the same queue.
    fn dequeue_and_read(
        &self,
        queue: &KeyQueue,
        key_prefix: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<(String, Vec<FieldValue>)>>;
}
