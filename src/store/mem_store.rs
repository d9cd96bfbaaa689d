use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Condvar;
use parking_lot::Mutex;
use parking_lot::MutexGuard;
use tracing::trace;
use tracing::warn;

use super::glob_match;
use super::FieldValue;
use super::KeyQueue;
use super::RecordWrite;
use super::StateStore;
use crate::EventFd;
use crate::Result;
use crate::StoreError;

#[derive(Debug, Default)]
struct QueueEntries {
    order: VecDeque<String>,
    pending: HashSet<String>,
}

impl QueueEntries {
    fn push(
        &mut self,
        member: &str,
    ) -> bool {
        if !self.pending.insert(member.to_string()) {
            return false;
        }
        self.order.push_back(member.to_string());
        true
    }

    fn pop(&mut self) -> Option<String> {
        let member = self.order.pop_front()?;
        self.pending.remove(&member);
        Some(member)
    }

    fn clear(&mut self) {
        self.order.clear();
        self.pending.clear();
    }
}

/// Key queue with blocking pop
#[derive(Debug, Default)]
struct QueueState {
    entries: Mutex<QueueEntries>,
    available: Condvar,
    wakers: Mutex<Vec<Weak<EventFd>>>,
}

impl QueueState {
    fn wake_all(
        &self,
        list: &str,
    ) {
        self.available.notify_one();
        self.wakers.lock().retain(|waker| match waker.upgrade() {
            Some(event) => {
                if let Err(e) = event.notify() {
                    warn!(list, "failed to wake queue subscriber: {:?}", e);
                }
                true
            }
            None => false,
        });
    }

    /// Waits for a non-empty queue. Returns `None` once the deadline passed
    /// with the queue still empty.
    fn wait_entries<'a>(
        &'a self,
        deadline: Option<Instant>,
    ) -> Option<MutexGuard<'a, QueueEntries>> {
        let mut entries = self.entries.lock();
        while entries.order.is_empty() {
            match deadline {
                None => self.available.wait(&mut entries),
                Some(deadline) => {
                    if self.available.wait_until(&mut entries, deadline).timed_out() {
                        return (!entries.order.is_empty()).then_some(entries);
                    }
                }
            }
        }
        Some(entries)
    }
}

/// In-process shared state store.
///
/// Every operation is atomic per key. Key queues support any number of
/// concurrent producers and competing blocking consumers; each entry is
/// handed to exactly one consumer. The pending set of a queue lives with the
/// queue itself and is not listed as a key, but its name cannot hold a hash.
#[derive(Debug, Default)]
pub struct MemStore {
    hashes: DashMap<String, Vec<FieldValue>>,
    queues: DashMap<String, Arc<QueueState>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every hash and every queued entry. Attached queue wakers stay
    /// attached.
    pub fn flush_all(&self) {
        self.hashes.clear();
        for queue in self.queues.iter() {
            queue.entries.lock().clear();
        }
        trace!("store flushed");
    }

    fn ensure_not_queue(
        &self,
        key: &str,
    ) -> Result<()> {
        match self.queues.get(key) {
            Some(queue) if !queue.entries.lock().order.is_empty() => Err(StoreError::WrongType {
                key: key.to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    fn queue(
        &self,
        queue: &KeyQueue,
    ) -> Result<Arc<QueueState>> {
        for reserved in [queue.list(), queue.pending()] {
            if self.hashes.contains_key(reserved) {
                return Err(StoreError::WrongType {
                    key: reserved.to_string(),
                }
                .into());
            }
        }
        Ok(self.queues.entry(queue.list().to_string()).or_default().clone())
    }

    fn merge(
        &self,
        key: &str,
        fields: &[FieldValue],
    ) {
        if fields.is_empty() {
            return;
        }

        let mut record = self.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            match record.iter_mut().find(|(f, _)| f == field) {
                Some(existing) => existing.1 = value.clone(),
                None => record.push((field.clone(), value.clone())),
            }
        }
    }

    fn remove_fields(
        &self,
        key: &str,
        fields: &[String],
    ) -> u64 {
        let mut removed = 0u64;
        self.hashes.remove_if_mut(key, |_key, record| {
            let before = record.len();
            record.retain(|(f, _)| !fields.contains(f));
            removed = (before - record.len()) as u64;
            record.is_empty()
        });
        removed
    }

    fn apply(
        &self,
        key: &str,
        write: &RecordWrite,
    ) {
        match write {
            RecordWrite::Merge(fields) => self.merge(key, fields),
            RecordWrite::Delete => {
                self.hashes.remove(key);
            }
            RecordWrite::DeleteFields(fields) => {
                self.remove_fields(key, fields);
            }
        }
    }

    fn read(
        &self,
        key: &str,
    ) -> Vec<FieldValue> {
        self.hashes.get(key).map(|r| r.value().clone()).unwrap_or_default()
    }
}

impl StateStore for MemStore {
    fn hset(
        &self,
        key: &str,
        fields: &[FieldValue],
    ) -> Result<()> {
        self.ensure_not_queue(key)?;
        self.merge(key, fields);
        trace!(key, fields = fields.len(), "hset");
        Ok(())
    }

    fn hgetall(
        &self,
        key: &str,
    ) -> Result<Vec<FieldValue>> {
        self.ensure_not_queue(key)?;
        Ok(self.read(key))
    }

    fn hget(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<String>> {
        self.ensure_not_queue(key)?;
        Ok(self
            .hashes
            .get(key)
            .and_then(|r| r.iter().find(|(f, _)| f == field).map(|(_, v)| v.clone())))
    }

    fn exists(
        &self,
        key: &str,
    ) -> Result<bool> {
        if self.hashes.contains_key(key) {
            return Ok(true);
        }
        Ok(self
            .queues
            .get(key)
            .is_some_and(|q| !q.entries.lock().order.is_empty()))
    }

    fn del(
        &self,
        key: &str,
    ) -> Result<bool> {
        if self.hashes.remove(key).is_some() {
            trace!(key, "del");
            return Ok(true);
        }

        // Keep the queue object itself: subscribers stay attached to it.
        let removed = match self.queues.get(key) {
            Some(queue) => {
                let mut entries = queue.entries.lock();
                let had_entries = !entries.order.is_empty();
                entries.clear();
                had_entries
            }
            None => false,
        };
        Ok(removed)
    }

    fn hdel(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<u64> {
        self.ensure_not_queue(key)?;
        let removed = self.remove_fields(key, fields);
        trace!(key, removed, "hdel");
        Ok(removed)
    }

    fn keys(
        &self,
        pattern: &str,
    ) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .hashes
            .iter()
            .map(|r| r.key().clone())
            .filter(|k| glob_match(pattern, k))
            .collect();

        keys.extend(
            self.queues
                .iter()
                .filter(|r| !r.value().entries.lock().order.is_empty())
                .map(|r| r.key().clone())
                .filter(|k| glob_match(pattern, k)),
        );
        Ok(keys)
    }

    fn enqueue(
        &self,
        queue: &KeyQueue,
        member: &str,
    ) -> Result<bool> {
        let state = self.queue(queue)?;

        let queued = state.entries.lock().push(member);
        if queued {
            state.wake_all(queue.list());
        }
        trace!(queue = queue.list(), member, queued, "enqueue");
        Ok(queued)
    }

    fn dequeue(
        &self,
        queue: &KeyQueue,
        timeout: Option<Duration>,
    ) -> Result<Option<String>> {
        let state = self.queue(queue)?;
        let deadline = timeout.map(|t| Instant::now() + t);

        let member = state.wait_entries(deadline).and_then(|mut entries| entries.pop());
        trace!(queue = queue.list(), member = ?member, "dequeue");
        Ok(member)
    }

    fn queue_len(
        &self,
        queue: &KeyQueue,
    ) -> Result<u64> {
        Ok(self
            .queues
            .get(queue.list())
            .map(|q| q.entries.lock().order.len() as u64)
            .unwrap_or(0))
    }

    fn attach_queue_waker(
        &self,
        queue: &KeyQueue,
        waker: Weak<EventFd>,
    ) -> Result<()> {
        let state = self.queue(queue)?;
        state.wakers.lock().push(waker);
        Ok(())
    }

    fn write_and_enqueue(
        &self,
        key: &str,
        write: &RecordWrite,
        queue: &KeyQueue,
        member: &str,
    ) -> Result<bool> {
        self.ensure_not_queue(key)?;
        let state = self.queue(queue)?;

        // The queue lock orders this write against dequeue_and_read.
        let queued = {
            let mut entries = state.entries.lock();
            self.apply(key, write);
            entries.push(member)
        };
        if queued {
            state.wake_all(queue.list());
        }
        trace!(key, queue = queue.list(), queued, "write and enqueue");
        Ok(queued)
    }

    fn dequeue_and_read(
        &self,
        queue: &KeyQueue,
        key_prefix: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<(String, Vec<FieldValue>)>> {
        let state = self.queue(queue)?;
        let deadline = timeout.map(|t| Instant::now() + t);

        let Some(mut entries) = state.wait_entries(deadline) else {
            return Ok(None);
        };
        let Some(member) = entries.pop() else {
            return Ok(None);
        };
        let fields = self.read(&format!("{}{}", key_prefix, member));
        drop(entries);

        trace!(queue = queue.list(), member = %member, fields = fields.len(), "dequeue and read");
        Ok(Some((member, fields)))
    }
}
