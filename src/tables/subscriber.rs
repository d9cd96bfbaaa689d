use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::trace;

use super::KeyOpFieldsValues;
use super::NotificationChannel;
use super::Table;
use crate::ConsumerConfig;
use crate::DbConnector;
use crate::EventFd;
use crate::HandleSet;
use crate::Readiness;
use crate::Result;
use crate::Selectable;
use crate::UsageError;

/// Consumes a table's notification channel and resolves each key against
/// the store.
///
/// Resolution happens when the key is popped: a record with fields becomes
/// a SET carrying its current fields, a missing record becomes a DEL. Keys
/// touched several times before being popped are therefore observed once,
/// in their latest state.
///
/// On construction every record already in the table is read once and
/// served as a SET before anything from the channel, so a late subscriber
/// starts from the current table state.
///
/// At most one resolved tuple is buffered; [`SubscriberStateTable::pop`]
/// hands it out after the reactor reported the subscriber ready.
pub struct SubscriberStateTable {
    table: Table,
    channel: NotificationChannel,
    wake: Arc<EventFd>,
    /// Initial table dump, served before the channel
    backlog: VecDeque<KeyOpFieldsValues>,
    pending: Option<KeyOpFieldsValues>,
    batch_size: usize,
}

impl std::fmt::Debug for SubscriberStateTable {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SubscriberStateTable")
            .field("table", &self.table.name())
            .field("channel", &self.channel.name())
            .field("backlog", &self.backlog.len())
            .field("pending", &self.pending)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl SubscriberStateTable {
    pub fn new(
        db: &DbConnector,
        table_name: &str,
    ) -> Result<Self> {
        Self::with_config(db, table_name, &ConsumerConfig::default())
    }

    pub fn with_config(
        db: &DbConnector,
        table_name: &str,
        config: &ConsumerConfig,
    ) -> Result<Self> {
        let channel = NotificationChannel::new(db, table_name);
        let wake = Arc::new(EventFd::new()?);
        channel.attach_waker(&wake)?;

        let table = Table::new(db, table_name);
        let backlog = dump_table(&table)?;

        debug!(
            db = db.db_name(),
            table = table_name,
            fd = wake.raw_fd(),
            existing = backlog.len(),
            "subscriber created"
        );
        Ok(Self {
            table,
            channel,
            wake,
            backlog,
            pending: None,
            batch_size: config.pop_batch_size,
        })
    }

    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    pub fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    /// Whether a resolved tuple is waiting for `pop`
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Hands out the buffered tuple.
    ///
    /// Calling it without a prior `HasData` from `try_consume`/`consume` (or
    /// a `select` outcome naming this subscriber) is a usage error.
    pub fn pop(&mut self) -> Result<KeyOpFieldsValues> {
        self.pending.take().ok_or_else(|| {
            UsageError::EmptyPop {
                table: self.table.name().to_string(),
            }
            .into()
        })
    }

    /// Buffered tuple followed by up to `max` tuples in total, taken from the
    /// initial dump and then resolved from the channel, without blocking.
    pub fn pops(
        &mut self,
        max: usize,
    ) -> Result<Vec<KeyOpFieldsValues>> {
        let mut out = Vec::new();
        if max == 0 {
            return Ok(out);
        }
        if let Some(kofv) = self.pending.take() {
            out.push(kofv);
        }
        while out.len() < max {
            match self.next_tuple()? {
                Some(kofv) => out.push(kofv),
                None => break,
            }
        }
        trace!(table = self.table.name(), count = out.len(), "pops");
        Ok(out)
    }

    /// [`SubscriberStateTable::pops`] with the configured batch size.
    pub fn pop_batch(&mut self) -> Result<Vec<KeyOpFieldsValues>> {
        self.pops(self.batch_size)
    }

    fn next_tuple(&mut self) -> Result<Option<KeyOpFieldsValues>> {
        match self.backlog.pop_front() {
            Some(kofv) => Ok(Some(kofv)),
            None => self.resolve_next(),
        }
    }

    /// Pops and resolves one key without blocking.
    fn resolve_next(&self) -> Result<Option<KeyOpFieldsValues>> {
        let prefix = self.table.full_key("");
        let Some((key, fields)) =
            self.channel
                .store()
                .dequeue_and_read(self.channel.queue(), &prefix, Some(Duration::ZERO))?
        else {
            return Ok(None);
        };

        let kofv = if fields.is_empty() {
            KeyOpFieldsValues::del(key)
        } else {
            KeyOpFieldsValues::set(key, fields)
        };
        trace!(
            table = self.table.name(),
            key = %kofv.key,
            op = %kofv.op,
            fields = kofv.fields.len(),
            "resolved"
        );
        Ok(Some(kofv))
    }

    fn fill(&mut self) -> Result<Readiness> {
        if self.pending.is_none() {
            self.pending = self.next_tuple()?;
        }
        Ok(if self.pending.is_some() {
            Readiness::HasData
        } else {
            Readiness::NoData
        })
    }
}

/// SET tuple for every record currently in `table`
fn dump_table(table: &Table) -> Result<VecDeque<KeyOpFieldsValues>> {
    let mut backlog = VecDeque::new();
    for key in table.get_keys()? {
        // Gone between the listing and the read: nothing to report.
        if let Some(fields) = table.get(&key)? {
            backlog.push_back(KeyOpFieldsValues::set(key, fields));
        }
    }
    Ok(backlog)
}

impl Selectable for SubscriberStateTable {
    fn register_handles(
        &self,
        handles: &mut HandleSet,
    ) {
        handles.insert(self.wake.raw_fd());
    }

    fn owns_handle(
        &self,
        ready: &HandleSet,
    ) -> bool {
        ready.contains(self.wake.raw_fd())
    }

    fn try_consume(&mut self) -> Result<Readiness> {
        self.fill()
    }

    fn consume(&mut self) -> Result<Readiness> {
        let signals = self.wake.drain()?;
        trace!(table = self.table.name(), signals, "subscriber woken");
        self.fill()
    }
}
