use tracing::debug;
use tracing::trace;

use super::NotificationChannel;
use super::Table;
use crate::DbConnector;
use crate::FieldValue;
use crate::RecordWrite;
use crate::Result;

/// Writes table records and announces every touched key.
///
/// The record write and the notification form one atomic store step, so a
/// consumer resolving the key either sees the write or finds the key queued
/// again afterwards. A key still waiting in the channel is not queued twice.
#[derive(Debug, Clone)]
pub struct ProducerStateTable {
    table: Table,
    channel: NotificationChannel,
}

impl ProducerStateTable {
    pub fn new(
        db: &DbConnector,
        table_name: &str,
    ) -> Self {
        debug!(db = db.db_name(), table = table_name, "producer created");
        Self {
            table: Table::new(db, table_name),
            channel: NotificationChannel::new(db, table_name),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    /// Merges `fields` into the record of `key`. An empty `fields` writes
    /// nothing but still notifies.
    pub fn set(
        &self,
        key: &str,
        fields: &[FieldValue],
    ) -> Result<()> {
        self.publish(key, RecordWrite::Merge(fields.to_vec()))
    }

    pub fn del(
        &self,
        key: &str,
    ) -> Result<()> {
        self.publish(key, RecordWrite::Delete)
    }

    /// Removes only the named fields of `key`.
    pub fn del_fields(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<()> {
        self.publish(key, RecordWrite::DeleteFields(fields.to_vec()))
    }

    fn publish(
        &self,
        key: &str,
        write: RecordWrite,
    ) -> Result<()> {
        let queued = self.channel.store().write_and_enqueue(
            &self.table.full_key(key),
            &write,
            self.channel.queue(),
            key,
        )?;
        trace!(table = self.table.name(), key, queued, "published");
        Ok(())
    }
}
