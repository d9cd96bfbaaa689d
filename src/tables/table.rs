use std::sync::Arc;

use tracing::trace;

use crate::DbConnector;
use crate::FieldValue;
use crate::Result;
use crate::StateStore;

/// Direct accessor for the records of one table.
///
/// Writes through a `Table` do not notify subscribers; use
/// [`crate::ProducerStateTable`] for that.
#[derive(Clone)]
pub struct Table {
    store: Arc<dyn StateStore>,
    name: String,
    separator: String,
}

impl std::fmt::Debug for Table {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("separator", &self.separator)
            .finish_non_exhaustive()
    }
}

impl Table {
    pub fn new(
        db: &DbConnector,
        name: impl Into<String>,
    ) -> Self {
        Self {
            store: db.store().clone(),
            name: name.into(),
            separator: db.separator().to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Store key of `key` within this table
    pub fn full_key(
        &self,
        key: &str,
    ) -> String {
        format!("{}{}{}", self.name, self.separator, key)
    }

    pub fn set(
        &self,
        key: &str,
        fields: &[FieldValue],
    ) -> Result<()> {
        trace!(table = %self.name, key, fields = fields.len(), "table set");
        self.store.hset(&self.full_key(key), fields)
    }

    /// Current record of `key`; `None` if it does not exist.
    pub fn get(
        &self,
        key: &str,
    ) -> Result<Option<Vec<FieldValue>>> {
        let fields = self.store.hgetall(&self.full_key(key))?;
        Ok((!fields.is_empty()).then_some(fields))
    }

    pub fn hget(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<String>> {
        self.store.hget(&self.full_key(key), field)
    }

    pub fn exists(
        &self,
        key: &str,
    ) -> Result<bool> {
        self.store.exists(&self.full_key(key))
    }

    pub fn del(
        &self,
        key: &str,
    ) -> Result<bool> {
        trace!(table = %self.name, key, "table del");
        self.store.del(&self.full_key(key))
    }

    /// Removes the named fields; the record disappears once it has none left.
    pub fn del_fields(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<u64> {
        trace!(table = %self.name, key, fields = fields.len(), "table hdel");
        self.store.hdel(&self.full_key(key), fields)
    }

    /// Keys of every record in the table, without the table prefix.
    pub fn get_keys(&self) -> Result<Vec<String>> {
        let prefix = self.full_key("");
        let pattern = format!("{}*", escape_glob(&prefix));

        let mut keys: Vec<String> = self
            .store
            .keys(&pattern)?
            .into_iter()
            .filter_map(|full| full.strip_prefix(&prefix).map(str::to_string))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
