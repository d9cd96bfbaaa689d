use std::fmt;
use std::sync::Arc;

use super::MemStore;
use super::StateStore;
use crate::DbConfig;
use crate::Result;
use crate::StoreConfig;

/// Handle to one logical database: the store plus the key layout that
/// database uses.
///
/// Cloning is cheap and shares the underlying store.
#[derive(Clone)]
pub struct DbConnector {
    store: Arc<dyn StateStore>,
    db_name: String,
    db_id: u32,
    separator: String,
}

impl fmt::Debug for DbConnector {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("DbConnector")
            .field("db_name", &self.db_name)
            .field("db_id", &self.db_id)
            .field("separator", &self.separator)
            .finish_non_exhaustive()
    }
}

impl DbConnector {
    pub fn new(
        store: Arc<dyn StateStore>,
        db_name: impl Into<String>,
        db_id: u32,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            store,
            db_name: db_name.into(),
            db_id,
            separator: separator.into(),
        }
    }

    /// Connector over a fresh [`MemStore`] with the configured default
    /// separator.
    pub fn in_memory(
        db_name: impl Into<String>,
        config: &StoreConfig,
    ) -> Self {
        Self::new(
            Arc::new(MemStore::new()),
            db_name,
            0,
            config.default_separator.clone(),
        )
    }

    /// Resolves id and separator of `db_name` from the database config.
    pub fn from_config(
        store: Arc<dyn StateStore>,
        config: &DbConfig,
        db_name: &str,
    ) -> Result<Self> {
        let db_id = config.db_id(db_name)?;
        let separator = config.separator(db_name)?;
        Ok(Self::new(store, db_name, db_id, separator))
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn db_id(&self) -> u32 {
        self.db_id
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }
}
