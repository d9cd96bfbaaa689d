//! Database resolver.
//!
//! Maps logical database names (e.g. `APPL_DB`) to the store instance that
//! hosts them, their numeric id and the separator used to build
//! table-qualified keys. The document format is:
//!
//! ```json
//! {
//!     "INSTANCES": {
//!         "redis": { "hostname": "127.0.0.1", "port": 6379,
//!                    "unix_socket_path": "/var/run/redis/redis.sock" }
//!     },
//!     "DATABASES": {
//!         "APPL_DB":   { "id": 0, "separator": ":", "instance": "redis" },
//!         "CONFIG_DB": { "id": 4, "separator": "|", "instance": "redis" }
//!     },
//!     "VERSION": "1.0"
//! }
//! ```
//!
//! A process-wide instance is set once through [`DbConfig::initialize`] and
//! read through [`DbConfig::global`]. Components receive the resolved values
//! through [`crate::DbConnector`] and never consult the global themselves.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use config::ConfigError;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use super::StoreConfig;
use crate::Error;
use crate::Result;
use crate::UsageError;

static GLOBAL_DB_CONFIG: OnceCell<DbConfig> = OnceCell::new();

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub hostname: String,
    pub port: u16,
    #[serde(default)]
    pub unix_socket_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub id: u32,
    pub separator: String,
    pub instance: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DbConfig {
    #[serde(rename = "INSTANCES")]
    instances: BTreeMap<String, InstanceInfo>,

    #[serde(rename = "DATABASES")]
    databases: BTreeMap<String, DatabaseInfo>,

    #[serde(rename = "VERSION", default)]
    version: Option<String>,
}

impl DbConfig {
    /// Parses and validates the document at `path` and installs it as the
    /// process-wide database config. Fails if one is already installed.
    pub fn initialize(path: impl AsRef<Path>) -> Result<&'static DbConfig> {
        if GLOBAL_DB_CONFIG.get().is_some() {
            return Err(UsageError::AlreadyInitialized.into());
        }

        let config = Self::load(path.as_ref())?;
        GLOBAL_DB_CONFIG
            .set(config)
            .map_err(|_| Error::from(UsageError::AlreadyInitialized))?;

        info!(path = %path.as_ref().display(), "database config initialized");
        Self::global()
    }

    /// [`DbConfig::initialize`] from the configured `db_config_path`.
    pub fn initialize_from(config: &StoreConfig) -> Result<&'static DbConfig> {
        Self::initialize(&config.db_config_path)
    }

    pub fn is_initialized() -> bool {
        GLOBAL_DB_CONFIG.get().is_some()
    }

    pub fn global() -> Result<&'static DbConfig> {
        GLOBAL_DB_CONFIG
            .get()
            .ok_or_else(|| UsageError::NotInitialized.into())
    }

    /// Parses and validates the document at `path` without installing it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(ConfigError::Foreign(Box::new(e))))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| Error::Config(ConfigError::Foreign(Box::new(e))))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();

        for (name, db) in &self.databases {
            if !self.instances.contains_key(&db.instance) {
                return Err(Error::InvalidConfig(format!(
                    "database {} references unknown instance {}",
                    name, db.instance
                )));
            }
            if db.separator.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "database {} has an empty separator",
                    name
                )));
            }
            if !ids.insert(db.id) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate database id {} ({})",
                    db.id, name
                )));
            }
        }
        Ok(())
    }

    pub fn database(
        &self,
        db_name: &str,
    ) -> Result<&DatabaseInfo> {
        self.databases
            .get(db_name)
            .ok_or_else(|| UsageError::UnknownDatabase(db_name.to_string()).into())
    }

    pub fn db_id(
        &self,
        db_name: &str,
    ) -> Result<u32> {
        Ok(self.database(db_name)?.id)
    }

    pub fn separator(
        &self,
        db_name: &str,
    ) -> Result<&str> {
        Ok(&self.database(db_name)?.separator)
    }

    pub fn separator_for_id(
        &self,
        db_id: u32,
    ) -> Result<&str> {
        self.databases
            .values()
            .find(|db| db.id == db_id)
            .map(|db| db.separator.as_str())
            .ok_or_else(|| UsageError::UnknownDatabaseId(db_id).into())
    }

    /// Store instance hosting `db_name`
    pub fn instance(
        &self,
        db_name: &str,
    ) -> Result<&InstanceInfo> {
        let db = self.database(db_name)?;
        // validate() guarantees the instance exists for loaded documents
        self.instances
            .get(&db.instance)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown instance {}", db.instance)))
    }

    pub fn database_names(&self) -> Vec<&str> {
        self.databases.keys().map(String::as_str).collect()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}
