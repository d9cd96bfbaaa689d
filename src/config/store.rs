use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_DB_CONFIG_FILE;
use crate::constants::DEFAULT_TABLE_SEPARATOR;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreConfig {
    /// Separator for connectors not resolved through the database config
    #[serde(default = "default_separator")]
    pub default_separator: String,

    /// Location of the database config document
    #[serde(default = "default_db_config_path")]
    pub db_config_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_separator: default_separator(),
            db_config_path: default_db_config_path(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_separator.is_empty() {
            return Err(Error::InvalidConfig(
                "default_separator cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_separator() -> String {
    DEFAULT_TABLE_SEPARATOR.to_string()
}

fn default_db_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_CONFIG_FILE)
}
