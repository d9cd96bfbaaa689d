//! Configuration management for the state relay.
//!
//! Two independent documents are handled here:
//! - [`RelayConfig`]: tunables of the reactor, consumers and store defaults,
//!   loaded hierarchically (defaults, `CONFIG_PATH` file, `RELAY__*`
//!   environment variables).
//! - [`DbConfig`]: the database resolver mapping logical database names to
//!   store instances, ids and key separators.

mod consumer;
mod db;
mod reactor;
mod store;
pub use consumer::*;
pub use db::*;
pub use reactor::*;
pub use store::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Main configuration container
///
/// Sources are merged in the following order (later sources override earlier):
/// 1. Type defaults
/// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
/// 3. Environment variables with `RELAY__` prefix
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct RelayConfig {
    /// Reactor wait behavior
    #[serde(default)]
    pub reactor: ReactorConfig,
    /// Subscriber draining behavior
    #[serde(default)]
    pub consumer: ConsumerConfig,
    /// Store defaults and database config location
    #[serde(default)]
    pub store: StoreConfig,
}

impl Debug for RelayConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("reactor", &self.reactor)
            .field("consumer", &self.consumer)
            .field("store", &self.store)
            .finish()
    }
}

impl RelayConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// # Note
    /// Validation is deferred so that `with_override_config()` can still be
    /// applied. Callers MUST call `validate()` before using the result.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("RELAY__CONSUMER__POP_BATCH_SIZE", "64");
    /// let cfg = RelayConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(Self::environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies overrides from `path` on top of the current values, then the
    /// environment again. Not validated.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn validate(self) -> Result<Self> {
        self.reactor.validate()?;
        self.consumer.validate()?;
        self.store.validate()?;
        Ok(self)
    }

    fn environment() -> Environment {
        Environment::with_prefix("RELAY")
            .separator("__")
            .ignore_empty(true)
            .try_parsing(true)
    }
}
