use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Upper bound for a bounded select wait (one day)
const MAX_SELECT_TIMEOUT_MS: u64 = 86_400_000;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReactorConfig {
    /// Wait bound for a select call in milliseconds; 0 blocks until a source
    /// is ready
    #[serde(default = "default_select_timeout_ms")]
    pub select_timeout_ms: u64,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            select_timeout_ms: default_select_timeout_ms(),
        }
    }
}

impl ReactorConfig {
    /// Timeout argument for [`crate::Reactor::select`]
    pub fn select_timeout(&self) -> Option<Duration> {
        match self.select_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.select_timeout_ms > MAX_SELECT_TIMEOUT_MS {
            return Err(Error::InvalidConfig(format!(
                "select_timeout_ms {} exceeds {}",
                self.select_timeout_ms, MAX_SELECT_TIMEOUT_MS
            )));
        }
        Ok(())
    }
}

fn default_select_timeout_ms() -> u64 {
    1000
}
