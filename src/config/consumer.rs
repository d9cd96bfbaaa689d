use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConsumerConfig {
    /// Maximum number of entries one `pop_batch` call resolves
    #[serde(default = "default_pop_batch_size")]
    pub pop_batch_size: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            pop_batch_size: default_pop_batch_size(),
        }
    }
}

impl ConsumerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pop_batch_size == 0 {
            return Err(Error::InvalidConfig(
                "pop_batch_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_pop_batch_size() -> usize {
    128
}
