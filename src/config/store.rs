use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Channel Store configuration
///
/// ```toml
/// [store]
/// dedup_writes = true
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreConfig {
    /// Skip writes whose merged record is structurally equal to the stored one
    ///
    /// Turning this off makes every write mutate the store and notify listeners.
    /// Only useful when diagnosing notification problems.
    ///
    /// Default: true
    #[serde(default = "default_dedup_writes")]
    pub dedup_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dedup_writes: default_dedup_writes(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

fn default_dedup_writes() -> bool {
    true
}
