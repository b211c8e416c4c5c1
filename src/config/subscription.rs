use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Subscription Registry configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubscriptionConfig {
    /// Listener count per channel above which a warning is logged
    ///
    /// A channel that keeps growing its listener list usually means a consumer
    /// subscribes repeatedly without ever unsubscribing.
    ///
    /// `0` disables the warning.
    /// Default: 64
    #[serde(default = "default_listener_warn_threshold")]
    pub listener_warn_threshold: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            listener_warn_threshold: default_listener_warn_threshold(),
        }
    }
}

impl SubscriptionConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

fn default_listener_warn_threshold() -> usize {
    64
}
