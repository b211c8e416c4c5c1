//! Async Orchestrator configuration
//!
//! ```toml
//! [orchestrator]
//! test_mode = false
//! concurrency = "race"        # race | coalesce | queue
//! fallback_error_message = "An error occurred"
//! catch_panics = true
//! ```

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// How simultaneous invocations on the same channel interact
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Every invocation runs its own lifecycle; the last terminal write wins
    #[default]
    Race,
    /// Invocations arriving while one is in flight share its terminal record
    Coalesce,
    /// Invocations run one after another, each calling the producer
    Queue,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OrchestratorConfig {
    /// Initial value of the test-mode flag
    ///
    /// When set, invoking a channel that already holds a cached value resolves
    /// with that value without calling the producer.
    ///
    /// Default: false
    #[serde(default)]
    pub test_mode: bool,

    /// Policy for simultaneous invocations on one channel
    ///
    /// Default: race
    #[serde(default)]
    pub concurrency: ConcurrencyPolicy,

    /// `error` value for producer failures that carry no message
    ///
    /// When absent the field is set to `true`.
    #[serde(default)]
    pub fallback_error_message: Option<String>,

    /// Treat panicking producers and transforms as producer failures
    ///
    /// Default: true
    #[serde(default = "default_catch_panics")]
    pub catch_panics: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            test_mode: false,
            concurrency: ConcurrencyPolicy::default(),
            fallback_error_message: None,
            catch_panics: default_catch_panics(),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(message) = &self.fallback_error_message {
            if message.trim().is_empty() {
                return Err(Error::Config(ConfigError::Message(
                    "orchestrator.fallback_error_message must not be empty".into(),
                )));
            }
        }
        Ok(())
    }
}

fn default_catch_panics() -> bool {
    true
}
