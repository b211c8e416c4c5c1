//! Configuration management for the channel bus.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Section-wise validation
mod orchestrator;
mod store;
mod subscription;
pub use orchestrator::*;
pub use store::*;
pub use subscription::*;
use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::CONFIG_ENV_PREFIX;
use crate::constants::CONFIG_PATH_ENV;
use crate::Result;

/// Main configuration container for a [`ChannelBus`](crate::ChannelBus)
///
/// Combines all section configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CHANNEL_BUS_CONFIG`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct BusConfig {
    /// Channel Store behaviour
    #[serde(default)]
    pub store: StoreConfig,
    /// Subscription Registry diagnostics
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    /// Async Orchestrator behaviour
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl Debug for BusConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("BusConfig")
            .field("store", &self.store)
            .field("subscription", &self.subscription)
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}

impl BusConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CHANNEL_BUS_CONFIG` environment variable (if set)
    /// 3. Environment variables with `CHANNEL_BUS__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred so further overrides can be layered with
    /// `with_override_config()`. Call `validate()` before handing the config to a bus.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CHANNEL_BUS__ORCHESTRATOR__TEST_MODE", "true");
    /// let cfg = BusConfig::new()?.validate()?;
    /// assert!(cfg.orchestrator.test_mode);
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.store.validate()?;
        self.subscription.validate()?;
        self.orchestrator.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(CONFIG_ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
