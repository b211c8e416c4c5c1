// -
// Fetch envelope control fields

/// `true` while a producer call is in flight
pub const LOADING_FIELD: &str = "loading";

/// `false`, `true` or the failure message of the last invocation
pub const ERROR_FIELD: &str = "error";

/// `true` once an invocation reached a terminal state
pub const HAS_LOADED_FIELD: &str = "hasLoaded";

/// Message used for caught panics whose payload is not a string
pub(crate) const PANIC_FALLBACK_MESSAGE: &str = "producer panicked";

// -
// Configuration

/// Prefix for configuration environment variables (`CHANNEL_BUS__STORE__DEDUP_WRITES`)
pub(crate) const CONFIG_ENV_PREFIX: &str = "CHANNEL_BUS";

/// Environment variable naming an optional configuration file
pub(crate) const CONFIG_PATH_ENV: &str = "CHANNEL_BUS_CONFIG";
