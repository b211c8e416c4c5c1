//! Channel Bus Error Hierarchy
//!
//! Errors that can escape the public API. Producer and transform failures are
//! not part of it: the orchestrator turns them into Error-state
//! records and delivers them as data through the normal notification path.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

/// Failure type returned by producers and transforms.
///
/// Anything implementing `std::error::Error` (and plain `&str`/`String`
/// messages) converts into it with `?` or `.into()`.
pub type ProducerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Rejected store operations
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Typed channel payload conversion failures
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A merge-write received something other than a record
    #[error("Cannot merge a {found} into channel `{channel}`: partial values must be records")]
    MalformedMerge { channel: String, found: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Typed payload could not be turned into a record
    #[error("Failed to encode payload for channel `{channel}`")]
    Encode {
        channel: String,
        #[source]
        source: serde_json::Error,
    },

    /// Stored record does not match the channel's payload type
    #[error("Failed to decode payload for channel `{channel}`")]
    Decode {
        channel: String,
        #[source]
        source: serde_json::Error,
    },
}
