//! Compile-time typed view over a channel.
//!
//! The store itself holds untyped records. A [`ChannelKey<T>`] ties a channel
//! name to a payload type so consumers read, write and subscribe with `T`
//! instead of raw records. Control fields written by the orchestrator are
//! ignored when decoding unless `T` declares them.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::ChannelBus;
use crate::CodecError;
use crate::FetchEnvelope;
use crate::Record;
use crate::Result;
use crate::Subscription;

/// Channel name bound to payload type `T`
pub struct ChannelKey<T> {
    name: &'static str,
    _payload: PhantomData<fn() -> T>,
}

impl<T> ChannelKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _payload: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for ChannelKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ChannelKey<T> {}

impl<T> fmt::Debug for ChannelKey<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_tuple("ChannelKey").field(&self.name).finish()
    }
}

/// Terminal state of a typed invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub envelope: FetchEnvelope,
    /// Decoded payload; `None` for Error records or records that do not decode
    pub data: Option<T>,
}

impl<T> Fetched<T> {
    pub fn is_error(&self) -> bool {
        self.envelope.error.is_error()
    }
}

pub struct TypedChannel<T> {
    bus: ChannelBus,
    key: ChannelKey<T>,
}

impl<T> fmt::Debug for TypedChannel<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("TypedChannel").field("key", &self.key).finish_non_exhaustive()
    }
}

impl<T> TypedChannel<T>
where
    T: Serialize + DeserializeOwned,
{
    pub(crate) fn new(
        bus: ChannelBus,
        key: ChannelKey<T>,
    ) -> Self {
        Self { bus, key }
    }

    pub fn name(&self) -> &'static str {
        self.key.name
    }

    /// Decoded current value, `None` if the channel holds nothing.
    pub fn read(&self) -> Result<Option<T>> {
        match self.bus.store().get(self.key.name) {
            Some(record) => decode(self.key.name, record).map(Some),
            None => Ok(None),
        }
    }

    /// Merge-writes every field of `value`.
    pub fn write(
        &self,
        value: &T,
    ) -> Result<bool> {
        let encoded = serde_json::to_value(value).map_err(|source| CodecError::Encode {
            channel: self.key.name.to_string(),
            source,
        })?;
        self.bus.write(self.key.name, encoded)
    }

    /// Merge-writes a partial record, e.g. `json!({"count": 2})`.
    pub fn write_partial(
        &self,
        partial: Value,
    ) -> Result<bool> {
        self.bus.write(self.key.name, partial)
    }

    /// Subscribes with a decoding listener. Records that do not decode as `T`
    /// are skipped with a warning.
    pub fn subscribe<F>(
        &self,
        listener: F,
    ) -> Subscription
    where
        F: Fn(T) + Send + Sync + 'static,
        T: 'static,
    {
        let channel = self.key.name;
        self.bus.subscribe_listener(
            channel,
            Arc::new(move |record: &Record| match decode::<T>(channel, record.clone()) {
                Ok(value) => listener(value),
                Err(e) => warn!(channel = %channel, error = %e, "Skipping undecodable value"),
            }),
        )
    }

    pub async fn invoke(
        &self,
        args: Vec<Value>,
    ) -> Fetched<T> {
        let terminal = self.bus.invoke(self.key.name, args).await;
        let envelope = FetchEnvelope::from_record(&terminal);

        let data = if envelope.error.is_error() {
            None
        } else {
            match decode(self.key.name, terminal) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(channel = %self.key.name, error = %e, "Fetched value does not decode");
                    None
                }
            }
        };

        Fetched { envelope, data }
    }
}

fn decode<T: DeserializeOwned>(
    channel: &str,
    record: Record,
) -> Result<T> {
    serde_json::from_value(Value::Object(record)).map_err(|source| {
        CodecError::Decode {
            channel: channel.to_string(),
            source,
        }
        .into()
    })
}
