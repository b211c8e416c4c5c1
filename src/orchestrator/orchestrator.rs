//! Drives one fetch lifecycle per invocation: Idle -> Loading -> Success | Error.
//!
//! Failures never escape [`Orchestrator::invoke`]. A failing producer or
//! transform ends the invocation in the Error state and the caller receives
//! the Error record, exactly like subscribers do.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::future::Shared;
use futures::FutureExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::warn;

use super::ErrorFlag;
use super::FetchEnvelope;
use crate::constants::PANIC_FALLBACK_MESSAGE;
use crate::into_record;
use crate::value_kind;
use crate::ChannelStore;
use crate::ConcurrencyPolicy;
use crate::HandlerRegistry;
use crate::OrchestratorConfig;
use crate::Producer;
use crate::ProducerError;
use crate::Record;

type InFlight = Shared<BoxFuture<'static, Record>>;

struct OrchestratorInner {
    store: Arc<ChannelStore>,
    handlers: Arc<HandlerRegistry>,
    test_mode: AtomicBool,
    config: OrchestratorConfig,
    /// Lifecycles shared by coalesced invocations
    in_flight: DashMap<String, InFlight>,
    /// Per-channel turn for queued invocations
    queues: DashMap<String, Arc<Mutex<()>>>,
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("test_mode", &self.is_test_mode())
            .field("config", &self.inner.config)
            .field("in_flight", &self.inner.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        store: Arc<ChannelStore>,
        handlers: Arc<HandlerRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                store,
                handlers,
                test_mode: AtomicBool::new(config.test_mode),
                config,
                in_flight: DashMap::new(),
                queues: DashMap::new(),
            }),
        }
    }

    pub fn set_test_mode(
        &self,
        enabled: bool,
    ) {
        self.inner.test_mode.store(enabled, Ordering::SeqCst);
    }

    pub fn is_test_mode(&self) -> bool {
        self.inner.test_mode.load(Ordering::SeqCst)
    }

    /// Runs the channel's producer and resolves with the terminal record.
    ///
    /// - Test mode with a cached value: resolves with the cached value, the
    ///   producer is not called and no Loading state is written.
    /// - No producer registered: resolves with [`ChannelStore::read`].
    /// - Otherwise: Loading is written, then the Success record
    ///   (`{loading: false, error: false, hasLoaded: true, ..payload}`) or the
    ///   Error record (`{loading: false, error: <message>, hasLoaded: true}`).
    ///
    /// Simultaneous invocations on the same channel follow
    /// [`OrchestratorConfig::concurrency`]. Under `Coalesce` a joining
    /// invocation's `args` are ignored.
    pub async fn invoke(
        &self,
        channel: &str,
        args: Vec<Value>,
    ) -> Record {
        if self.is_test_mode() {
            if let Some(cached) = self.inner.store.get(channel) {
                debug!(channel = %channel, "Test mode: resolving with cached value");
                return cached;
            }
        }

        let Some(producer) = self.inner.handlers.producer(channel) else {
            debug!(channel = %channel, "No producer registered, resolving with current value");
            return self.inner.store.read(channel);
        };

        match self.inner.config.concurrency {
            ConcurrencyPolicy::Race => {
                run_lifecycle(self.inner.clone(), channel.to_string(), producer, args).await
            }
            ConcurrencyPolicy::Queue => {
                let turn = self
                    .inner
                    .queues
                    .entry(channel.to_string())
                    .or_default()
                    .value()
                    .clone();
                let _turn = turn.lock().await;
                run_lifecycle(self.inner.clone(), channel.to_string(), producer, args).await
            }
            ConcurrencyPolicy::Coalesce => self.invoke_coalesced(channel, producer, args).await,
        }
    }

    async fn invoke_coalesced(
        &self,
        channel: &str,
        producer: Producer,
        args: Vec<Value>,
    ) -> Record {
        let shared = match self.inner.in_flight.entry(channel.to_string()) {
            Entry::Occupied(entry) => {
                debug!(channel = %channel, "Joining in-flight invocation");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let lifecycle =
                    run_lifecycle(self.inner.clone(), channel.to_string(), producer, args)
                        .boxed()
                        .shared();
                entry.insert(lifecycle.clone());
                lifecycle
            }
        };

        let terminal = shared.clone().await;
        self.inner.in_flight.remove_if(channel, |_, current| current.ptr_eq(&shared));
        terminal
    }

    /// Calls the producer without the lifecycle envelope or the transform.
    ///
    /// A non-null result is merge-written into the channel and returned. Unlike
    /// [`invoke`](Self::invoke), producer failures are returned to the caller.
    /// Returns `Ok(None)` when no producer is registered or it produced `null`.
    pub async fn fetch_direct(
        &self,
        channel: &str,
        args: Vec<Value>,
    ) -> Result<Option<Record>, ProducerError> {
        if self.is_test_mode() {
            if let Some(cached) = self.inner.store.get(channel) {
                debug!(channel = %channel, "Test mode: direct fetch resolved with cached value");
                return Ok(Some(cached));
            }
        }

        let Some(producer) = self.inner.handlers.producer(channel) else {
            return Ok(None);
        };

        match producer.call(args).await? {
            Value::Null => Ok(None),
            value => {
                let record = into_record(channel, value)?;
                self.inner.store.write(channel, Value::Object(record.clone()))?;
                Ok(Some(record))
            }
        }
    }
}

async fn run_lifecycle(
    inner: Arc<OrchestratorInner>,
    channel: String,
    producer: Producer,
    args: Vec<Value>,
) -> Record {
    inner.write_envelope(&channel, FetchEnvelope::loading().into_record());
    debug!(channel = %channel, "Fetch entered Loading");

    let terminal = match inner.produce(&channel, producer, args).await {
        Ok(payload) => {
            let mut terminal = FetchEnvelope::success().into_record();
            terminal.extend(payload);
            debug!(channel = %channel, "Fetch succeeded");
            terminal
        }
        Err(e) => {
            warn!(channel = %channel, error = %e, "Fetch failed");
            FetchEnvelope::failure(inner.error_flag(e.as_ref())).into_record()
        }
    };

    inner.write_envelope(&channel, terminal.clone());
    terminal
}

impl OrchestratorInner {
    fn write_envelope(
        &self,
        channel: &str,
        record: Record,
    ) {
        if let Err(e) = self.store.write(channel, Value::Object(record)) {
            warn!(channel = %channel, error = %e, "Failed to write fetch state");
        }
    }

    /// Producer call followed by the transform; the shaped value must be a
    /// record (`null` counts as an empty one).
    async fn produce(
        &self,
        channel: &str,
        producer: Producer,
        args: Vec<Value>,
    ) -> Result<Record, ProducerError> {
        let raw = if self.config.catch_panics {
            let pending = std::panic::catch_unwind(AssertUnwindSafe(|| producer.call(args)))
                .map_err(panic_error)?;
            AssertUnwindSafe(pending).catch_unwind().await.map_err(panic_error)??
        } else {
            producer.call(args).await?
        };

        let shaped = match self.handlers.transform(channel) {
            Some(transform) if self.config.catch_panics => {
                std::panic::catch_unwind(AssertUnwindSafe(|| transform.apply(raw)))
                    .map_err(panic_error)??
            }
            Some(transform) => transform.apply(raw)?,
            None => raw,
        };

        match shaped {
            Value::Object(record) => Ok(record),
            Value::Null => Ok(Record::new()),
            other => Err(format!(
                "channel `{}` expected a record from its producer, got {}",
                channel,
                value_kind(&other)
            )
            .into()),
        }
    }

    fn error_flag(
        &self,
        error: &(dyn std::error::Error + Send + Sync),
    ) -> ErrorFlag {
        let message = error.to_string();
        if !message.is_empty() {
            return ErrorFlag::Message(message);
        }
        match &self.config.fallback_error_message {
            Some(fallback) => ErrorFlag::Message(fallback.clone()),
            None => ErrorFlag::Flag(true),
        }
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> ProducerError {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        PANIC_FALLBACK_MESSAGE.to_string()
    };
    message.into()
}
