//! Application-owned context object bundling the Channel Store, the
//! Subscription Registry, the Producer/Transform Registry and the Async
//! Orchestrator.
//!
//! ## Key Design Points
//! - **Explicit ownership**: there is no process-wide singleton. The application
//!   root builds one [`ChannelBus`] and hands clones to its consumers; clones
//!   share the same state.
//! - **Errors as data**: [`ChannelBus::invoke`] always resolves. Producer
//!   failures reach consumers as the `error` field of the terminal record.
//!
//! ## Example
//! ```ignore
//! let bus = ChannelBus::new(BusConfig::new()?.validate()?);
//! bus.register_channel(
//!     "counter",
//!     ChannelRegistration::new()
//!         .on_fetch(Producer::new(|_| async { Ok(json!({ "id": 42 })) }))
//!         .on_response_transform(Transform::new(|raw| json!({ "count": raw["id"] }))),
//! )?;
//!
//! let _subscription = bus.subscribe("counter", |value| println!("{value:?}"));
//! let terminal = bus.invoke("counter", vec![]).await;
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::into_record;
use crate::BusConfig;
use crate::ChannelKey;
use crate::ChannelRegistration;
use crate::ChannelStore;
use crate::HandlerRegistry;
use crate::Listener;
use crate::Orchestrator;
use crate::Producer;
use crate::ProducerError;
use crate::Record;
use crate::Result;
use crate::Subscription;
use crate::SubscriptionRegistry;
use crate::Transform;
use crate::TypedChannel;

#[derive(Debug)]
struct BusInner {
    config: BusConfig,
    store: Arc<ChannelStore>,
    handlers: Arc<HandlerRegistry>,
    orchestrator: Orchestrator,
}

#[derive(Debug, Clone)]
pub struct ChannelBus {
    inner: Arc<BusInner>,
}

impl Default for ChannelBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl ChannelBus {
    pub fn new(config: BusConfig) -> Self {
        let subscriptions = SubscriptionRegistry::new(config.subscription.clone());
        let store = Arc::new(ChannelStore::new(config.store.clone(), subscriptions));
        let handlers = Arc::new(HandlerRegistry::new());
        let orchestrator =
            Orchestrator::new(store.clone(), handlers.clone(), config.orchestrator.clone());

        debug!(?config, "Channel bus created");

        Self {
            inner: Arc::new(BusInner {
                config,
                store,
                handlers,
                orchestrator,
            }),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &ChannelStore {
        &self.inner.store
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.inner.handlers
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }

    /// Wires a producer, a transform and an initial cached value for `channel`.
    ///
    /// Producer and transform replace earlier registrations; the default value
    /// is only stored if the channel holds nothing yet.
    ///
    /// # Errors
    /// Fails if `default_value` is not a record; nothing is registered or
    /// stored in that case.
    pub fn register_channel(
        &self,
        channel: &str,
        registration: ChannelRegistration,
    ) -> Result<()> {
        if registration.is_empty() {
            warn!(channel = %channel, "No configuration provided for channel");
            return Ok(());
        }

        let ChannelRegistration {
            on_fetch,
            on_response_transform,
            default_value,
        } = registration;
        let default_value = default_value
            .map(|value| into_record(channel, value))
            .transpose()?;

        if let Some(producer) = on_fetch {
            self.register_producer(channel, producer);
        }
        if let Some(transform) = on_response_transform {
            self.register_transform(channel, transform);
        }
        if let Some(default_value) = default_value {
            self.inner
                .store
                .initialize_if_absent(channel, Value::Object(default_value))?;
        }
        Ok(())
    }

    pub fn register_producer(
        &self,
        channel: &str,
        producer: Producer,
    ) {
        self.inner.handlers.register_producer(channel, producer);
    }

    pub fn register_transform(
        &self,
        channel: &str,
        transform: Transform,
    ) {
        self.inner.handlers.register_transform(channel, transform);
    }

    /// Typed view of the channel named by `key`
    pub fn typed<T>(
        &self,
        key: ChannelKey<T>,
    ) -> TypedChannel<T>
    where
        T: Serialize + DeserializeOwned,
    {
        TypedChannel::new(self.clone(), key)
    }

    //-----------------------------------------------------------
    // Subscription API

    /// Subscribes `listener`; it runs immediately with the current value if
    /// the channel holds one.
    pub fn subscribe<F>(
        &self,
        channel: &str,
        listener: F,
    ) -> Subscription
    where
        F: Fn(&Record) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(channel, Arc::new(listener))
    }

    /// Subscribes a shared listener, which can later be removed by reference
    /// with [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe_listener(
        &self,
        channel: &str,
        listener: Listener,
    ) -> Subscription {
        self.inner.store.subscribe(channel, listener)
    }

    pub fn unsubscribe(
        &self,
        channel: &str,
        listener: &Listener,
    ) -> bool {
        self.inner.store.subscriptions().unregister(channel, listener)
    }

    pub fn read(
        &self,
        channel: &str,
    ) -> Record {
        self.inner.store.read(channel)
    }

    pub fn contains(
        &self,
        channel: &str,
    ) -> bool {
        self.inner.store.contains(channel)
    }

    pub fn write(
        &self,
        channel: &str,
        partial: Value,
    ) -> Result<bool> {
        self.inner.store.write(channel, partial)
    }

    /// `write(channel, partial, cache = false)`: notify without storing.
    pub fn broadcast(
        &self,
        channel: &str,
        partial: Value,
    ) -> Result<()> {
        self.inner.store.broadcast(channel, partial)
    }

    pub fn set_raw(
        &self,
        channel: &str,
        value: Value,
        should_cache: bool,
    ) -> Result<bool> {
        self.inner.store.set_raw(channel, value, should_cache)
    }

    pub fn initialize_if_absent(
        &self,
        channel: &str,
        default: Value,
    ) -> Result<Record> {
        self.inner.store.initialize_if_absent(channel, default)
    }

    pub fn clear(
        &self,
        channel: &str,
    ) -> bool {
        self.inner.store.clear(channel)
    }

    //-----------------------------------------------------------
    // Orchestration API

    pub async fn invoke(
        &self,
        channel: &str,
        args: Vec<Value>,
    ) -> Record {
        self.inner.orchestrator.invoke(channel, args).await
    }

    pub async fn fetch_direct(
        &self,
        channel: &str,
        args: Vec<Value>,
    ) -> std::result::Result<Option<Record>, ProducerError> {
        self.inner.orchestrator.fetch_direct(channel, args).await
    }

    pub fn set_test_mode(
        &self,
        enabled: bool,
    ) {
        self.inner.orchestrator.set_test_mode(enabled);
    }

    pub fn is_test_mode(&self) -> bool {
        self.inner.orchestrator.is_test_mode()
    }
}
