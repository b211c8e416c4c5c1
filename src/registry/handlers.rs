//! Producer and transform registration per channel.
//!
//! At most one producer and one transform exist per channel; registering again
//! replaces the previous one.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::debug;

use crate::ProducerError;

type ProducerFn =
    dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, ProducerError>> + Send + Sync;

type TransformFn = dyn Fn(Value) -> Result<Value, ProducerError> + Send + Sync;

/// Asynchronous (or synchronous) function that fetches a channel's raw value
#[derive(Clone)]
pub struct Producer {
    inner: Arc<ProducerFn>,
}

impl Producer {
    /// Wraps an async function.
    ///
    /// ```ignore
    /// let producer = Producer::new(|args| async move {
    ///     let id = args.first().cloned().unwrap_or_default();
    ///     Ok(json!({ "id": id }))
    /// });
    /// ```
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ProducerError>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |args: Vec<Value>| f(args).boxed()),
        }
    }

    /// Wraps a synchronous function. It runs when the returned future is first polled.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, ProducerError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self {
            inner: Arc::new(move |args: Vec<Value>| {
                let f = f.clone();
                async move { (*f)(args) }.boxed()
            }),
        }
    }

    pub fn call(
        &self,
        args: Vec<Value>,
    ) -> BoxFuture<'static, Result<Value, ProducerError>> {
        (self.inner)(args)
    }

    pub fn ptr_eq(
        &self,
        other: &Producer,
    ) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Producer").finish_non_exhaustive()
    }
}

/// Shapes a producer's raw result into the channel's stored form
#[derive(Clone)]
pub struct Transform {
    inner: Arc<TransformFn>,
}

impl Transform {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |raw: Value| Ok(f(raw))),
        }
    }

    /// A transform that may reject the raw value; a rejection ends the
    /// invocation in the Error state.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ProducerError> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    pub fn apply(
        &self,
        raw: Value,
    ) -> Result<Value, ProducerError> {
        (self.inner)(raw)
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Transform").finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct HandlerRegistry {
    producers: DashMap<String, Producer>,
    transforms: DashMap<String, Transform>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_producer(
        &self,
        channel: &str,
        producer: Producer,
    ) {
        if self.producers.insert(channel.to_string(), producer).is_some() {
            debug!(channel = %channel, "Producer replaced");
        } else {
            debug!(channel = %channel, "Producer registered");
        }
    }

    pub fn register_transform(
        &self,
        channel: &str,
        transform: Transform,
    ) {
        if self.transforms.insert(channel.to_string(), transform).is_some() {
            debug!(channel = %channel, "Transform replaced");
        } else {
            debug!(channel = %channel, "Transform registered");
        }
    }

    pub fn producer(
        &self,
        channel: &str,
    ) -> Option<Producer> {
        self.producers.get(channel).map(|p| p.value().clone())
    }

    pub fn transform(
        &self,
        channel: &str,
    ) -> Option<Transform> {
        self.transforms.get(channel).map(|t| t.value().clone())
    }

    pub fn remove_producer(
        &self,
        channel: &str,
    ) -> Option<Producer> {
        self.producers.remove(channel).map(|(_, p)| p)
    }

    pub fn remove_transform(
        &self,
        channel: &str,
    ) -> Option<Transform> {
        self.transforms.remove(channel).map(|(_, t)| t)
    }
}
