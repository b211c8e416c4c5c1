use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::Producer;
use crate::ProducerError;

/// Call counter shared between a test and its producer
#[derive(Clone, Default)]
pub(crate) struct CallCounter {
    calls: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl CallCounter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of producer calls observed running at the same time
    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Producer resolving to `result` after `delay`, counting its calls
pub(crate) fn counting_producer(
    counter: CallCounter,
    result: Value,
    delay: Duration,
) -> Producer {
    Producer::new(move |_args| {
        let counter = counter.clone();
        let result = result.clone();
        async move {
            counter.enter();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            counter.exit();
            Ok::<Value, ProducerError>(result)
        }
    })
}

/// Producer failing with `message` after counting the call
pub(crate) fn failing_producer(
    counter: CallCounter,
    message: &'static str,
) -> Producer {
    Producer::new(move |_args| {
        let counter = counter.clone();
        async move {
            counter.enter();
            counter.exit();
            Err::<Value, ProducerError>(message.into())
        }
    })
}
