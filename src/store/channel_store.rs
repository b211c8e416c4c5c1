//! Last-known value per channel, with merge-writes and equality-gated
//! change notification.
//!
//! # Notification model
//!
//! Every mutating call runs under a re-entrant notification gate: the value is
//! updated, the store lock is released, then listeners are invoked
//! synchronously on the calling thread. Writes from other threads wait for the
//! whole sequence to finish; writes issued by a listener on the same thread go
//! straight through, which keeps listeners free to read and write the store.

use std::collections::HashMap;

use parking_lot::ReentrantMutex;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use super::canonical::records_equal;
use super::record::into_record;
use super::record::merge;
use crate::Listener;
use crate::Record;
use crate::Result;
use crate::StoreConfig;
use crate::Subscription;
use crate::SubscriptionRegistry;

#[derive(Debug)]
pub struct ChannelStore {
    values: RwLock<HashMap<String, Record>>,
    subscriptions: SubscriptionRegistry,
    /// Serializes write+notify sequences across threads
    gate: ReentrantMutex<()>,
    config: StoreConfig,
}

impl ChannelStore {
    pub fn new(
        config: StoreConfig,
        subscriptions: SubscriptionRegistry,
    ) -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            subscriptions,
            gate: ReentrantMutex::new(()),
            config,
        }
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    /// Merge-writes `partial` into the channel's value.
    ///
    /// Returns `Ok(false)` when the merged record is structurally equal to the
    /// previous one; nothing is stored and no listener runs in that case.
    ///
    /// # Errors
    /// [`StoreError::MalformedMerge`](crate::StoreError::MalformedMerge) if
    /// `partial` is not a record.
    pub fn write(
        &self,
        channel: &str,
        partial: Value,
    ) -> Result<bool> {
        let partial = into_record(channel, partial)?;
        let _gate = self.gate.lock();

        let merged = {
            let mut values = self.values.write();
            let previous = values.get(channel);
            let merged = merge(previous, partial);

            if self.config.dedup_writes && unchanged(previous, &merged) {
                trace!(channel = %channel, "Write suppressed, value unchanged");
                return Ok(false);
            }

            values.insert(channel.to_string(), merged.clone());
            merged
        };

        let notified = self.subscriptions.notify(channel, &merged);
        trace!(channel = %channel, notified, "Channel value updated");
        Ok(true)
    }

    /// Notifies listeners with `previous ∪ partial` without storing it.
    pub fn broadcast(
        &self,
        channel: &str,
        partial: Value,
    ) -> Result<()> {
        let partial = into_record(channel, partial)?;
        let _gate = self.gate.lock();

        let merged = merge(self.values.read().get(channel), partial);
        let notified = self.subscriptions.notify(channel, &merged);
        trace!(channel = %channel, notified, "Broadcast without persistence");
        Ok(())
    }

    /// Direct write that replaces instead of merging.
    ///
    /// With `should_cache` the stored value becomes `value`, even an empty
    /// record on an absent channel. It is suppressed only when equal to an
    /// existing value. Without `should_cache` the store is left untouched and
    /// listeners are notified with `value` as given.
    pub fn set_raw(
        &self,
        channel: &str,
        value: Value,
        should_cache: bool,
    ) -> Result<bool> {
        let value = into_record(channel, value)?;
        let _gate = self.gate.lock();

        if should_cache {
            let mut values = self.values.write();
            let same = values
                .get(channel)
                .is_some_and(|previous| records_equal(previous, &value));
            if self.config.dedup_writes && same {
                trace!(channel = %channel, "Raw write suppressed, value unchanged");
                return Ok(false);
            }
            values.insert(channel.to_string(), value.clone());
        }

        self.subscriptions.notify(channel, &value);
        Ok(should_cache)
    }

    /// Current value, or an empty record if the channel holds none.
    pub fn read(
        &self,
        channel: &str,
    ) -> Record {
        self.values.read().get(channel).cloned().unwrap_or_default()
    }

    /// Current value, if any
    pub fn get(
        &self,
        channel: &str,
    ) -> Option<Record> {
        self.values.read().get(channel).cloned()
    }

    pub fn contains(
        &self,
        channel: &str,
    ) -> bool {
        self.values.read().contains_key(channel)
    }

    /// Stores `default` only if the channel holds no value yet and returns the
    /// current value. Listeners are not notified.
    pub fn initialize_if_absent(
        &self,
        channel: &str,
        default: Value,
    ) -> Result<Record> {
        let default = into_record(channel, default)?;
        let _gate = self.gate.lock();

        let mut values = self.values.write();
        let current = values.entry(channel.to_string()).or_insert(default);
        Ok(current.clone())
    }

    /// Removes the channel's value entirely. Listeners are not notified.
    pub fn clear(
        &self,
        channel: &str,
    ) -> bool {
        let _gate = self.gate.lock();
        let removed = self.values.write().remove(channel).is_some();
        if removed {
            trace!(channel = %channel, "Channel value cleared");
        }
        removed
    }

    /// Registers `listener` and, if the channel holds a value, invokes it once
    /// with that value before returning.
    pub fn subscribe(
        &self,
        channel: &str,
        listener: Listener,
    ) -> Subscription {
        let _gate = self.gate.lock();

        let subscription = self.subscriptions.register(channel, listener.clone());
        if let Some(current) = self.get(channel) {
            listener(&current);
        }
        subscription
    }

    /// Channels currently holding a value, sorted
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.values.read().keys().cloned().collect();
        channels.sort_unstable();
        channels
    }
}

fn unchanged(
    previous: Option<&Record>,
    next: &Record,
) -> bool {
    match previous {
        Some(previous) => records_equal(previous, next),
        None => next.is_empty(),
    }
}
