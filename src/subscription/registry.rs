//! Per-channel ordered listener lists.
//!
//! Listeners are grouped by channel in a `DashMap`. Notification snapshots the
//! channel's list first and invokes listeners with no map lock held, so a
//! listener may subscribe or unsubscribe (on any channel) while it runs.
//! Listeners added during a notification pass are not called in that pass;
//! listeners removed during a pass still receive it.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;
use tracing::warn;

use crate::Record;
use crate::SubscriptionConfig;

/// Callback invoked with a channel's value on every change
pub type Listener = Arc<dyn Fn(&Record) + Send + Sync>;

/// Registry-unique identifier of one subscription
pub type ListenerId = u64;

/// Compares two listeners by reference.
///
/// Only the data pointer is compared: two `Arc`s cloned from the same listener
/// are the same listener even if their vtable pointers differ.
pub fn same_listener(
    a: &Listener,
    b: &Listener,
) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

struct ListenerEntry {
    id: ListenerId,
    listener: Listener,
}

struct RegistryInner {
    /// Listeners grouped by channel, in subscription order
    listeners: DashMap<String, Vec<ListenerEntry>>,

    /// Next listener ID (monotonically increasing)
    next_id: AtomicU64,

    config: SubscriptionConfig,
}

impl std::fmt::Debug for RegistryInner {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RegistryInner")
            .field("channels", &self.listeners.len())
            .field("next_id", &self.next_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RegistryInner {
    fn remove_id(
        &self,
        channel: &str,
        id: ListenerId,
    ) -> bool {
        // The entry is dropped after the shard lock is released: its listener
        // may own a Subscription whose drop re-enters this map.
        let mut taken = None;
        self.listeners.remove_if_mut(channel, |_channel, entries| {
            if let Some(position) = entries.iter().position(|e| e.id == id) {
                taken = Some(entries.remove(position));
            }
            entries.is_empty()
        });
        taken.is_some()
    }
}

struct SubscriptionCleanup {
    id: ListenerId,
    channel: String,
    registry: Arc<RegistryInner>,
}

/// Unsubscribe capability returned by `subscribe`.
///
/// Calling [`unsubscribe`](Subscription::unsubscribe) or dropping the value
/// removes exactly this listener. Use [`detach`](Subscription::detach) to keep
/// the listener registered for the lifetime of the store.
#[must_use = "dropping a Subscription unsubscribes its listener immediately"]
pub struct Subscription {
    /// None once detached or unsubscribed
    cleanup: Option<SubscriptionCleanup>,
    id: ListenerId,
    channel: String,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Removes the listener. Returns `false` if it was already removed by
    /// another path (e.g. [`SubscriptionRegistry::unregister`]).
    pub fn unsubscribe(mut self) -> bool {
        match self.cleanup.take() {
            Some(cleanup) => {
                let removed = cleanup.registry.remove_id(&cleanup.channel, cleanup.id);
                trace!(listener_id = cleanup.id, channel = %cleanup.channel, "Listener unsubscribed");
                removed
            }
            None => false,
        }
    }

    /// Keeps the listener registered without holding on to the capability.
    pub fn detach(mut self) -> ListenerId {
        self.cleanup = None;
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup.registry.remove_id(&cleanup.channel, cleanup.id);
            trace!(
                listener_id = cleanup.id,
                channel = %cleanup.channel,
                "Listener unsubscribed on drop"
            );
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("active", &self.cleanup.is_some())
            .finish()
    }
}

/// Ordered listener lists keyed by channel
#[derive(Debug, Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<RegistryInner>,
}

impl SubscriptionRegistry {
    pub fn new(config: SubscriptionConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                listeners: DashMap::new(),
                next_id: AtomicU64::new(1),
                config,
            }),
        }
    }

    /// Appends `listener` to the channel's list.
    ///
    /// Replay of the current value is the store's job; see
    /// [`ChannelStore::subscribe`](crate::ChannelStore::subscribe).
    pub fn register(
        &self,
        channel: &str,
        listener: Listener,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let count = {
            let mut entries = self.inner.listeners.entry(channel.to_string()).or_default();
            entries.push(ListenerEntry { id, listener });
            entries.len()
        };

        let threshold = self.inner.config.listener_warn_threshold;
        if threshold > 0 && count == threshold + 1 {
            warn!(
                channel = %channel,
                listener_count = count,
                threshold = threshold,
                "Channel listener count exceeded threshold, possible subscription leak"
            );
        }

        trace!(listener_id = id, channel = %channel, listener_count = count, "Listener subscribed");

        Subscription {
            cleanup: Some(SubscriptionCleanup {
                id,
                channel: channel.to_string(),
                registry: self.inner.clone(),
            }),
            id,
            channel: channel.to_string(),
        }
    }

    /// Removes the first entry whose reference equals `listener`.
    ///
    /// No-op (returns `false`) if the channel is unknown or the listener is not registered.
    pub fn unregister(
        &self,
        channel: &str,
        listener: &Listener,
    ) -> bool {
        let mut taken = None;
        self.inner.listeners.remove_if_mut(channel, |_channel, entries| {
            if let Some(position) = entries.iter().position(|e| same_listener(&e.listener, listener)) {
                taken = Some(entries.remove(position));
            }
            entries.is_empty()
        });
        taken.is_some()
    }

    /// Removes the subscription with the given id.
    pub fn unregister_id(
        &self,
        channel: &str,
        id: ListenerId,
    ) -> bool {
        self.inner.remove_id(channel, id)
    }

    /// Copy of the channel's listeners in subscription order
    pub fn snapshot(
        &self,
        channel: &str,
    ) -> Vec<Listener> {
        self.inner
            .listeners
            .get(channel)
            .map(|entries| entries.iter().map(|e| e.listener.clone()).collect())
            .unwrap_or_default()
    }

    /// Invokes every listener of `channel` with `value`, in subscription order.
    ///
    /// Returns the number of listeners called.
    pub fn notify(
        &self,
        channel: &str,
        value: &Record,
    ) -> usize {
        let listeners = self.snapshot(channel);
        for listener in &listeners {
            listener(value);
        }
        listeners.len()
    }

    pub fn listener_count(
        &self,
        channel: &str,
    ) -> usize {
        self.inner.listeners.get(channel).map(|e| e.len()).unwrap_or(0)
    }

    pub fn subscribed_channel_count(&self) -> usize {
        self.inner.listeners.len()
    }
}
