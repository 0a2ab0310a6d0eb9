//! AsyncNotificationManager implementation
//!
//! Fan-out of queue events to subscribers over unbounded channels. Each
//! subscriber registers with an [`EventFilter`] scoping it to one hospital,
//! one patient, or everything; publish delivers an event only to subscribers
//! whose filter accepts it. Within one hospital, events are published in the
//! order the owning actor committed the underlying mutations, and channel
//! sends preserve that order per subscriber. Delivery is fire-and-forget
//! with respect to the command that triggered the event.

use crate::notifications::error::NotificationError;
use crate::notifications::event::{Event, EventFilter};
use crate::notifications::traits::SubscriberStatistics;
use std::collections::HashMap;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Receiving half handed to a subscriber on subscribe.
pub type EventReceiver = UnboundedReceiver<Event>;

struct SubscriberInfo {
    filter: EventFilter,
    source: String,
    sender: UnboundedSender<Event>,
    statistics: SubscriberStatistics,
}

pub struct AsyncNotificationManager {
    subscribers: HashMap<String, SubscriberInfo>,
}

impl Default for AsyncNotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncNotificationManager {
    pub fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
        }
    }

    /// Register a subscriber. `source` is a free-form debugging label naming
    /// who holds the receiver (e.g. `"gateway:ws-7f3a"`). Re-subscribing with
    /// the same id replaces the previous subscription.
    pub fn subscribe(
        &mut self,
        subscriber_id: String,
        filter: EventFilter,
        source: String,
    ) -> Result<EventReceiver, NotificationError> {
        let (sender, receiver) = unbounded_channel();

        let subscriber_info = SubscriberInfo {
            filter,
            source: source.clone(),
            sender,
            statistics: SubscriberStatistics::new(),
        };

        if let Some(existing) = self.subscribers.insert(subscriber_id.clone(), subscriber_info) {
            log::warn!(
                "Subscriber '{}' replaced existing subscription (source: {} -> {})",
                subscriber_id,
                existing.source,
                source
            );
        }

        Ok(receiver)
    }

    /// Drop a subscription (the `leave:*` counterpart of subscribe). Returns
    /// whether the subscriber existed. A reconnecting subscriber must re-fetch
    /// a fresh snapshot before relying on subsequent deltas; missed events are
    /// not replayed.
    pub fn unsubscribe(&mut self, subscriber_id: &str) -> bool {
        self.subscribers.remove(subscriber_id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn has_subscriber(&self, subscriber_id: &str) -> bool {
        self.subscribers.contains_key(subscriber_id)
    }

    pub fn get_subscriber_statistics(&self, subscriber_id: &str) -> Option<&SubscriberStatistics> {
        self.subscribers
            .get(subscriber_id)
            .map(|info| &info.statistics)
    }

    /// Deliver an event to every subscriber whose filter accepts it.
    /// Subscribers whose receiving half has been dropped are removed; the
    /// returned error names them, but delivery to healthy subscribers has
    /// already succeeded by then.
    pub async fn publish(&mut self, event: Event) -> Result<(), NotificationError> {
        let event_kind = event.kind().to_string();
        let mut failed_subscribers = Vec::new();

        for (subscriber_id, subscriber_info) in &self.subscribers {
            if subscriber_info.filter.accepts(&event) {
                if subscriber_info.sender.send(event.clone()).is_err() {
                    failed_subscribers.push(subscriber_id.clone());
                } else {
                    subscriber_info.statistics.record_event_delivered();
                }
            }
        }

        for subscriber_id in &failed_subscribers {
            self.subscribers.remove(subscriber_id);
        }

        if !failed_subscribers.is_empty() {
            return Err(NotificationError::PublishFailed {
                event_kind,
                failed_subscribers,
            });
        }

        Ok(())
    }
}
