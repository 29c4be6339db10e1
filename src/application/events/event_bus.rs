//! Event Bus for broadcasting booking events to subscribers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::events::{BookingEvent, EventSink, PublishError};

const DEFAULT_CAPACITY: usize = 1024;

/// A published event with its routing metadata
#[derive(Debug, Clone, Serialize)]
pub struct EventMessage {
    pub topic: String,
    /// Partition key (the booking id)
    pub key: String,
    pub event_type: &'static str,
    pub published_at: DateTime<Utc>,
    pub event: BookingEvent,
}

/// Event bus for broadcasting events to all subscribers
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn subscribe(&self) -> EventSubscriber {
        let receiver = self.sender.subscribe();
        self.subscriber_count.fetch_add(1, Ordering::SeqCst);
        let count = self.subscriber_count.load(Ordering::SeqCst);
        info!(total = count, "New event subscriber");

        EventSubscriber {
            receiver,
            subscriber_count: self.subscriber_count.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn publish(&self, topic: &str, key: &str, event: &BookingEvent) -> Result<(), PublishError> {
        let message = EventMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            event_type: event.event_type(),
            published_at: Utc::now(),
            event: event.clone(),
        };

        match self.sender.send(message) {
            Ok(count) => {
                debug!(
                    event_type = event.event_type(),
                    key,
                    subscribers = count,
                    "Event published"
                );
            }
            Err(_) => {
                debug!(
                    event_type = event.event_type(),
                    key,
                    "Event published (no subscribers)"
                );
            }
        }
        Ok(())
    }
}

/// Event subscriber that receives events from the bus
pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventSubscriber {
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(missed = count, "Subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return None;
                }
            }
        }
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        let prev = self.subscriber_count.fetch_sub(1, Ordering::SeqCst);
        info!(remaining = prev - 1, "Event subscriber disconnected");
    }
}

/// Shared event bus type
pub type SharedEventBus = Arc<EventBus>;

/// Create a shared event bus
pub fn create_event_bus(capacity: usize) -> SharedEventBus {
    Arc::new(EventBus::with_capacity(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::BOOKING_TOPIC;
    use crate::domain::{Booking, BookingStatus, NewBooking, StayRange};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn booking() -> Booking {
        Booking::new(
            NewBooking {
                property_id: 1,
                user_id: 2,
                room_type_id: 3,
                stay: StayRange::new(
                    NaiveDate::from_ymd_opt(2027, 6, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2027, 6, 3).unwrap(),
                )
                .unwrap(),
                rooms: 1,
                guests: 1,
                total_amount: Decimal::new(24000, 2),
                currency: "USD".into(),
                status: BookingStatus::Confirmed,
                idempotency_key: None,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        let b = booking();

        bus.publish(BOOKING_TOPIC, &b.id.to_string(), &BookingEvent::created(&b))
            .unwrap();

        let msg = sub.recv().await.unwrap();
        assert_eq!(msg.topic, BOOKING_TOPIC);
        assert_eq!(msg.key, b.id.to_string());
        assert_eq!(msg.event_type, "booking.created");
        assert_eq!(msg.event.booking_id(), b.id);
    }

    #[test]
    fn publishing_without_subscribers_succeeds() {
        let bus = EventBus::new();
        let b = booking();
        assert!(bus
            .publish(BOOKING_TOPIC, "k", &BookingEvent::created(&b))
            .is_ok());
    }

    #[test]
    fn subscriber_count_tracks_drops() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let _b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
        drop(a);
        assert_eq!(bus.subscriber_count(), 1);
    }
}
