//! Booking domain events and the publication port

pub mod types;

pub use types::{
    BookingCancelledEvent, BookingCreatedEvent, BookingEvent, BookingModifiedEvent,
    BookingStatusChangedEvent, BOOKING_TOPIC,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Event sink unavailable: {0}")]
    Unavailable(String),
}

/// Outbound event sink.
///
/// Fire-and-forget: the booking flow logs a failed publish and carries on.
pub trait EventSink: Send + Sync {
    fn publish(&self, topic: &str, key: &str, event: &BookingEvent) -> Result<(), PublishError>;
}

/// Sink used when messaging is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, _topic: &str, _key: &str, _event: &BookingEvent) -> Result<(), PublishError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_sink_names_the_cause() {
        let err = PublishError::Unavailable("broker down".into());
        assert_eq!(err.to_string(), "Event sink unavailable: broker down");
    }
}
