//! Booking events
//!
//! Every state change the orchestrator persists is announced as one of
//! these, keyed by booking id.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::booking::{Booking, BookingStatus};

pub const BOOKING_TOPIC: &str = "booking-events";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BookingEvent {
    BookingCreated(BookingCreatedEvent),
    BookingCancelled(BookingCancelledEvent),
    BookingModified(BookingModifiedEvent),
    BookingStatusChanged(BookingStatusChangedEvent),
}

impl BookingEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::BookingCreated(_) => "booking.created",
            BookingEvent::BookingCancelled(_) => "booking.cancelled",
            BookingEvent::BookingModified(_) => "booking.modified",
            BookingEvent::BookingStatusChanged(_) => "booking.status_changed",
        }
    }

    pub fn booking_id(&self) -> Uuid {
        match self {
            BookingEvent::BookingCreated(e) => e.booking_id,
            BookingEvent::BookingCancelled(e) => e.booking_id,
            BookingEvent::BookingModified(e) => e.booking_id,
            BookingEvent::BookingStatusChanged(e) => e.booking_id,
        }
    }

    pub fn created(b: &Booking) -> Self {
        BookingEvent::BookingCreated(BookingCreatedEvent {
            booking_id: b.id,
            confirmation_code: b.confirmation_code.clone(),
            property_id: b.property_id,
            room_type_id: b.room_type_id,
            user_id: b.user_id,
            check_in: b.check_in,
            check_out: b.check_out,
            rooms: b.rooms,
            total_amount: b.total_amount,
            currency: b.currency.clone(),
            status: b.status,
            timestamp: b.created_at,
        })
    }

    pub fn cancelled(b: &Booking) -> Self {
        BookingEvent::BookingCancelled(BookingCancelledEvent {
            booking_id: b.id,
            confirmation_code: b.confirmation_code.clone(),
            reason: b.cancellation_reason.clone(),
            refund_amount: b.refund_amount.unwrap_or_default(),
            currency: b.currency.clone(),
            timestamp: b.cancelled_at.unwrap_or(b.updated_at),
        })
    }

    pub fn modified(b: &Booking, change: impl Into<String>) -> Self {
        BookingEvent::BookingModified(BookingModifiedEvent {
            booking_id: b.id,
            change: change.into(),
            check_out: b.check_out,
            rooms: b.rooms,
            guests: b.guests,
            total_amount: b.total_amount,
            timestamp: b.updated_at,
        })
    }

    pub fn status_changed(b: &Booking, from: BookingStatus) -> Self {
        BookingEvent::BookingStatusChanged(BookingStatusChangedEvent {
            booking_id: b.id,
            from,
            to: b.status,
            timestamp: b.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub confirmation_code: String,
    pub property_id: i64,
    pub room_type_id: i64,
    pub user_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub rooms: i32,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: BookingStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub confirmation_code: String,
    pub reason: Option<String>,
    pub refund_amount: Decimal,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingModifiedEvent {
    pub booking_id: Uuid,
    /// What changed: `extend_stay`, `guest_count` or `room_count`
    pub change: String,
    pub check_out: NaiveDate,
    pub rooms: i32,
    pub guests: i32,
    pub total_amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingStatusChangedEvent {
    pub booking_id: Uuid,
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub timestamp: DateTime<Utc>,
}
