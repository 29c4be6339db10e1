//! Booking domain entity

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::room_type::RoomTypeKey;
use crate::domain::stay::StayRange;
use crate::shared::DomainError;

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Inventory held, payment not yet confirmed
    Pending,
    /// Inventory held and paid
    Confirmed,
    Cancelled,
    /// Stay finished
    Completed,
    PaymentFailed,
    Failed,
    /// Pending hold timed out
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::Failed => "FAILED",
            Self::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "CONFIRMED" => Some(Self::Confirmed),
            "CANCELLED" => Some(Self::Cancelled),
            "COMPLETED" => Some(Self::Completed),
            "PAYMENT_FAILED" => Some(Self::PaymentFailed),
            "FAILED" => Some(Self::Failed),
            "EXPIRED" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, PaymentFailed)
                | (Pending, Expired)
                | (Confirmed, Cancelled)
                | (Confirmed, Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Bookings in these states own rooms in the ledger.
    pub fn holds_inventory(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A room reservation held by a guest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub property_id: i64,
    pub user_id: i64,
    pub room_type_id: i64,
    pub check_in: NaiveDate,
    /// Exclusive
    pub check_out: NaiveDate,
    pub rooms: i32,
    pub guests: i32,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: BookingStatus,
    pub confirmation_code: String,
    pub idempotency_key: Option<String>,
    pub cancellation_reason: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Optimistic-lock version, bumped by every persisted update
    pub version: i64,
}

/// Fields the orchestrator supplies when creating a booking
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub property_id: i64,
    pub user_id: i64,
    pub room_type_id: i64,
    pub stay: StayRange,
    pub rooms: i32,
    pub guests: i32,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: BookingStatus,
    pub idempotency_key: Option<String>,
}

impl Booking {
    pub fn new(new: NewBooking, now: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            property_id: new.property_id,
            user_id: new.user_id,
            room_type_id: new.room_type_id,
            check_in: new.stay.check_in(),
            check_out: new.stay.check_out(),
            rooms: new.rooms,
            guests: new.guests,
            total_amount: new.total_amount,
            currency: new.currency,
            status: new.status,
            confirmation_code: confirmation_code_for(&id),
            idempotency_key: new.idempotency_key,
            cancellation_reason: None,
            refund_amount: None,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            version: 0,
        }
    }

    pub fn stay(&self) -> Result<StayRange, DomainError> {
        StayRange::new(self.check_in, self.check_out)
    }

    pub fn scope(&self) -> RoomTypeKey {
        RoomTypeKey::new(self.property_id, self.room_type_id)
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Move to `next`, or fail with `InvalidStateTransition`.
    pub fn transition_to(
        &mut self,
        next: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(
        &mut self,
        reason: Option<String>,
        refund: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.transition_to(BookingStatus::Cancelled, now)?;
        self.cancellation_reason = reason;
        self.refund_amount = Some(refund);
        self.cancelled_at = Some(now);
        Ok(())
    }

    /// Fail with `InvalidStateTransition` unless the booking is confirmed.
    /// Used by the modification operations, which only apply to live,
    /// paid bookings.
    pub fn ensure_modifiable(&self) -> Result<(), DomainError> {
        if self.status != BookingStatus::Confirmed {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: BookingStatus::Confirmed,
            });
        }
        Ok(())
    }
}

/// Externally shown booking reference, derived from the internal id.
pub fn confirmation_code_for(id: &Uuid) -> String {
    let digest = Sha256::digest(id.as_bytes());
    format!("HB-{}", hex::encode_upper(&digest[..5]))
}

// ── Tests ──────────────────────────────────────────────────────
