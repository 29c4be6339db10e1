//! Booking DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::booking::CreateBookingRequest;
use crate::domain::Booking;

/// Request to book rooms of one room type
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingBody {
    pub property_id: i64,
    pub user_id: i64,
    pub room_type_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[validate(range(min = 1, max = 50, message = "must be between 1 and 50"))]
    pub rooms: i32,
    #[validate(range(min = 1, max = 200, message = "must be between 1 and 200"))]
    pub guests: i32,
    /// Repeating a request with the same key returns the first booking
    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: Option<String>,
}

impl From<CreateBookingBody> for CreateBookingRequest {
    fn from(b: CreateBookingBody) -> Self {
        Self {
            property_id: b.property_id,
            user_id: b.user_id,
            room_type_id: b.room_type_id,
            check_in: b.check_in,
            check_out: b.check_out,
            rooms: b.rooms,
            guests: b.guests,
            idempotency_key: b.idempotency_key,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CancelBookingBody {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ExtendStayBody {
    pub new_check_out: NaiveDate,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangeGuestsBody {
    #[validate(range(min = 1, max = 200))]
    pub guests: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangeRoomsBody {
    #[validate(range(min = 1, max = 50))]
    pub rooms: i32,
}

/// Booking as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingDto {
    pub id: Uuid,
    pub confirmation_code: String,
    pub property_id: i64,
    pub user_id: i64,
    pub room_type_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub rooms: i32,
    pub guests: i32,
    #[schema(value_type = String, example = "160.00")]
    pub total_amount: Decimal,
    pub currency: String,
    /// PENDING, CONFIRMED, CANCELLED, COMPLETED, PAYMENT_FAILED, FAILED or EXPIRED
    pub status: String,
    pub idempotency_key: Option<String>,
    pub cancellation_reason: Option<String>,
    #[schema(value_type = Option<String>)]
    pub refund_amount: Option<Decimal>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingDto {
    fn from(b: Booking) -> Self {
        Self {
            nights: b.nights(),
            id: b.id,
            confirmation_code: b.confirmation_code,
            property_id: b.property_id,
            user_id: b.user_id,
            room_type_id: b.room_type_id,
            check_in: b.check_in,
            check_out: b.check_out,
            rooms: b.rooms,
            guests: b.guests,
            total_amount: b.total_amount,
            currency: b.currency,
            status: b.status.as_str().to_string(),
            idempotency_key: b.idempotency_key,
            cancellation_reason: b.cancellation_reason,
            refund_amount: b.refund_amount,
            cancelled_at: b.cancelled_at,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}
