//! Availability DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::{CalendarDay, OverbookingAlert};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckAvailabilityQuery {
    pub property_id: i64,
    pub room_type_id: i64,
    pub check_in: NaiveDate,
    /// Exclusive
    pub check_out: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    /// Rooms free on every night of the stay
    pub available_rooms: i32,
    pub total_rooms: i32,
    /// Current price of one room for the stay, divided by its nights
    #[schema(value_type = String, example = "80.00")]
    pub price_per_night: Decimal,
}

/// Date window for property-wide queries
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateWindowQuery {
    pub start: NaiveDate,
    /// Exclusive
    pub end: NaiveDate,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InitializeAvailabilityBody {
    pub property_id: i64,
    pub room_type_id: i64,
    pub start_date: NaiveDate,
    /// Exclusive
    pub end_date: NaiveDate,
    /// Defaults to the room type's physical room count
    #[validate(range(min = 0, max = 10000))]
    pub total_rooms: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResizeInventoryBody {
    pub property_id: i64,
    pub room_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 0, max = 10000))]
    pub total_rooms: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TeardownInventoryBody {
    pub property_id: i64,
    pub room_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Number of ledger rows an inventory operation touched
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AffectedDays {
    pub days: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CalendarDayDto {
    pub date: NaiveDate,
    pub available: i32,
    pub total: i32,
    pub occupancy_rate: f64,
}

impl CalendarDayDto {
    pub fn new(date: NaiveDate, day: CalendarDay) -> Self {
        Self {
            date,
            available: day.available,
            total: day.total,
            occupancy_rate: day.occupancy_rate,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OverbookingAlertDto {
    pub room_type_id: i64,
    pub date: NaiveDate,
    pub available_rooms: i32,
    pub total_rooms: i32,
    pub availability_rate: f64,
}

impl From<OverbookingAlert> for OverbookingAlertDto {
    fn from(a: OverbookingAlert) -> Self {
        Self {
            room_type_id: a.room_type_id,
            date: a.date,
            available_rooms: a.available_rooms,
            total_rooms: a.total_rooms,
            availability_rate: a.availability_rate,
        }
    }
}
