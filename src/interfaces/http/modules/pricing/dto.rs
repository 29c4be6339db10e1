//! Pricing DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::application::pricing::PriceBreakdown;

fn one_room() -> i32 {
    1
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteQuery {
    pub property_id: i64,
    pub room_type_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    /// Defaults to 1
    #[serde(default = "one_room")]
    pub rooms: i32,
}

/// Itemized quote. Amounts are decimal strings.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PriceQuoteDto {
    pub room_type_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub rooms: i32,
    #[schema(value_type = String)]
    pub base_price: Decimal,
    #[schema(value_type = String)]
    pub base_amount: Decimal,
    #[schema(value_type = String)]
    pub weekend_factor: Decimal,
    #[schema(value_type = String)]
    pub seasonal_factor: Decimal,
    #[schema(value_type = String)]
    pub demand_factor: Decimal,
    #[schema(value_type = String)]
    pub timing_factor: Decimal,
    #[schema(value_type = String)]
    pub length_of_stay_factor: Decimal,
    #[schema(value_type = String)]
    pub holiday_factor: Decimal,
    /// Absent when demand could not be read and was priced neutrally
    pub occupancy: Option<f64>,
    #[schema(value_type = String, example = "900.00")]
    pub final_amount: Decimal,
    #[schema(value_type = String)]
    pub savings: Decimal,
    pub currency: String,
}

impl PriceQuoteDto {
    pub fn new(b: PriceBreakdown, currency: String) -> Self {
        Self {
            room_type_id: b.room_type_id,
            check_in: b.check_in,
            check_out: b.check_out,
            nights: b.nights,
            rooms: b.rooms,
            base_price: b.base_price,
            base_amount: b.base_amount,
            weekend_factor: b.weekend_factor,
            seasonal_factor: b.seasonal_factor,
            demand_factor: b.demand_factor,
            timing_factor: b.timing_factor,
            length_of_stay_factor: b.length_of_stay_factor,
            holiday_factor: b.holiday_factor,
            occupancy: b.occupancy,
            final_amount: b.final_amount,
            savings: b.savings,
            currency,
        }
    }
}
