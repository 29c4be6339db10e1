//! Pricing factors
//!
//! Every factor is a pure function of the stay, the quote date and the
//! observed occupancy. [`price_stay`] multiplies them onto the base amount.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::{RoomType, StayRange};

/// Occupancy above this is high demand.
pub const HIGH_DEMAND_OCCUPANCY: f64 = 0.80;
/// Occupancy below this is low demand.
pub const LOW_DEMAND_OCCUPANCY: f64 = 0.30;

/// (month, day) of nights that carry the holiday premium
const HOLIDAYS: [(u32, u32); 4] = [(1, 1), (7, 4), (12, 25), (12, 31)];

/// Friday and Saturday nights cost 25 % more; mixed stays are blended by
/// the share of weekend nights.
pub fn weekend_factor(stay: &StayRange) -> Decimal {
    let weekend = Decimal::from(stay.weekend_nights());
    let nights = Decimal::from(stay.nights());
    let share = weekend / nights;
    share * Decimal::new(125, 2) + (Decimal::ONE - share)
}

/// Multiplier for the month of check-in.
pub fn seasonal_factor(check_in: NaiveDate) -> Decimal {
    let hundredths = match check_in.month() {
        1 => 85,
        2 => 90,
        3 => 100,
        4 => 105,
        5 => 110,
        6 => 120,
        7 | 8 => 135,
        9 => 110,
        10 => 100,
        11 => 90,
        _ => 125,
    };
    Decimal::new(hundredths, 2)
}

/// `None` means occupancy could not be read; pricing stays neutral.
pub fn demand_factor(occupancy: Option<f64>) -> Decimal {
    match occupancy {
        Some(o) if o > HIGH_DEMAND_OCCUPANCY => Decimal::new(140, 2),
        Some(o) if o < LOW_DEMAND_OCCUPANCY => Decimal::new(80, 2),
        _ => Decimal::ONE,
    }
}

/// Last-minute (three days or less) and early-bird (over sixty days)
/// discounts.
pub fn timing_factor(days_until_check_in: i64) -> Decimal {
    if days_until_check_in <= 3 {
        Decimal::new(85, 2)
    } else if days_until_check_in > 60 {
        Decimal::new(90, 2)
    } else {
        Decimal::ONE
    }
}

pub fn length_of_stay_factor(nights: i64) -> Decimal {
    match nights {
        n if n >= 28 => Decimal::new(80, 2),
        n if n >= 7 => Decimal::new(90, 2),
        n if n >= 3 => Decimal::new(95, 2),
        _ => Decimal::ONE,
    }
}

/// Applied once, however many holiday nights the stay covers.
pub fn holiday_factor(stay: &StayRange) -> Decimal {
    let has_holiday = stay
        .dates()
        .any(|d| HOLIDAYS.contains(&(d.month(), d.day())));
    if has_holiday {
        Decimal::new(150, 2)
    } else {
        Decimal::ONE
    }
}

/// Itemized price of a stay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub room_type_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub rooms: i32,
    /// Nightly base rate
    pub base_price: Decimal,
    /// `base_price × nights × rooms`
    pub base_amount: Decimal,
    pub weekend_factor: Decimal,
    pub seasonal_factor: Decimal,
    pub demand_factor: Decimal,
    pub timing_factor: Decimal,
    pub length_of_stay_factor: Decimal,
    pub holiday_factor: Decimal,
    /// Share of rooms sold on the busiest night, if it could be read
    pub occupancy: Option<f64>,
    pub final_amount: Decimal,
    /// `max(0, base_amount − final_amount)`
    pub savings: Decimal,
}

/// Round to cents, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Price `rooms` rooms of `room_type` for `stay`, quoted on `today`.
pub fn price_stay(
    room_type: &RoomType,
    stay: &StayRange,
    rooms: i32,
    today: NaiveDate,
    occupancy: Option<f64>,
) -> PriceBreakdown {
    let nights = stay.nights();
    let base_amount = room_type.base_price * Decimal::from(nights) * Decimal::from(rooms);

    let weekend = weekend_factor(stay);
    let seasonal = seasonal_factor(stay.check_in());
    let demand = demand_factor(occupancy);
    let timing = timing_factor((stay.check_in() - today).num_days());
    let length = length_of_stay_factor(nights);
    let holiday = holiday_factor(stay);

    let final_amount =
        round_money(base_amount * weekend * seasonal * demand * timing * length * holiday);
    let savings = round_money((base_amount - final_amount).max(Decimal::ZERO));

    PriceBreakdown {
        room_type_id: room_type.id,
        check_in: stay.check_in(),
        check_out: stay.check_out(),
        nights,
        rooms,
        base_price: room_type.base_price,
        base_amount,
        weekend_factor: weekend,
        seasonal_factor: seasonal,
        demand_factor: demand,
        timing_factor: timing,
        length_of_stay_factor: length,
        holiday_factor: holiday,
        occupancy,
        final_amount,
        savings,
    }
}

// ── Tests ──────────────────────────────────────────────────────
