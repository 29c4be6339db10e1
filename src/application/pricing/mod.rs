//! Dynamic pricing
//!
//! A chain of multipliers over calendar, demand and booking-timing signals.

pub mod engine;
pub mod factors;

pub use engine::{OccupancySource, PricingEngine};
pub use factors::{price_stay, round_money, PriceBreakdown};
