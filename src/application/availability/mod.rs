//! Availability management: reservation, release and inventory queries

pub mod service;

pub use service::{AvailabilityConfig, AvailabilityManager, MAX_RANGE_DAYS, OVERBOOKING_THRESHOLD};
