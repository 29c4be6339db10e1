//! Booking module: create, hold, modify, cancel and look up bookings

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
