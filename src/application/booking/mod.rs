//! Booking lifecycle: creation, modification, cancellation and expiry

pub mod expiry;
pub mod service;

pub use expiry::start_booking_expiry_task;
pub use service::{refund_amount, BookingConfig, BookingService, CreateBookingRequest};
