//! Booking aggregate
//!
//! Contains the Booking entity, its status state machine, and the
//! repository interface.

pub mod model;
pub mod repository;

pub use model::{confirmation_code_for, Booking, BookingStatus, NewBooking};
pub use repository::BookingRepository;
