//! Availability module: stay checks, ledger setup and property calendars

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
