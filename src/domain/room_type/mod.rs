//! Room type reference data
//!
//! Owned by the property catalog; the booking core only reads it.

pub mod model;
pub mod repository;

pub use model::{RoomType, RoomTypeKey};
pub use repository::RoomTypeLookup;
