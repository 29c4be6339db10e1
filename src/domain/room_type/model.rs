//! Room type entity

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifies the inventory scope of one room type within one property.
///
/// This is the granularity of the logical reservation lock: two requests
/// contend only when they share a `RoomTypeKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomTypeKey {
    pub property_id: i64,
    pub room_type_id: i64,
}

impl RoomTypeKey {
    pub fn new(property_id: i64, room_type_id: i64) -> Self {
        Self {
            property_id,
            room_type_id,
        }
    }
}

impl std::fmt::Display for RoomTypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.property_id, self.room_type_id)
    }
}

/// A bookable category of rooms within a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomType {
    pub id: i64,
    pub property_id: i64,
    pub name: String,
    /// Guests allowed per room
    pub max_occupancy: i32,
    /// Nightly rate before any pricing factor
    pub base_price: Decimal,
    /// Physical rooms of this type
    pub total_rooms: i32,
}

impl RoomType {
    pub fn key(&self) -> RoomTypeKey {
        RoomTypeKey::new(self.property_id, self.id)
    }

    /// Maximum guests that `rooms` rooms of this type can hold.
    pub fn capacity_for(&self, rooms: i32) -> i64 {
        i64::from(self.max_occupancy) * i64::from(rooms)
    }
}
