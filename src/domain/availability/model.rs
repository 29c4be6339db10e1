//! Availability record and read-models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::room_type::RoomTypeKey;

/// Primary key of one ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AvailabilityKey {
    pub property_id: i64,
    pub room_type_id: i64,
    pub date: NaiveDate,
}

impl AvailabilityKey {
    pub fn new(scope: RoomTypeKey, date: NaiveDate) -> Self {
        Self {
            property_id: scope.property_id,
            room_type_id: scope.room_type_id,
            date,
        }
    }

    pub fn scope(&self) -> RoomTypeKey {
        RoomTypeKey::new(self.property_id, self.room_type_id)
    }
}

impl std::fmt::Display for AvailabilityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.property_id, self.room_type_id, self.date)
    }
}

/// Room counters for one room type on one night.
///
/// `available_rooms + booked_rooms == total_rooms` holds for every record
/// the ledger hands out; `version` increases by one on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub property_id: i64,
    pub room_type_id: i64,
    pub date: NaiveDate,
    pub total_rooms: i32,
    pub available_rooms: i32,
    pub booked_rooms: i32,
    pub version: i64,
}

impl AvailabilityRecord {
    /// A fresh, fully available night.
    pub fn new(scope: RoomTypeKey, date: NaiveDate, total_rooms: i32) -> Self {
        Self {
            property_id: scope.property_id,
            room_type_id: scope.room_type_id,
            date,
            total_rooms,
            available_rooms: total_rooms,
            booked_rooms: 0,
            version: 0,
        }
    }

    pub fn key(&self) -> AvailabilityKey {
        AvailabilityKey {
            property_id: self.property_id,
            room_type_id: self.room_type_id,
            date: self.date,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.available_rooms >= 0
            && self.booked_rooms >= 0
            && self.available_rooms <= self.total_rooms
            && self.available_rooms + self.booked_rooms == self.total_rooms
    }

    /// Whether moving `delta` rooms from available to booked (negative
    /// `delta` moves them back) keeps both counters in range.
    pub fn can_adjust(&self, delta: i32) -> bool {
        let available = self.available_rooms - delta;
        let booked = self.booked_rooms + delta;
        available >= 0 && booked >= 0 && available <= self.total_rooms
    }

    /// Apply a checked adjustment and bump the version.
    pub fn apply(&mut self, delta: i32) {
        self.available_rooms -= delta;
        self.booked_rooms += delta;
        self.version += 1;
    }

    /// Share of rooms sold, `0.0` for an empty room type.
    pub fn occupancy_rate(&self) -> f64 {
        occupancy_rate(self.available_rooms, self.total_rooms)
    }
}

pub(crate) fn occupancy_rate(available: i32, total: i32) -> f64 {
    if total <= 0 {
        0.0
    } else {
        f64::from(total - available) / f64::from(total)
    }
}

/// Property-wide availability on one date, summed over room types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub available: i32,
    pub total: i32,
    pub occupancy_rate: f64,
}

impl CalendarDay {
    pub fn new(available: i32, total: i32) -> Self {
        Self {
            available,
            total,
            occupancy_rate: occupancy_rate(available, total),
        }
    }
}

/// Early warning for a nearly sold-out night
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverbookingAlert {
    pub property_id: i64,
    pub room_type_id: i64,
    pub date: NaiveDate,
    pub available_rooms: i32,
    pub total_rooms: i32,
    /// `available_rooms / total_rooms`
    pub availability_rate: f64,
}

/// Result of an all-or-nothing multi-date adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeAdjustOutcome {
    /// Every record was updated
    Applied,
    /// A record changed since the snapshot was taken (or disappeared)
    VersionConflict,
    /// A record cannot absorb the delta
    Insufficient,
}
