//! Availability ledger entity
//!
//! One row per property, room type and night.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "availability")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub property_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub room_type_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: Date,

    pub total_rooms: i32,
    pub available_rooms: i32,
    pub booked_rooms: i32,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
