//! SeaORM implementation of InventoryLedger
//!
//! Every counter change is a single conditional `UPDATE ... WHERE` so the
//! database itself refuses to oversell, independent of the in-process lock.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, UpdateMany,
};
use tracing::debug;

use crate::domain::{
    AvailabilityKey, AvailabilityRecord, DomainError, DomainResult, InventoryLedger,
    RangeAdjustOutcome, RoomTypeKey,
};
use crate::infrastructure::database::entities::availability;

use super::db_err;

pub struct SeaOrmInventoryLedger {
    db: DatabaseConnection,
}

impl SeaOrmInventoryLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: availability::Model) -> AvailabilityRecord {
    AvailabilityRecord {
        property_id: m.property_id,
        room_type_id: m.room_type_id,
        date: m.date,
        total_rooms: m.total_rooms,
        available_rooms: m.available_rooms,
        booked_rooms: m.booked_rooms,
        version: m.version,
    }
}

fn key_condition(key: &AvailabilityKey) -> Condition {
    Condition::all()
        .add(availability::Column::PropertyId.eq(key.property_id))
        .add(availability::Column::RoomTypeId.eq(key.room_type_id))
        .add(availability::Column::Date.eq(key.date))
}

fn range_condition(scope: RoomTypeKey, start: NaiveDate, end: NaiveDate) -> Condition {
    Condition::all()
        .add(availability::Column::PropertyId.eq(scope.property_id))
        .add(availability::Column::RoomTypeId.eq(scope.room_type_id))
        .add(availability::Column::Date.gte(start))
        .add(availability::Column::Date.lt(end))
}

/// `available -= delta, booked += delta, version += 1`, restricted to rows
/// where both counters stay non-negative.
fn adjust_statement(delta: i32) -> UpdateMany<availability::Entity> {
    availability::Entity::update_many()
        .col_expr(
            availability::Column::AvailableRooms,
            Expr::col(availability::Column::AvailableRooms).sub(delta),
        )
        .col_expr(
            availability::Column::BookedRooms,
            Expr::col(availability::Column::BookedRooms).add(delta),
        )
        .col_expr(
            availability::Column::Version,
            Expr::col(availability::Column::Version).add(1i64),
        )
        .filter(availability::Column::AvailableRooms.gte(delta))
        .filter(availability::Column::BookedRooms.gte(-delta))
}

async fn fetch<C: ConnectionTrait>(
    conn: &C,
    key: &AvailabilityKey,
) -> DomainResult<Option<AvailabilityRecord>> {
    let model = availability::Entity::find_by_id((key.property_id, key.room_type_id, key.date))
        .one(conn)
        .await
        .map_err(db_err)?;
    Ok(model.map(model_to_domain))
}

// ── InventoryLedger impl ────────────────────────────────────────

#[async_trait]
impl InventoryLedger for SeaOrmInventoryLedger {
    async fn get(&self, key: &AvailabilityKey) -> DomainResult<Option<AvailabilityRecord>> {
        fetch(&self.db, key).await
    }

    async fn find_range(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<Vec<AvailabilityRecord>> {
        let models = availability::Entity::find()
            .filter(range_condition(scope, start, end))
            .order_by_asc(availability::Column::Date)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_property_range(
        &self,
        property_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<Vec<AvailabilityRecord>> {
        let models = availability::Entity::find()
            .filter(availability::Column::PropertyId.eq(property_id))
            .filter(availability::Column::Date.gte(start))
            .filter(availability::Column::Date.lt(end))
            .order_by_asc(availability::Column::Date)
            .order_by_asc(availability::Column::RoomTypeId)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn initialize_range(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
        total_rooms: i32,
    ) -> DomainResult<u64> {
        let rows: Vec<availability::ActiveModel> = start
            .iter_days()
            .take_while(|d| *d < end)
            .map(|date| availability::ActiveModel {
                property_id: Set(scope.property_id),
                room_type_id: Set(scope.room_type_id),
                date: Set(date),
                total_rooms: Set(total_rooms),
                available_rooms: Set(total_rooms),
                booked_rooms: Set(0),
                version: Set(0),
            })
            .collect();
        if rows.is_empty() {
            return Ok(0);
        }

        let mut created = 0;
        for chunk in rows.chunks(500) {
            created += availability::Entity::insert_many(chunk.to_vec())
                .on_conflict(
                    OnConflict::columns([
                        availability::Column::PropertyId,
                        availability::Column::RoomTypeId,
                        availability::Column::Date,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await
                .map_err(db_err)?;
        }
        debug!("Initialized {} ledger rows for {}", created, scope);
        Ok(created)
    }

    async fn conditional_adjust(
        &self,
        key: &AvailabilityKey,
        delta: i32,
        expected_min_available: i32,
    ) -> DomainResult<bool> {
        let result = adjust_statement(delta)
            .filter(key_condition(key))
            .filter(availability::Column::AvailableRooms.gte(expected_min_available))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return match fetch(&self.db, key).await? {
                Some(_) => Ok(false),
                None => Err(DomainError::not_found("AvailabilityRecord", "key", key)),
            };
        }
        Ok(true)
    }

    async fn compare_and_adjust_range(
        &self,
        snapshot: &[AvailabilityRecord],
        delta: i32,
    ) -> DomainResult<RangeAdjustOutcome> {
        let txn = self.db.begin().await.map_err(db_err)?;

        for expected in snapshot {
            let key = expected.key();
            let result = adjust_statement(delta)
                .filter(key_condition(&key))
                .filter(availability::Column::Version.eq(expected.version))
                .exec(&txn)
                .await
                .map_err(db_err)?;

            if result.rows_affected == 0 {
                let outcome = match fetch(&txn, &key).await? {
                    Some(current) if current.version == expected.version => {
                        RangeAdjustOutcome::Insufficient
                    }
                    _ => RangeAdjustOutcome::VersionConflict,
                };
                txn.rollback().await.map_err(db_err)?;
                debug!("Range adjustment on {} aborted: {:?}", key, outcome);
                return Ok(outcome);
            }
        }

        txn.commit().await.map_err(db_err)?;
        Ok(RangeAdjustOutcome::Applied)
    }

    async fn resize_range(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
        new_total: i32,
    ) -> DomainResult<u64> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let overbooked = availability::Entity::find()
            .filter(range_condition(scope, start, end))
            .filter(availability::Column::BookedRooms.gt(new_total))
            .order_by_asc(availability::Column::Date)
            .one(&txn)
            .await
            .map_err(db_err)?;
        if let Some(row) = overbooked {
            txn.rollback().await.map_err(db_err)?;
            return Err(DomainError::Validation(format!(
                "{} rooms already booked on {}, cannot shrink to {}",
                row.booked_rooms, row.date, new_total
            )));
        }

        let result = availability::Entity::update_many()
            .col_expr(
                availability::Column::AvailableRooms,
                Expr::val(new_total).sub(Expr::col(availability::Column::BookedRooms)),
            )
            .col_expr(availability::Column::TotalRooms, Expr::value(new_total))
            .col_expr(
                availability::Column::Version,
                Expr::col(availability::Column::Version).add(1i64),
            )
            .filter(range_condition(scope, start, end))
            .filter(availability::Column::TotalRooms.ne(new_total))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn delete_range(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<u64> {
        let result = availability::Entity::delete_many()
            .filter(range_condition(scope, start, end))
            .filter(availability::Column::BookedRooms.eq(0))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}
