//! SeaORM implementation of RoomTypeLookup

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::debug;

use crate::domain::{DomainResult, RoomType, RoomTypeLookup};
use crate::infrastructure::database::entities::room_type;

use super::{db_err, from_cents, to_cents};

pub struct SeaOrmRoomTypeRepository {
    db: DatabaseConnection,
}

impl SeaOrmRoomTypeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: room_type::Model) -> RoomType {
    RoomType {
        id: m.id,
        property_id: m.property_id,
        name: m.name,
        max_occupancy: m.max_occupancy,
        base_price: from_cents(m.base_price_cents),
        total_rooms: m.total_rooms,
    }
}

#[async_trait]
impl RoomTypeLookup for SeaOrmRoomTypeRepository {
    async fn get_room_type(&self, id: i64) -> DomainResult<Option<RoomType>> {
        let model = room_type::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn list_for_property(&self, property_id: i64) -> DomainResult<Vec<RoomType>> {
        let models = room_type::Entity::find()
            .filter(room_type::Column::PropertyId.eq(property_id))
            .order_by_asc(room_type::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn upsert(&self, rt: RoomType) -> DomainResult<()> {
        debug!("Upserting room type {} ({})", rt.id, rt.name);

        let model = room_type::ActiveModel {
            id: Set(rt.id),
            property_id: Set(rt.property_id),
            name: Set(rt.name),
            max_occupancy: Set(rt.max_occupancy),
            base_price_cents: Set(to_cents(rt.base_price)?),
            total_rooms: Set(rt.total_rooms),
        };
        room_type::Entity::insert(model)
            .on_conflict(
                OnConflict::column(room_type::Column::Id)
                    .update_columns([
                        room_type::Column::PropertyId,
                        room_type::Column::Name,
                        room_type::Column::MaxOccupancy,
                        room_type::Column::BasePriceCents,
                        room_type::Column::TotalRooms,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::repositories::test_db;
    use rust_decimal::Decimal;

    fn suite(id: i64, price: Decimal) -> RoomType {
        RoomType {
            id,
            property_id: 4,
            name: "Suite".into(),
            max_occupancy: 4,
            base_price: price,
            total_rooms: 6,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let repo = SeaOrmRoomTypeRepository::new(test_db().await);
        repo.upsert(suite(2, Decimal::new(25000, 2))).await.unwrap();
        repo.upsert(suite(1, Decimal::new(19999, 2))).await.unwrap();
        repo.upsert(suite(2, Decimal::new(27550, 2))).await.unwrap();

        let rt = repo.get_room_type(2).await.unwrap().unwrap();
        assert_eq!(rt.base_price, Decimal::new(27550, 2));

        let listed = repo.list_for_property(4).await.unwrap();
        assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(repo.get_room_type(99).await.unwrap().is_none());
    }
}
