//! Create availability table
//!
//! The inventory ledger. Keyed by (property, room type, night) and
//! guarded by CHECK constraints so counters can never drift out of range.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Availability::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Availability::PropertyId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Availability::RoomTypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Availability::Date).date().not_null())
                    .col(
                        ColumnDef::new(Availability::TotalRooms)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Availability::AvailableRooms)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Availability::BookedRooms)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Availability::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(Availability::PropertyId)
                            .col(Availability::RoomTypeId)
                            .col(Availability::Date),
                    )
                    .check(Expr::col(Availability::AvailableRooms).gte(0))
                    .check(Expr::col(Availability::BookedRooms).gte(0))
                    .check(
                        Expr::col(Availability::AvailableRooms)
                            .lte(Expr::col(Availability::TotalRooms)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_availability_property_date")
                    .table(Availability::Table)
                    .col(Availability::PropertyId)
                    .col(Availability::Date)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Availability::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Availability {
    Table,
    PropertyId,
    RoomTypeId,
    Date,
    TotalRooms,
    AvailableRooms,
    BookedRooms,
    Version,
}
