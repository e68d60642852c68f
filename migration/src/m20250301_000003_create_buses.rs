use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // route_id has no foreign key: deleting a route leaves its buses in
        // place and the aggregation skips them.
        manager
            .create_table(
                Table::create()
                    .table(Bus::Table)
                    .if_not_exists()
                    .col(uuid(Bus::Id).primary_key())
                    .col(string_len(Bus::Number, 20).not_null().unique_key())
                    .col(uuid(Bus::RouteId).not_null())
                    .col(uuid_null(Bus::DriverId))
                    .col(integer(Bus::Capacity).not_null().default(40))
                    .col(integer(Bus::CurrentPassengers).not_null().default(0))
                    .col(double(Bus::Lat).not_null())
                    .col(double(Bus::Lng).not_null())
                    .col(double(Bus::Eta).not_null().default(0.0))
                    .col(boolean(Bus::Active).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(Bus::LastUpdated)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bus_driver")
                            .from(Bus::Table, Bus::DriverId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bus_route")
                    .table(Bus::Table)
                    .col(Bus::RouteId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bus::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Bus {
    Table,
    Id,
    Number,
    RouteId,
    DriverId,
    Capacity,
    CurrentPassengers,
    Lat,
    Lng,
    Eta,
    Active,
    LastUpdated,
}
