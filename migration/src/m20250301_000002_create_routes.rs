use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Route::Table)
                    .if_not_exists()
                    .col(uuid(Route::Id).primary_key())
                    .col(string_len(Route::Number, 20).not_null().unique_key())
                    .col(string_len(Route::Name, 120).not_null())
                    .col(string_len(Route::Origin, 120).not_null())
                    .col(string_len(Route::Destination, 120).not_null())
                    .col(string_len(Route::Distance, 50).not_null())
                    .col(string_len(Route::Duration, 50).not_null())
                    .col(string_len(Route::Frequency, 50).not_null())
                    .col(boolean(Route::Active).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(Route::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_route_active")
                    .table(Route::Table)
                    .col(Route::Active)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Route::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Route {
    Table,
    Id,
    Number,
    Name,
    Origin,
    Destination,
    Distance,
    Duration,
    Frequency,
    Active,
    CreatedAt,
}
