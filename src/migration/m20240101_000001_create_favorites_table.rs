//! Create the favorites table with one row per (user, movie)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Favorites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Favorites::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Favorites::UserId).text())
                    .col(ColumnDef::new(Favorites::MovieId).big_integer().not_null())
                    .col(ColumnDef::new(Favorites::Title).text())
                    .col(ColumnDef::new(Favorites::PosterPath).text())
                    .col(ColumnDef::new(Favorites::ReleaseDate).text())
                    .col(ColumnDef::new(Favorites::VoteAverage).double())
                    .col(ColumnDef::new(Favorites::Overview).text())
                    .col(
                        ColumnDef::new(Favorites::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_favorites_user_movie_unique")
                    .table(Favorites::Table)
                    .col(Favorites::UserId)
                    .col(Favorites::MovieId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_favorites_created_at")
                    .table(Favorites::Table)
                    .col(Favorites::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Favorites::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Favorites {
    Table,
    Id,
    UserId,
    MovieId,
    Title,
    PosterPath,
    ReleaseDate,
    VoteAverage,
    Overview,
    CreatedAt,
}
