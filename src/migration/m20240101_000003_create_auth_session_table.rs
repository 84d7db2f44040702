use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuthSession::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AuthSession::Key).text().not_null().primary_key())
                    .col(ColumnDef::new(AuthSession::Data).binary().not_null())
                    .col(
                        ColumnDef::new(AuthSession::ExpiryDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Expired-row cleanup filters on this column
        manager
            .create_index(
                Index::create()
                    .name("idx_auth_session_expiry_date")
                    .table(AuthSession::Table)
                    .col(AuthSession::ExpiryDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthSession::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AuthSession {
    Table,
    Key,
    Data,
    ExpiryDate,
}
