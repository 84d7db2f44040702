//! Embedded schema migrations for the tables this crate owns or mirrors.

pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_favorites_table;
mod m20240101_000002_create_profiles_table;
mod m20240101_000003_create_auth_session_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    // Override the name of migration table to avoid conflicts
    fn migration_table_name() -> sea_orm::DynIden {
        Alias::new("moviecorn_migrations").into_iden()
    }

    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_favorites_table::Migration),
            Box::new(m20240101_000002_create_profiles_table::Migration),
            Box::new(m20240101_000003_create_auth_session_table::Migration),
        ]
    }
}
