#![allow(dead_code)]

use std::time::Duration;

use moviecorn::migration::{Migrator, MigratorTrait};
use moviecorn::SeaOrmStore;
use sea_orm::{ConnectOptions, Database};

/// A migrated in-memory SQLite database. One connection, so every query
/// sees the same database.
pub async fn sqlite_store() -> SeaOrmStore {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false);

    let conn = Database::connect(opt)
        .await
        .expect("in-memory sqlite should open");
    Migrator::up(&conn, None)
        .await
        .expect("migrations should apply to sqlite");
    SeaOrmStore::new(conn)
}
