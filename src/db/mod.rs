pub mod models;
pub mod positions;
pub mod quotes;
pub mod risk;

use crate::error::Result;

/// Embedded migrations, applied at startup and by test pools.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn connect(db_path: &str) -> Result<sqlx::SqlitePool> {
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{db_path}?mode=rwc")).await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

/// In-memory pool for tests. A single connection keeps every handle on the
/// same in-memory database.
#[cfg(test)]
pub async fn test_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    MIGRATOR.run(&pool).await.expect("migrations");
    pool
}
