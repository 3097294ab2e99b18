pub mod auth;
pub mod routes;

pub use routes::router;

use auth::TokenCache;

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub token_cache: TokenCache,
    pub local_utc_offset_hours: i32,
}

impl ApiState {
    pub fn new(pool: sqlx::SqlitePool, local_utc_offset_hours: i32) -> Self {
        Self {
            pool,
            token_cache: TokenCache::default(),
            local_utc_offset_hours,
        }
    }
}
