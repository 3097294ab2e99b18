//! Bearer-token authentication against the `api_tokens` table, with a
//! short-lived in-memory cache so hot callers skip the lookup.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use dashmap::DashMap;

use crate::config::TOKEN_CACHE_TTL_SECS;
use crate::error::AppError;

use super::ApiState;

#[derive(Clone)]
struct CacheEntry {
    owner_id: String,
    cached_until: i64,
    token_expires_at: i64,
}

#[derive(Clone, Default)]
pub struct TokenCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl TokenCache {
    fn get(&self, token: &str, now: i64) -> Option<String> {
        let entry = self.entries.get(token)?;
        if entry.cached_until < now || entry.token_expires_at < now {
            drop(entry);
            self.entries.remove(token);
            return None;
        }
        Some(entry.owner_id.clone())
    }

    fn insert(&self, token: &str, owner_id: &str, token_expires_at: i64, now: i64) {
        self.entries.insert(
            token.to_string(),
            CacheEntry {
                owner_id: owner_id.to_string(),
                cached_until: now + TOKEN_CACHE_TTL_SECS,
                token_expires_at,
            },
        );
    }
}

/// Resolved caller identity. Extraction fails with 401 on a missing,
/// malformed, unknown, or expired token.
pub struct AuthedOwner(pub String);

fn unauthorized() -> AppError {
    AppError::Unauthorized("missing or invalid bearer token".to_string())
}

#[async_trait]
impl FromRequestParts<ApiState> for AuthedOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(unauthorized)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(unauthorized)?
            .trim();
        if token.is_empty() {
            return Err(unauthorized());
        }

        let now = Utc::now().timestamp();
        if let Some(owner_id) = state.token_cache.get(token, now) {
            return Ok(AuthedOwner(owner_id));
        }

        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT owner_id, expires_at FROM api_tokens WHERE token = ?")
                .bind(token)
                .fetch_optional(&state.pool)
                .await?;
        let (owner_id, expires_at) = row.ok_or_else(unauthorized)?;
        if expires_at < now {
            return Err(unauthorized());
        }

        state.token_cache.insert(token, &owner_id, expires_at, now);
        Ok(AuthedOwner(owner_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_returns_fresh_entries_only() {
        let cache = TokenCache::default();
        cache.insert("tok", "u1", 2_000_000_000, 1_000_000);
        assert_eq!(cache.get("tok", 1_000_000), Some("u1".to_string()));
        // Cache TTL elapsed.
        assert_eq!(cache.get("tok", 1_000_000 + TOKEN_CACHE_TTL_SECS + 1), None);
    }

    #[test]
    fn cache_drops_expired_tokens() {
        let cache = TokenCache::default();
        cache.insert("tok", "u1", 500, 400);
        assert_eq!(cache.get("tok", 400), Some("u1".to_string()));
        assert_eq!(cache.get("tok", 501), None);
        // Removed on the failed read.
        assert!(cache.entries.get("tok").is_none());
    }
}
