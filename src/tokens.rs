// src/tokens.rs
//
// One-time magic tokens and per-email rate limits for passwordless sign-in.
// Only SHA-256 hashes of tokens are stored; the raw token exists solely in
// the emailed link. State lives in SQLite so restarts do not reset it.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::AppError;

/// Fixed rate-limit window for magic link requests.
const RATE_LIMIT_WINDOW_MINUTES: i64 = 15;

/// Tokens older than this are deleted outright during cleanup.
const TOKEN_RETENTION_HOURS: i64 = 24;

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Creates a new magic token for an email address and returns the raw token
/// to embed in the sign-in link.
pub async fn create_magic_token(
    pool: &SqlitePool,
    email: &str,
    ttl_minutes: i64,
) -> Result<String, AppError> {
    let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let token_hash = hash_token(&token);

    let now = Utc::now();
    let expires_at = now + Duration::minutes(ttl_minutes);

    sqlx::query(
        "INSERT INTO magic_tokens (token_hash, email, created_at, expires_at, status)
         VALUES (?, ?, ?, ?, 'pending')",
    )
    .bind(&token_hash)
    .bind(email.to_lowercase())
    .bind(now)
    .bind(expires_at)
    .execute(pool)
    .await?;

    tracing::info!(email, expires_at = %expires_at, "created magic token");
    Ok(token)
}

/// Validates a magic token and consumes it.
///
/// Returns the bound email on success. Reuse, expiry and unknown tokens all
/// yield `None` rather than an error.
pub async fn validate_magic_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<String>, AppError> {
    let token_hash = hash_token(token);

    let row: Option<(String, DateTime<Utc>, String)> = sqlx::query_as(
        "SELECT email, expires_at, status FROM magic_tokens WHERE token_hash = ?",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?;

    let Some((email, expires_at, status)) = row else {
        tracing::warn!("magic token not found");
        return Ok(None);
    };

    if status != "pending" {
        tracing::warn!(status, "magic token already used or expired");
        return Ok(None);
    }

    if expires_at < Utc::now() {
        sqlx::query("UPDATE magic_tokens SET status = 'expired' WHERE token_hash = ?")
            .bind(&token_hash)
            .execute(pool)
            .await?;
        tracing::warn!("magic token expired");
        return Ok(None);
    }

    sqlx::query("UPDATE magic_tokens SET status = 'used', used_at = ? WHERE token_hash = ?")
        .bind(Utc::now())
        .bind(&token_hash)
        .execute(pool)
        .await?;

    tracing::info!(email, "magic token validated");
    Ok(Some(email))
}

/// Checks the fixed-window rate limit for an email address.
///
/// Returns `(is_allowed, current_count)` and increments the counter when
/// allowed.
pub async fn check_rate_limit(
    pool: &SqlitePool,
    email: &str,
    max_requests: i64,
) -> Result<(bool, i64), AppError> {
    let key = format!("magic:{}", email.to_lowercase());
    let now = Utc::now();
    let window_start_cutoff = now - Duration::minutes(RATE_LIMIT_WINDOW_MINUTES);

    let row: Option<(DateTime<Utc>, i64)> =
        sqlx::query_as("SELECT window_start, count FROM rate_limits WHERE key = ?")
            .bind(&key)
            .fetch_optional(pool)
            .await?;

    let Some((window_start, count)) = row else {
        sqlx::query("INSERT INTO rate_limits (key, window_start, count) VALUES (?, ?, 1)")
            .bind(&key)
            .bind(now)
            .execute(pool)
            .await?;
        return Ok((true, 1));
    };

    if window_start < window_start_cutoff {
        // Window expired, reset.
        sqlx::query("UPDATE rate_limits SET window_start = ?, count = 1 WHERE key = ?")
            .bind(now)
            .bind(&key)
            .execute(pool)
            .await?;
        return Ok((true, 1));
    }

    if count >= max_requests {
        tracing::warn!(email, count, "rate limit exceeded");
        return Ok((false, count));
    }

    sqlx::query("UPDATE rate_limits SET count = count + 1 WHERE key = ?")
        .bind(&key)
        .execute(pool)
        .await?;
    Ok((true, count + 1))
}

/// Marks stale pending tokens as expired and deletes tokens past retention.
/// Returns the number of rows touched.
pub async fn cleanup_expired_tokens(pool: &SqlitePool) -> Result<u64, AppError> {
    let now = Utc::now();

    let expired = sqlx::query(
        "UPDATE magic_tokens SET status = 'expired' WHERE status = 'pending' AND expires_at < ?",
    )
    .bind(now)
    .execute(pool)
    .await?
    .rows_affected();

    let cutoff = now - Duration::hours(TOKEN_RETENTION_HOURS);
    let deleted = sqlx::query("DELETE FROM magic_tokens WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?
        .rows_affected();

    if expired > 0 || deleted > 0 {
        tracing::info!(expired, deleted, "magic token cleanup");
    }

    Ok(expired + deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn token_is_single_use() {
        let pool = test_pool().await;

        let token = create_magic_token(&pool, "A@Example.edu", 15).await.unwrap();

        let first = validate_magic_token(&pool, &token).await.unwrap();
        assert_eq!(first.as_deref(), Some("a@example.edu"));

        let second = validate_magic_token(&pool, &token).await.unwrap();
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let pool = test_pool().await;
        let result = validate_magic_token(&pool, "no-such-token").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let pool = test_pool().await;

        let token = create_magic_token(&pool, "a@example.edu", -1).await.unwrap();
        let result = validate_magic_token(&pool, &token).await.unwrap();

        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn rate_limit_blocks_after_max_requests() {
        let pool = test_pool().await;

        for expected in 1..=3 {
            let (allowed, count) = check_rate_limit(&pool, "a@example.edu", 3).await.unwrap();
            assert!(allowed);
            assert_eq!(count, expected);
        }

        let (allowed, count) = check_rate_limit(&pool, "a@example.edu", 3).await.unwrap();
        assert!(!allowed);
        assert_eq!(count, 3);

        // Other addresses are unaffected.
        let (allowed, _) = check_rate_limit(&pool, "b@example.edu", 3).await.unwrap();
        assert!(allowed);
    }

    #[tokio::test]
    async fn cleanup_expires_stale_pending_tokens() {
        let pool = test_pool().await;

        let stale = create_magic_token(&pool, "a@example.edu", -1).await.unwrap();
        let fresh = create_magic_token(&pool, "b@example.edu", 15).await.unwrap();

        let touched = cleanup_expired_tokens(&pool).await.unwrap();
        assert!(touched >= 1);

        assert_eq!(validate_magic_token(&pool, &stale).await.unwrap(), None);
        assert_eq!(
            validate_magic_token(&pool, &fresh).await.unwrap().as_deref(),
            Some("b@example.edu")
        );
    }
}
