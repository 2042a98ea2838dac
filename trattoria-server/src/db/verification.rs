use shared::models::{VerificationCode, VerifiedEmail};
use sqlx::PgPool;

/// Store a fresh code, replacing any pending one and resetting attempts
pub async fn upsert_code(
    pool: &PgPool,
    email: &str,
    code_hash: &str,
    expires_at: i64,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO verification_codes (email, code_hash, attempts, expires_at, created_at)
         VALUES ($1, $2, 0, $3, $4)
         ON CONFLICT (email) DO UPDATE SET
            code_hash = $2, attempts = 0, expires_at = $3, created_at = $4",
    )
    .bind(email)
    .bind(code_hash)
    .bind(expires_at)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_code(
    pool: &PgPool,
    email: &str,
) -> Result<Option<VerificationCode>, sqlx::Error> {
    sqlx::query_as(
        "SELECT email, code_hash, attempts, expires_at, created_at
         FROM verification_codes WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Take one attempt on the code identified by `code_hash`.
///
/// Returns the attempt count after the increment, or `None` when the code is
/// gone, replaced, expired or already at `max_attempts`.
pub async fn claim_attempt(
    pool: &PgPool,
    email: &str,
    code_hash: &str,
    max_attempts: i32,
    now: i64,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE verification_codes SET attempts = attempts + 1
         WHERE email = $1 AND code_hash = $2 AND attempts < $3 AND expires_at > $4
         RETURNING attempts",
    )
    .bind(email)
    .bind(code_hash)
    .bind(max_attempts)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Delete the code identified by `code_hash`; `false` if another caller got there first
pub async fn consume_code(pool: &PgPool, email: &str, code_hash: &str) -> Result<bool, sqlx::Error> {
    let r = sqlx::query("DELETE FROM verification_codes WHERE email = $1 AND code_hash = $2")
        .bind(email)
        .bind(code_hash)
        .execute(pool)
        .await?;
    Ok(r.rows_affected() == 1)
}

pub async fn delete_code(pool: &PgPool, email: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM verification_codes WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_expired_codes(pool: &PgPool, now: i64) -> Result<u64, sqlx::Error> {
    let r = sqlx::query("DELETE FROM verification_codes WHERE expires_at <= $1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(r.rows_affected())
}

pub async fn upsert_verified(
    pool: &PgPool,
    email: &str,
    now: i64,
    expires_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO verified_emails (email, verified_at, expires_at)
         VALUES ($1, $2, $3)
         ON CONFLICT (email) DO UPDATE SET verified_at = $2, expires_at = $3",
    )
    .bind(email)
    .bind(now)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Verified record that has not expired at `now`
pub async fn find_verified(
    pool: &PgPool,
    email: &str,
    now: i64,
) -> Result<Option<VerifiedEmail>, sqlx::Error> {
    sqlx::query_as(
        "SELECT email, verified_at, expires_at FROM verified_emails
         WHERE email = $1 AND expires_at > $2",
    )
    .bind(email)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn delete_expired_verified(pool: &PgPool, now: i64) -> Result<u64, sqlx::Error> {
    let r = sqlx::query("DELETE FROM verified_emails WHERE expires_at <= $1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(r.rows_affected())
}
