use shared::models::{Reservation, ReservationStatus};
use sqlx::PgPool;

const RESERVATION_COLUMNS: &str =
    "id, name, email, phone, party_size, starts_at, ends_at, notes, status, created_at";

/// Serialize bookings of one service day for the rest of the transaction
pub async fn lock_day<'e, E>(executor: E, day_key: i64) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(day_key)
        .execute(executor)
        .await?;
    Ok(())
}

/// `(starts_at, ends_at, party_size)` of confirmed reservations overlapping `[start, end)`
pub async fn confirmed_overlapping<'e, E>(
    executor: E,
    start: i64,
    end: i64,
) -> Result<Vec<(i64, i64, i32)>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as(
        "SELECT starts_at, ends_at, party_size FROM reservations
         WHERE status = $3 AND starts_at < $2 AND ends_at > $1",
    )
    .bind(start)
    .bind(end)
    .bind(ReservationStatus::Confirmed.as_db())
    .fetch_all(executor)
    .await
}

pub async fn insert<'e, E>(executor: E, r: &Reservation) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO reservations
            (id, name, email, phone, party_size, starts_at, ends_at, notes, status, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(r.id)
    .bind(&r.name)
    .bind(&r.email)
    .bind(&r.phone)
    .bind(r.party_size)
    .bind(r.starts_at)
    .bind(r.ends_at)
    .bind(&r.notes)
    .bind(r.status.as_db())
    .bind(r.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Reservation>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Flip a confirmed reservation to cancelled; `None` if it was not confirmed
pub async fn cancel(pool: &PgPool, id: i64) -> Result<Option<Reservation>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE reservations SET status = $2
         WHERE id = $1 AND status = $3
         RETURNING {RESERVATION_COLUMNS}"
    ))
    .bind(id)
    .bind(ReservationStatus::Cancelled.as_db())
    .bind(ReservationStatus::Confirmed.as_db())
    .fetch_optional(pool)
    .await
}
