use shared::models::Event;
use sqlx::PgPool;

const EVENT_COLUMNS: &str = "id, title, description, image_key, starts_at, ends_at, \
     price_cents, capacity, tickets_sold, blocks_reservations, is_published";

/// Published events that have not ended yet, soonest first
pub async fn list_upcoming(
    pool: &PgPool,
    now: i64,
    limit: i64,
) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE is_published AND ends_at > $1
         ORDER BY starts_at, id
         LIMIT $2"
    ))
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// `(starts_at, ends_at)` of published reservation-blocking events
/// overlapping `[start, end)`
pub async fn blocking_windows<'e, E>(
    executor: E,
    start: i64,
    end: i64,
) -> Result<Vec<(i64, i64)>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as(
        "SELECT starts_at, ends_at FROM events
         WHERE is_published AND blocks_reservations
           AND starts_at < $2 AND ends_at > $1",
    )
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await
}
