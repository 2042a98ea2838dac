use shared::models::{Ticket, TicketOrder, TicketOrderStatus};
use sqlx::PgPool;

use crate::error::BoxError;
use crate::util::{generate_ticket_code, snowflake_id};

const ORDER_COLUMNS: &str = "id, event_id, name, email, quantity, unit_price_cents, total_cents, \
     status, stripe_session_id, email_status, created_at, paid_at";

/// Give up after this many id/code collisions in a row
const MAX_CODE_RETRIES: u32 = 5;

pub async fn insert_order(pool: &PgPool, o: &TicketOrder) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO ticket_orders
            (id, event_id, name, email, quantity, unit_price_cents, total_cents,
             status, email_status, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(o.id)
    .bind(o.event_id)
    .bind(&o.name)
    .bind(&o.email)
    .bind(o.quantity)
    .bind(o.unit_price_cents)
    .bind(o.total_cents)
    .bind(o.status.as_db())
    .bind(&o.email_status)
    .bind(o.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_session(pool: &PgPool, id: i64, session_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE ticket_orders SET stripe_session_id = $2 WHERE id = $1")
        .bind(id)
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_order(pool: &PgPool, id: i64) -> Result<Option<TicketOrder>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM ticket_orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_order_by_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<TicketOrder>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM ticket_orders WHERE stripe_session_id = $1"
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_tickets(pool: &PgPool, order_id: i64) -> Result<Vec<Ticket>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, ticket_order_id, code, created_at FROM tickets
         WHERE ticket_order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}

/// Issue the tickets of a paid order.
///
/// Flips the order to `paid`, bumps the event's `tickets_sold` and inserts
/// `quantity` tickets in one transaction. An `expired` order whose session
/// was paid late is still issued. Returns `true` when this call did the
/// issuance, `false` when the order was already paid.
pub async fn issue(pool: &PgPool, order_id: i64, now: i64) -> Result<bool, BoxError> {
    let mut tx = pool.begin().await?;

    let flipped: Option<(i64, i32)> = sqlx::query_as(
        "UPDATE ticket_orders SET status = $2, paid_at = $3
         WHERE id = $1 AND status <> $2
         RETURNING event_id, quantity",
    )
    .bind(order_id)
    .bind(TicketOrderStatus::Paid.as_db())
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((event_id, quantity)) = flipped else {
        tx.commit().await?;
        return Ok(false);
    };

    sqlx::query("UPDATE events SET tickets_sold = tickets_sold + $2 WHERE id = $1")
        .bind(event_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

    for _ in 0..quantity {
        let mut inserted = false;
        for _ in 0..MAX_CODE_RETRIES {
            let r = sqlx::query(
                "INSERT INTO tickets (id, ticket_order_id, code, created_at)
                 VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
            )
            .bind(snowflake_id())
            .bind(order_id)
            .bind(generate_ticket_code())
            .bind(now)
            .execute(&mut *tx)
            .await?;
            if r.rows_affected() == 1 {
                inserted = true;
                break;
            }
        }
        if !inserted {
            return Err(
                format!("Could not allocate a unique ticket code for order {order_id}").into(),
            );
        }
    }

    tx.commit().await?;
    Ok(true)
}

pub async fn set_email_status(pool: &PgPool, id: i64, status: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE ticket_orders SET email_status = $2 WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;
    Ok(())
}

/// `pending → expired`; returns whether a row changed
pub async fn expire(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let r = sqlx::query("UPDATE ticket_orders SET status = $2 WHERE id = $1 AND status = $3")
        .bind(id)
        .bind(TicketOrderStatus::Expired.as_db())
        .bind(TicketOrderStatus::Pending.as_db())
        .execute(pool)
        .await?;
    Ok(r.rows_affected() > 0)
}
