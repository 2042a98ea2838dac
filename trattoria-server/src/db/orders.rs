use shared::models::{Order, OrderLine, OrderStatus};
use sqlx::PgPool;

const ORDER_COLUMNS: &str = "id, customer_name, email, phone, pickup_at, notes, total_cents, \
     status, stripe_session_id, created_at, paid_at";

/// Insert an order and its lines atomically
pub async fn create(pool: &PgPool, order: &Order, lines: &[OrderLine]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO orders
            (id, customer_name, email, phone, pickup_at, notes, total_cents, status, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(order.id)
    .bind(&order.customer_name)
    .bind(&order.email)
    .bind(&order.phone)
    .bind(order.pickup_at)
    .bind(&order.notes)
    .bind(order.total_cents)
    .bind(order.status.as_db())
    .bind(order.created_at)
    .execute(&mut *tx)
    .await?;

    for line in lines {
        sqlx::query(
            "INSERT INTO order_lines
                (id, order_id, menu_item_id, name, unit_price_cents, quantity, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(line.id)
        .bind(line.order_id)
        .bind(line.menu_item_id)
        .bind(&line.name)
        .bind(line.unit_price_cents)
        .bind(line.quantity)
        .bind(&line.notes)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn set_session(pool: &PgPool, id: i64, session_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET stripe_session_id = $2 WHERE id = $1")
        .bind(id)
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn lines(pool: &PgPool, order_id: i64) -> Result<Vec<OrderLine>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, order_id, menu_item_id, name, unit_price_cents, quantity, notes
         FROM order_lines WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}

/// Mark an order `paid` (also from `expired`, a late payment still counts).
/// `None` if it was already paid or does not exist.
pub async fn mark_paid(pool: &PgPool, id: i64, now: i64) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE orders SET status = $2, paid_at = $3
         WHERE id = $1 AND status <> $2
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(OrderStatus::Paid.as_db())
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// `pending_payment → expired`; returns whether a row changed
pub async fn expire(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let r = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 AND status = $3")
        .bind(id)
        .bind(OrderStatus::Expired.as_db())
        .bind(OrderStatus::PendingPayment.as_db())
        .execute(pool)
        .await?;
    Ok(r.rows_affected() > 0)
}
