use shared::models::{GalleryImage, MenuCategory, MenuItem};
use sqlx::PgPool;

const ITEM_COLUMNS: &str = "i.id, i.category_id, i.name, i.description, i.price_cents, \
     i.image_key, i.tags, i.is_available, i.is_featured, i.sort_order";

/// Active categories in display order
pub async fn list_categories(pool: &PgPool) -> Result<Vec<MenuCategory>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, name, description, sort_order FROM menu_categories
         WHERE is_active ORDER BY sort_order, id",
    )
    .fetch_all(pool)
    .await
}

/// Available items of active categories in display order
pub async fn list_available_items(pool: &PgPool) -> Result<Vec<MenuItem>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM menu_items i
         JOIN menu_categories c ON c.id = i.category_id
         WHERE i.is_available AND c.is_active
         ORDER BY i.sort_order, i.id"
    ))
    .fetch_all(pool)
    .await
}

pub async fn list_featured(pool: &PgPool, limit: i64) -> Result<Vec<MenuItem>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM menu_items i
         JOIN menu_categories c ON c.id = i.category_id
         WHERE i.is_available AND i.is_featured AND c.is_active
         ORDER BY i.sort_order, i.id
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Single item of an active category, regardless of item availability
pub async fn find_item(pool: &PgPool, id: i64) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM menu_items i
         JOIN menu_categories c ON c.id = i.category_id
         WHERE i.id = $1 AND c.is_active"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Items by id, used to price an order server-side. Items of hidden
/// categories are left out, so they price as unavailable.
pub async fn find_items(pool: &PgPool, ids: &[i64]) -> Result<Vec<MenuItem>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM menu_items i
         JOIN menu_categories c ON c.id = i.category_id
         WHERE i.id = ANY($1) AND c.is_active"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub async fn list_gallery(pool: &PgPool) -> Result<Vec<GalleryImage>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, image_key, caption, sort_order FROM gallery_images
         ORDER BY sort_order, id",
    )
    .fetch_all(pool)
    .await
}
