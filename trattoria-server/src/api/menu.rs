//! Menu and site content
//!
//! GET /api/menu, /api/gallery and /api/home are served through the
//! revalidating content cache.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use shared::models::{EventSummary, HomeContent, MenuItem, group_menu};

use super::ApiResult;
use crate::db;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::util::now_millis;

pub const MENU_KEY: &str = "menu";
pub const GALLERY_KEY: &str = "gallery";
pub const HOME_KEY: &str = "home";

const FEATURED_LIMIT: i64 = 6;
const HOME_EVENTS_LIMIT: i64 = 3;

/// GET /api/menu
pub async fn get_menu(State(state): State<AppState>) -> ApiResult<Value> {
    let pool = state.pool.clone();
    let value = state
        .content
        .get_or_refresh(MENU_KEY, || async move {
            let categories = db::menu::list_categories(&pool).await?;
            let items = db::menu::list_available_items(&pool).await?;
            Ok::<_, ServiceError>(group_menu(categories, items))
        })
        .await?;
    Ok(Json(Value::clone(&value)))
}

/// GET /api/menu/items/{id}
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<MenuItem> {
    match db::menu::find_item(&state.pool, id).await? {
        Some(item) if item.is_available => Ok(Json(item)),
        _ => Err(AppError::new(ErrorCode::MenuItemNotFound)
            .with_detail("id", id)
            .into()),
    }
}

/// GET /api/gallery
pub async fn get_gallery(State(state): State<AppState>) -> ApiResult<Value> {
    let pool = state.pool.clone();
    let value = state
        .content
        .get_or_refresh(GALLERY_KEY, || async move {
            Ok::<_, ServiceError>(db::menu::list_gallery(&pool).await?)
        })
        .await?;
    Ok(Json(Value::clone(&value)))
}

/// GET /api/home
pub async fn get_home(State(state): State<AppState>) -> ApiResult<Value> {
    let pool = state.pool.clone();
    let value = state
        .content
        .get_or_refresh(HOME_KEY, || async move {
            let featured = db::menu::list_featured(&pool, FEATURED_LIMIT).await?;
            let events =
                db::events::list_upcoming(&pool, now_millis(), HOME_EVENTS_LIMIT).await?;
            Ok::<_, ServiceError>(HomeContent {
                featured,
                upcoming_events: events.iter().map(EventSummary::from).collect(),
            })
        })
        .await?;
    Ok(Json(Value::clone(&value)))
}
