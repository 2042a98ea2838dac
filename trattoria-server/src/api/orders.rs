//! Online orders (pickup)
//!
//! POST /api/orders      - price the cart from the menu, open Stripe Checkout
//! GET  /api/orders/{id} - order with lines and status

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    MAX_LINE_QUANTITY, MAX_ORDER_LINES, MenuItem, Order, OrderCheckoutResponse, OrderCreate,
    OrderDetail, OrderItemRequest, OrderLine, OrderStatus,
};

use super::verification::parse_email;
use super::{ApiResult, optional_text, required_text};
use crate::db;
use crate::state::AppState;
use crate::stripe::{CheckoutLine, CheckoutRequest};
use crate::util::{now_millis, snowflake_id, snowflake_ids};

/// Shape checks that need no database
pub fn validate_items(items: &[OrderItemRequest]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }
    if items.len() > MAX_ORDER_LINES {
        return Err(AppError::new(ErrorCode::OrderTooLarge)
            .with_detail("max_lines", MAX_ORDER_LINES));
    }
    for (index, item) in items.iter().enumerate() {
        if !(1..=MAX_LINE_QUANTITY).contains(&item.quantity) {
            return Err(AppError::with_message(
                ErrorCode::OrderQuantityInvalid,
                format!("Quantity must be between 1 and {MAX_LINE_QUANTITY}"),
            )
            .with_detail("line", index)
            .with_detail("menu_item_id", item.menu_item_id));
        }
    }
    Ok(())
}

/// Price each requested line from the menu. Returns the lines and the total.
pub fn price_lines(
    order_id: i64,
    items: &[OrderItemRequest],
    menu: &[MenuItem],
    line_ids: &[i64],
) -> Result<(Vec<OrderLine>, i64), AppError> {
    let by_id: HashMap<i64, &MenuItem> = menu.iter().map(|m| (m.id, m)).collect();

    let mut lines = Vec::with_capacity(items.len());
    let mut total: i64 = 0;
    for (item, &line_id) in items.iter().zip(line_ids) {
        let menu_item = by_id
            .get(&item.menu_item_id)
            .filter(|m| m.is_available)
            .ok_or_else(|| {
                AppError::new(ErrorCode::MenuItemUnavailable)
                    .with_detail("menu_item_id", item.menu_item_id)
            })?;

        let line = OrderLine {
            id: line_id,
            order_id,
            menu_item_id: menu_item.id,
            name: menu_item.name.clone(),
            unit_price_cents: menu_item.price_cents,
            quantity: item.quantity,
            notes: item.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()).map(String::from),
        };
        total += line.line_total_cents();
        lines.push(line);
    }
    Ok((lines, total))
}

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<OrderCreate>,
) -> ApiResult<OrderCheckoutResponse> {
    let customer_name = required_text("customer_name", &req.customer_name, 100)?;
    let email = parse_email(&req.email)?;
    let phone = optional_text("phone", req.phone, 40)?;
    let notes = optional_text("notes", req.notes, 500)?;
    validate_items(&req.items)?;
    for item in &req.items {
        if item.notes.as_ref().is_some_and(|n| n.chars().count() > 200) {
            return Err(AppError::invalid_field("notes", "Line notes must be at most 200 characters").into());
        }
    }

    let now = now_millis();
    if req.pickup_at.is_some_and(|t| t <= now) {
        return Err(AppError::invalid_field("pickup_at", "Pickup time must be in the future").into());
    }

    let mut ids: Vec<i64> = req.items.iter().map(|i| i.menu_item_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let menu = db::menu::find_items(&state.pool, &ids).await?;

    let order_id = snowflake_id();
    let line_ids = snowflake_ids(req.items.len());
    let (lines, total_cents) = price_lines(order_id, &req.items, &menu, &line_ids)?;

    let order = Order {
        id: order_id,
        customer_name,
        email,
        phone,
        pickup_at: req.pickup_at,
        notes,
        total_cents,
        status: OrderStatus::PendingPayment,
        stripe_session_id: None,
        created_at: now,
        paid_at: None,
    };
    db::orders::create(&state.pool, &order, &lines).await?;

    let checkout = CheckoutRequest {
        customer_email: order.email.clone(),
        lines: lines
            .iter()
            .map(|l| CheckoutLine {
                name: l.name.clone(),
                description: l.notes.clone(),
                unit_amount_cents: l.unit_price_cents,
                quantity: l.quantity,
            })
            .collect(),
        metadata: vec![("kind", "order".to_string()), ("order_id", order.id.to_string())],
        success_url: format!(
            "{}/order/{}?session_id={{CHECKOUT_SESSION_ID}}",
            state.site_url, order.id
        ),
        cancel_url: format!("{}/order", state.site_url),
        client_reference_id: order.id.to_string(),
    };

    let session = match state.stripe.create_checkout_session(&checkout).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(order_id = order.id, error = %e, "Stripe checkout creation failed");
            if let Err(e) = db::orders::expire(&state.pool, order.id).await {
                tracing::warn!(order_id = order.id, error = %e, "Failed to expire order");
            }
            return Err(AppError::new(ErrorCode::PaymentSetupFailed).into());
        }
    };
    db::orders::set_session(&state.pool, order.id, &session.id).await?;

    tracing::info!(
        order_id = order.id,
        lines = lines.len(),
        total_cents,
        "Order checkout created"
    );

    Ok(Json(OrderCheckoutResponse {
        order_id: order.id,
        checkout_url: session.url.unwrap_or_default(),
        total_cents,
    }))
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<OrderDetail> {
    let order = db::orders::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound).with_detail("id", id))?;
    let lines = db::orders::lines(&state.pool, id).await?;
    Ok(Json(OrderDetail { order, lines }))
}
