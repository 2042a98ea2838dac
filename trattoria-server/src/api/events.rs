//! Events and ticket checkout
//!
//! GET  /api/events
//! GET  /api/events/{id}
//! POST /api/events/{id}/checkout - pending ticket order + Stripe Checkout

use axum::Json;
use axum::extract::{Path, State};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Event, EventSummary, TicketCheckoutRequest, TicketCheckoutResponse, TicketOrder,
    TicketOrderStatus,
};

use super::verification::parse_email;
use super::{ApiResult, required_text};
use crate::db;
use crate::email::templates::format_local;
use crate::state::AppState;
use crate::stripe::{CheckoutLine, CheckoutRequest};
use crate::util::{now_millis, snowflake_id};

pub const MAX_TICKETS_PER_ORDER: i32 = 10;
const LIST_LIMIT: i64 = 50;

async fn find_published(state: &AppState, id: i64) -> Result<Event, crate::error::ServiceError> {
    match db::events::find(&state.pool, id).await? {
        Some(event) if event.is_published => Ok(event),
        _ => Err(AppError::new(ErrorCode::EventNotFound)
            .with_detail("id", id)
            .into()),
    }
}

/// GET /api/events
pub async fn list_events(State(state): State<AppState>) -> ApiResult<Vec<EventSummary>> {
    let events = db::events::list_upcoming(&state.pool, now_millis(), LIST_LIMIT).await?;
    Ok(Json(events.iter().map(EventSummary::from).collect()))
}

/// GET /api/events/{id}
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<EventSummary> {
    let event = find_published(&state, id).await?;
    Ok(Json(EventSummary::from(&event)))
}

/// Reject quantities outside 1..=10 and events that cannot sell them
pub fn check_ticket_request(event: &Event, quantity: i32, now: i64) -> Result<(), AppError> {
    if !(1..=MAX_TICKETS_PER_ORDER).contains(&quantity) {
        return Err(AppError::with_message(
            ErrorCode::TicketQuantityInvalid,
            format!("Quantity must be between 1 and {MAX_TICKETS_PER_ORDER}"),
        ));
    }
    if !event.is_on_sale(now) {
        return Err(AppError::new(ErrorCode::EventNotOnSale).with_detail("id", event.id));
    }
    let remaining = event.tickets_remaining();
    if remaining < quantity {
        return Err(AppError::new(ErrorCode::EventSoldOut)
            .with_detail("tickets_remaining", remaining));
    }
    Ok(())
}

/// POST /api/events/{id}/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<TicketCheckoutRequest>,
) -> ApiResult<TicketCheckoutResponse> {
    let name = required_text("name", &req.name, 100)?;
    let email = parse_email(&req.email)?;
    let now = now_millis();

    state.otp.require_verified(&email, now).await?;

    let event = find_published(&state, id).await?;
    check_ticket_request(&event, req.quantity, now)?;

    let order = TicketOrder {
        id: snowflake_id(),
        event_id: event.id,
        name,
        email,
        quantity: req.quantity,
        unit_price_cents: event.price_cents,
        total_cents: event.price_cents * i64::from(req.quantity),
        status: TicketOrderStatus::Pending,
        stripe_session_id: None,
        email_status: "pending".to_string(),
        created_at: now,
        paid_at: None,
    };
    db::tickets::insert_order(&state.pool, &order).await?;

    let checkout = CheckoutRequest {
        customer_email: order.email.clone(),
        lines: vec![CheckoutLine {
            name: event.title.clone(),
            description: Some(format_local(event.starts_at, state.reservation.timezone)),
            unit_amount_cents: order.unit_price_cents,
            quantity: order.quantity,
        }],
        metadata: vec![
            ("kind", "tickets".to_string()),
            ("ticket_order_id", order.id.to_string()),
            ("event_id", event.id.to_string()),
        ],
        success_url: format!(
            "{}/events/{}/tickets?session_id={{CHECKOUT_SESSION_ID}}",
            state.site_url, event.id
        ),
        cancel_url: format!("{}/events/{}", state.site_url, event.id),
        client_reference_id: order.id.to_string(),
    };

    let session = match state.stripe.create_checkout_session(&checkout).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(ticket_order_id = order.id, error = %e, "Stripe checkout creation failed");
            if let Err(e) = db::tickets::expire(&state.pool, order.id).await {
                tracing::warn!(ticket_order_id = order.id, error = %e, "Failed to expire ticket order");
            }
            return Err(AppError::new(ErrorCode::PaymentSetupFailed).into());
        }
    };
    db::tickets::set_session(&state.pool, order.id, &session.id).await?;

    tracing::info!(
        ticket_order_id = order.id,
        event_id = event.id,
        quantity = order.quantity,
        "Ticket checkout created"
    );

    Ok(Json(TicketCheckoutResponse {
        ticket_order_id: order.id,
        checkout_url: session.url.unwrap_or_default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(capacity: i32, sold: i32) -> Event {
        Event {
            id: 3,
            title: "Wine tasting".into(),
            description: None,
            image_key: None,
            starts_at: 10_000,
            ends_at: 20_000,
            price_cents: 3500,
            capacity,
            tickets_sold: sold,
            blocks_reservations: false,
            is_published: true,
        }
    }

    #[test]
    fn test_quantity_bounds() {
        let e = event(40, 0);
        assert!(check_ticket_request(&e, 1, 0).is_ok());
        assert!(check_ticket_request(&e, 10, 0).is_ok());
        for q in [0, -1, 11] {
            assert_eq!(
                check_ticket_request(&e, q, 0).unwrap_err().code,
                ErrorCode::TicketQuantityInvalid
            );
        }
    }

    #[test]
    fn test_sold_out() {
        let err = check_ticket_request(&event(40, 38), 3, 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::EventSoldOut);
        assert_eq!(err.details.unwrap()["tickets_remaining"], 2);
        assert!(check_ticket_request(&event(40, 38), 2, 0).is_ok());
    }

    #[test]
    fn test_not_on_sale_after_start() {
        let err = check_ticket_request(&event(40, 0), 1, 10_000).unwrap_err();
        assert_eq!(err.code, ErrorCode::EventNotOnSale);
    }
}
