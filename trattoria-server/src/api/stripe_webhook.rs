//! Stripe webhook handler
//!
//! POST /stripe/webhook - Checkout Session events (raw body for signature verification)

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use super::tickets;
use crate::email::templates;
use crate::state::AppState;
use crate::stripe::CheckoutSession;
use crate::util::now_millis;
use crate::{db, stripe};

/// Handle incoming Stripe webhook events
///
/// Must receive raw body (not JSON) for HMAC signature verification.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    // 1. Get Stripe-Signature header
    let Some(sig_header) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Missing Stripe-Signature header");
        return StatusCode::BAD_REQUEST;
    };

    // 2. Verify signature
    let now = now_millis();
    if let Err(e) = stripe::verify_webhook_signature(
        &body,
        sig_header,
        &state.stripe_webhook_secret,
        now / 1000,
    ) {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return StatusCode::BAD_REQUEST;
    }

    // 3. Parse JSON event
    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    let Some(event_id) = event["id"].as_str() else {
        tracing::warn!("Webhook event missing id");
        return StatusCode::BAD_REQUEST;
    };
    tracing::info!(event_id, event_type, "Received Stripe webhook");

    // 4. Idempotency: record first, a duplicate insert means already handled
    match db::webhook_events::record(&state.pool, event_id, event_type, now).await {
        Ok(false) => {
            tracing::info!(event_id, "Duplicate webhook event, skipping");
            return StatusCode::OK;
        }
        Ok(true) => {}
        Err(e) => {
            tracing::error!(%e, "DB error recording webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    }

    // 5. Handle event types
    let status = match event_type {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            match session_of(&event) {
                Some(session) => handle_session_paid(&state, &session).await,
                None => StatusCode::OK,
            }
        }
        "checkout.session.expired" => match session_of(&event) {
            Some(session) => handle_session_expired(&state, &session).await,
            None => StatusCode::OK,
        },
        _ => {
            tracing::debug!(event_type, "Unhandled webhook event type");
            StatusCode::OK
        }
    };

    // Let Stripe's retry run the handler again
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        if let Err(e) = db::webhook_events::forget(&state.pool, event_id).await {
            tracing::error!(%e, event_id, "Failed to release webhook event after error");
        }
    }
    status
}

fn session_of(event: &serde_json::Value) -> Option<CheckoutSession> {
    let obj = event.get("data").and_then(|d| d.get("object"))?;
    match serde_json::from_value(obj.clone()) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(%e, "Webhook event without a checkout session object");
            None
        }
    }
}

/// Which local record a Checkout Session pays for
#[derive(Debug, PartialEq, Eq)]
enum SessionTarget {
    Tickets(i64),
    Order(i64),
}

fn target_of(session: &CheckoutSession) -> Option<SessionTarget> {
    match session.metadata.get("kind").map(String::as_str) {
        Some("tickets") => session
            .metadata_id("ticket_order_id")
            .map(SessionTarget::Tickets),
        Some("order") => session.metadata_id("order_id").map(SessionTarget::Order),
        _ => None,
    }
}

/// checkout.session.completed / async_payment_succeeded
async fn handle_session_paid(state: &AppState, session: &CheckoutSession) -> StatusCode {
    if !session.is_paid() {
        // Delayed payment methods complete later with async_payment_succeeded
        tracing::info!(session_id = %session.id, "Checkout completed, payment pending");
        return StatusCode::OK;
    }

    match target_of(session) {
        Some(SessionTarget::Tickets(order_id)) => match tickets::fulfil(state, order_id).await {
            Ok(_) => StatusCode::OK,
            Err(e) => {
                tracing::error!(ticket_order_id = order_id, error = %e, "Ticket fulfilment failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        Some(SessionTarget::Order(order_id)) => handle_order_paid(state, order_id).await,
        None => {
            tracing::warn!(session_id = %session.id, "Checkout session without known metadata");
            StatusCode::OK
        }
    }
}

async fn handle_order_paid(state: &AppState, order_id: i64) -> StatusCode {
    let order = match db::orders::mark_paid(&state.pool, order_id, now_millis()).await {
        Ok(Some(o)) => o,
        Ok(None) => {
            tracing::info!(order_id, "Order already paid or unknown");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(%e, order_id, "DB error marking order paid");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };
    tracing::info!(order_id, total_cents = order.total_cents, "Order paid");

    let lines = match db::orders::lines(&state.pool, order_id).await {
        Ok(l) => l,
        Err(e) => {
            // Payment is recorded; the email is best effort
            tracing::error!(%e, order_id, "Failed to load order lines for confirmation");
            return StatusCode::OK;
        }
    };

    let message = templates::order_confirmation(
        &order,
        &lines,
        state.reservation.timezone,
        state.stripe.currency(),
    );
    if let Err(e) = state.mailer.send(&message).await {
        tracing::error!(order_id, error = %e, "Order confirmation email failed");
    }
    StatusCode::OK
}

/// checkout.session.expired
async fn handle_session_expired(state: &AppState, session: &CheckoutSession) -> StatusCode {
    let result = match target_of(session) {
        Some(SessionTarget::Tickets(id)) => db::tickets::expire(&state.pool, id).await,
        Some(SessionTarget::Order(id)) => db::orders::expire(&state.pool, id).await,
        None => return StatusCode::OK,
    };
    match result {
        Ok(changed) => {
            tracing::info!(session_id = %session.id, changed, "Checkout session expired");
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(%e, session_id = %session.id, "DB error expiring checkout");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
