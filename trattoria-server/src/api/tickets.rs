//! Ticket issuance
//!
//! POST /api/tickets/confirm - success-page confirmation of a paid session.
//! The webhook reaches the same [`fulfil`] path, whichever arrives first
//! issues the tickets.

use axum::Json;
use axum::extract::State;
use shared::error::{AppError, ErrorCode};
use shared::models::{EventSummary, TicketConfirmRequest, TicketConfirmResponse};

use super::ApiResult;
use super::menu::HOME_KEY;
use crate::db;
use crate::email::templates;
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::util::now_millis;

const EMAIL_SENT: &str = "sent";
const EMAIL_FAILED: &str = "failed";
const EMAIL_WARNING: &str = "Tickets issued, but the ticket email could not be sent";

/// POST /api/tickets/confirm
pub async fn confirm_tickets(
    State(state): State<AppState>,
    Json(req): Json<TicketConfirmRequest>,
) -> ApiResult<TicketConfirmResponse> {
    let session_id = req.session_id.trim();
    if session_id.is_empty() {
        return Err(AppError::invalid_field("session_id", "session_id is required").into());
    }

    let order = db::tickets::find_order_by_session(&state.pool, session_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::TicketOrderNotFound))?;

    let session = match state.stripe.retrieve_checkout_session(session_id).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(ticket_order_id = order.id, error = %e, "Stripe session lookup failed");
            return Err(AppError::new(ErrorCode::PaymentSetupFailed).into());
        }
    };
    if !session.is_paid() {
        return Err(AppError::new(ErrorCode::PaymentNotCompleted)
            .with_detail("payment_status", session.payment_status.unwrap_or_default())
            .into());
    }

    Ok(Json(fulfil(&state, order.id).await?))
}

/// Issue the tickets of a paid order and email them.
///
/// Safe to call repeatedly: only the call that performs the issuance sends
/// the email, later calls return the stored tickets.
pub(crate) async fn fulfil(state: &AppState, order_id: i64) -> ServiceResult<TicketConfirmResponse> {
    let newly_issued = db::tickets::issue(&state.pool, order_id, now_millis()).await?;

    let mut order = db::tickets::find_order(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::TicketOrderNotFound))?;
    let event = db::events::find(&state.pool, order.event_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::EventNotFound))?;
    let tickets = db::tickets::list_tickets(&state.pool, order_id).await?;

    let mut warning = None;
    if newly_issued {
        tracing::info!(
            ticket_order_id = order.id,
            event_id = event.id,
            quantity = order.quantity,
            "Tickets issued"
        );
        state.content.invalidate(HOME_KEY).await;

        let message = templates::ticket_delivery(
            &order,
            &event,
            &tickets,
            state.reservation.timezone,
            state.stripe.currency(),
        );
        let email_status = match state.mailer.send(&message).await {
            Ok(()) => EMAIL_SENT,
            Err(e) => {
                tracing::error!(ticket_order_id = order.id, error = %e, "Ticket email failed");
                warning = Some(EMAIL_WARNING.to_string());
                EMAIL_FAILED
            }
        };
        db::tickets::set_email_status(&state.pool, order.id, email_status).await?;
        order.email_status = email_status.to_string();
    } else if order.email_status == EMAIL_FAILED {
        warning = Some(EMAIL_WARNING.to_string());
    }

    Ok(TicketConfirmResponse {
        event: EventSummary::from(&event),
        order,
        tickets,
        warning,
    })
}
