//! Table reservations
//!
//! GET  /api/reservations/availability?date=&party_size=
//! POST /api/reservations
//! POST /api/reservations/{id}/cancel

use axum::Json;
use axum::extract::{Path, Query, State};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    AvailabilityQuery, AvailabilityResponse, Reservation, ReservationCancel, ReservationCreate,
    ReservationResponse, ReservationStatus, TimeSlot,
};
use sqlx::PgConnection;

use super::verification::parse_email;
use super::{ApiResult, optional_text, required_text};
use crate::availability::{Booking, Window, compute_slots, parse_date, parse_time};
use crate::db;
use crate::email::templates;
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::util::{now_millis, snowflake_id};

const DEFAULT_PARTY_SIZE: i32 = 2;

/// Blocking events and confirmed bookings overlapping a service window
async fn load_day(
    conn: &mut PgConnection,
    window: Window,
) -> ServiceResult<(Vec<Window>, Vec<Booking>)> {
    let events = db::events::blocking_windows(&mut *conn, window.start, window.end)
        .await?
        .into_iter()
        .map(|(start, end)| Window { start, end })
        .collect();

    let bookings = db::reservations::confirmed_overlapping(&mut *conn, window.start, window.end)
        .await?
        .into_iter()
        .map(|(start, end, party_size)| Booking {
            window: Window { start, end },
            party_size,
        })
        .collect();

    Ok((events, bookings))
}

// ── GET /api/reservations/availability ──

pub async fn availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<AvailabilityResponse> {
    let policy = &state.reservation;
    let date = parse_date(&query.date)?;
    let party_size = query.party_size.unwrap_or(DEFAULT_PARTY_SIZE);
    policy.validate_party_size(party_size)?;

    let now = now_millis();
    policy.validate_date(date, now)?;

    let slots: Vec<TimeSlot> = match policy.service_window(date) {
        Some(window) if !policy.is_closed_on(date) => {
            let mut conn = state.pool.acquire().await?;
            let (events, bookings) = load_day(&mut conn, window).await?;
            compute_slots(policy, date, party_size, now, &events, &bookings)
        }
        _ => Vec::new(),
    };

    Ok(Json(AvailabilityResponse {
        date: date.format("%Y-%m-%d").to_string(),
        party_size,
        timezone: policy.timezone.name().to_string(),
        slots,
    }))
}

// ── POST /api/reservations ──

pub async fn create_reservation(
    State(state): State<AppState>,
    Json(req): Json<ReservationCreate>,
) -> ApiResult<ReservationResponse> {
    let policy = &state.reservation;
    let now = now_millis();

    let name = required_text("name", &req.name, 100)?;
    let email = parse_email(&req.email)?;
    let phone = optional_text("phone", req.phone, 40)?;
    let notes = optional_text("notes", req.notes, 500)?;
    let date = parse_date(&req.date)?;
    let time = parse_time(&req.time)?;
    policy.validate_party_size(req.party_size)?;
    policy.validate_date(date, now)?;

    state.otp.require_verified(&email, now).await?;

    let window = match policy.service_window(date) {
        Some(w) if !policy.is_closed_on(date) => w,
        _ => {
            return Err(AppError::new(ErrorCode::RestaurantClosed)
                .with_detail("date", req.date.trim())
                .into());
        }
    };

    // Recompute the slot under a per-day lock so concurrent bookings
    // cannot both take the last covers.
    let mut tx = state.pool.begin().await?;
    db::reservations::lock_day(&mut *tx, window.start).await?;
    let (events, bookings) = load_day(&mut tx, window).await?;
    let slots = compute_slots(policy, date, req.party_size, now, &events, &bookings);

    let requested = time.format("%H:%M").to_string();
    let Some(slot) = slots.into_iter().find(|s| s.time == requested) else {
        return Err(AppError::with_message(
            ErrorCode::SlotUnavailable,
            format!("{requested} is not a bookable time"),
        )
        .with_detail("time", requested)
        .into());
    };
    if let Some(reason) = slot.reason {
        return Err(AppError::new(ErrorCode::SlotUnavailable)
            .with_detail("time", requested)
            .with_detail("reason", serde_json::to_value(reason).unwrap_or_default())
            .into());
    }

    let reservation = Reservation {
        id: snowflake_id(),
        name,
        email,
        phone,
        party_size: req.party_size,
        starts_at: slot.starts_at,
        ends_at: slot.starts_at + policy.seating_ms(),
        notes,
        status: ReservationStatus::Confirmed,
        created_at: now,
    };
    db::reservations::insert(&mut *tx, &reservation).await?;
    tx.commit().await?;

    tracing::info!(
        reservation_id = reservation.id,
        party_size = reservation.party_size,
        starts_at = reservation.starts_at,
        "Reservation confirmed"
    );

    let message = templates::reservation_confirmation(&reservation, policy.timezone, &state.site_url);
    let warning = match state.mailer.send(&message).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(reservation_id = reservation.id, error = %e, "Reservation confirmation email failed");
            Some("Reservation confirmed, but the confirmation email could not be sent".to_string())
        }
    };

    Ok(Json(ReservationResponse {
        reservation,
        warning,
    }))
}

// ── POST /api/reservations/{id}/cancel ──

pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ReservationCancel>,
) -> ApiResult<ReservationResponse> {
    let email = parse_email(&req.email)?;

    // Unknown id and wrong email look the same to the caller
    let not_found = || AppError::new(ErrorCode::ReservationNotFound).with_detail("id", id);

    let existing = db::reservations::find(&state.pool, id)
        .await?
        .filter(|r| r.email == email)
        .ok_or_else(not_found)?;

    if existing.status == ReservationStatus::Cancelled {
        return Ok(Json(ReservationResponse {
            reservation: existing,
            warning: None,
        }));
    }

    if existing.starts_at <= now_millis() {
        return Err(AppError::invalid_request("Reservation has already started").into());
    }

    let Some(cancelled) = db::reservations::cancel(&state.pool, id).await? else {
        // Cancelled concurrently
        let current = db::reservations::find(&state.pool, id)
            .await?
            .ok_or_else(not_found)?;
        return Ok(Json(ReservationResponse {
            reservation: current,
            warning: None,
        }));
    };

    tracing::info!(reservation_id = id, "Reservation cancelled");

    let message = templates::reservation_cancellation(&cancelled, state.reservation.timezone);
    let warning = match state.mailer.send(&message).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(reservation_id = id, error = %e, "Cancellation email failed");
            Some("Reservation cancelled, but the confirmation email could not be sent".to_string())
        }
    };

    Ok(Json(ReservationResponse {
        reservation: cancelled,
        warning,
    }))
}
