//! HTTP API routes

pub mod events;
pub mod health;
pub mod images;
pub mod menu;
pub mod orders;
pub mod reservations;
pub mod stripe_webhook;
pub mod tickets;
pub mod verification;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use shared::error::AppError;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::compression::predicate::{DefaultPredicate, NotForContentType, Predicate};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::rate_limit::{
    checkout_rate_limit, verification_request_rate_limit, verification_verify_rate_limit,
};
use crate::error::ServiceError;
use crate::state::AppState;
use crate::util::non_blank;

pub type ApiResult<T> = Result<Json<T>, ServiceError>;

/// JSON bodies are small; webhook payloads are the largest at a few KB
const MAX_BODY_BYTES: usize = 256 * 1024;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let content = Router::new()
        .route("/api/menu", get(menu::get_menu))
        .route("/api/menu/items/{id}", get(menu::get_menu_item))
        .route("/api/gallery", get(menu::get_gallery))
        .route("/api/home", get(menu::get_home));

    let verification = Router::new()
        .route(
            "/api/verification/request",
            post(verification::request_code).layer(middleware::from_fn_with_state(
                state.clone(),
                verification_request_rate_limit,
            )),
        )
        .route(
            "/api/verification/verify",
            post(verification::verify_code).layer(middleware::from_fn_with_state(
                state.clone(),
                verification_verify_rate_limit,
            )),
        )
        .route("/api/verification/status", get(verification::status));

    let reservations = Router::new()
        .route(
            "/api/reservations/availability",
            get(reservations::availability),
        )
        .route("/api/reservations", post(reservations::create_reservation))
        .route(
            "/api/reservations/{id}/cancel",
            post(reservations::cancel_reservation),
        );

    let checkout_limit = middleware::from_fn_with_state(state.clone(), checkout_rate_limit);

    let events = Router::new()
        .route("/api/events", get(events::list_events))
        .route("/api/events/{id}", get(events::get_event))
        .route(
            "/api/events/{id}/checkout",
            post(events::create_checkout).layer(checkout_limit.clone()),
        )
        .route("/api/tickets/confirm", post(tickets::confirm_tickets));

    let orders = Router::new()
        .route(
            "/api/orders",
            post(orders::create_order).layer(checkout_limit),
        )
        .route("/api/orders/{id}", get(orders::get_order));

    // Stripe webhook (signature-verified, raw body)
    let webhook = Router::new().route("/stripe/webhook", post(stripe_webhook::handle_webhook));

    let images = Router::new().route(
        "/images/{*key}",
        get(images::serve_image).head(images::serve_image),
    );

    let cors = cors_layer(&state.cors_origin);

    Router::new()
        .route("/health", get(health::health_check))
        .merge(content)
        .merge(verification)
        .merge(reservations)
        .merge(events)
        .merge(orders)
        .merge(webhook)
        .merge(images)
        .fallback(|| async { AppError::not_found("Route") })
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors)
                .layer(CompressionLayer::new().compress_when(compress_predicate()))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

/// JSON and text only. Images (SVG included) keep their stored bytes so the
/// ETag and Content-Length set by the image proxy stay valid.
fn compress_predicate() -> impl Predicate {
    DefaultPredicate::new().and(NotForContentType::new("image/"))
}

/// Trimmed, non-empty text of at most `max` characters
pub(crate) fn required_text(field: &str, value: &str, max: usize) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::invalid_field(field, format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(AppError::invalid_field(
            field,
            format!("{field} must be at most {max} characters"),
        ));
    }
    Ok(value.to_string())
}

/// Optional text: blank becomes `None`, longer than `max` is rejected
pub(crate) fn optional_text(
    field: &str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, AppError> {
    match non_blank(value) {
        Some(v) if v.chars().count() > max => Err(AppError::invalid_field(
            field,
            format!("{field} must be at most {max} characters"),
        )),
        other => Ok(other),
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(v) => layer.allow_origin(AllowOrigin::exact(v)),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}
