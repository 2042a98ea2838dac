//! Email verification (OTP) handlers
//!
//! POST /api/verification/request - send a 6-digit code
//! POST /api/verification/verify  - check the code, mark the email verified
//! GET  /api/verification/status  - is this email currently verified

use axum::Json;
use axum::extract::{Query, State};
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    VerificationRequest, VerificationStatus, VerificationStatusQuery, VerifyCodeRequest,
};
use shared::util::{is_valid_email, normalize_email};

use super::ApiResult;
use crate::email::templates;
use crate::otp::CODE_TTL_MS;
use crate::state::AppState;
use crate::util::now_millis;

/// Normalize and validate an email field
pub fn parse_email(raw: &str) -> Result<String, AppError> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        return Err(AppError::new(ErrorCode::InvalidEmail).with_detail("field", "email"));
    }
    Ok(email)
}

// ── POST /api/verification/request ──

pub async fn request_code(
    State(state): State<AppState>,
    Json(req): Json<VerificationRequest>,
) -> ApiResult<Value> {
    let email = parse_email(&req.email)?;
    let now = now_millis();

    let code = state.otp.issue(&email, now).await?;

    let message = templates::verification_code(&email, &code, CODE_TTL_MS / 60_000);
    if let Err(e) = state.mailer.send(&message).await {
        tracing::error!(email = %email, error = %e, "Failed to send verification email");
        state.otp.revoke(&email).await;
        return Err(AppError::new(ErrorCode::EmailDeliveryFailed).into());
    }

    tracing::info!(email = %email, "Verification code sent");

    Ok(Json(json!({
        "email": email,
        "expires_at": now + CODE_TTL_MS,
        "message": "Verification code sent to your email"
    })))
}

// ── POST /api/verification/verify ──

pub async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> ApiResult<VerificationStatus> {
    let email = parse_email(&req.email)?;
    let code = req.code.trim();
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::invalid_field("code", "Code must be 6 digits").into());
    }

    let verified = state.otp.verify(&email, code, now_millis()).await?;

    Ok(Json(VerificationStatus {
        verified: true,
        expires_at: Some(verified.expires_at),
    }))
}

// ── GET /api/verification/status ──

pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<VerificationStatusQuery>,
) -> ApiResult<VerificationStatus> {
    let email = parse_email(&query.email)?;
    let expires_at = state.otp.verified_until(&email, now_millis()).await?;

    Ok(Json(VerificationStatus {
        verified: expires_at.is_some(),
        expires_at,
    }))
}
