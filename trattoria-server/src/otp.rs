//! One-time email verification codes
//!
//! Codes live in `verification_codes` keyed by email. When the database
//! write fails the code is kept in an in-process map instead, and
//! verification looks in the database first, then in that map. Verified
//! emails follow the same two-tier lookup.

use std::sync::Arc;

use dashmap::DashMap;
use shared::error::{AppError, ErrorCode};
use shared::models::{VerificationCode, VerifiedEmail};
use sqlx::PgPool;

use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::util::{generate_code, hash_code, verify_code};

/// Code lifetime: 10 minutes
pub const CODE_TTL_MS: i64 = 10 * 60 * 1000;
/// Failed attempts allowed before a code is locked
pub const MAX_ATTEMPTS: i32 = 5;
/// How long a verified email may place reservations and buy tickets: 30 days
pub const VERIFIED_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Db,
    Memory,
}

#[derive(Clone)]
pub struct OtpStore {
    pool: PgPool,
    pending: Arc<DashMap<String, VerificationCode>>,
    verified: Arc<DashMap<String, VerifiedEmail>>,
}

impl OtpStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            pending: Arc::new(DashMap::new()),
            verified: Arc::new(DashMap::new()),
        }
    }

    /// Generate and store a code for `email`; returns the plaintext to send.
    ///
    /// Any previous code for the email is replaced and its attempts reset.
    pub async fn issue(&self, email: &str, now: i64) -> ServiceResult<String> {
        let code = generate_code();
        let code_hash = hash_code(&code).map_err(|e| ServiceError::Db(e.to_string().into()))?;
        let expires_at = now + CODE_TTL_MS;

        match db::verification::upsert_code(&self.pool, email, &code_hash, expires_at, now).await {
            Ok(()) => {
                self.pending.remove(email);
            }
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Storing verification code in memory fallback");
                // An older code left in the table must not shadow this one
                if let Err(e) = db::verification::delete_code(&self.pool, email).await {
                    tracing::debug!(email = %email, error = %e, "Could not drop previous code");
                }
                self.pending.insert(
                    email.to_string(),
                    VerificationCode {
                        email: email.to_string(),
                        code_hash,
                        attempts: 0,
                        expires_at,
                        created_at: now,
                    },
                );
            }
        }

        Ok(code)
    }

    /// Discard a pending code, e.g. when its email could not be delivered
    pub async fn revoke(&self, email: &str) {
        self.pending.remove(email);
        if let Err(e) = db::verification::delete_code(&self.pool, email).await {
            tracing::warn!(email = %email, error = %e, "Failed to delete verification code");
        }
    }

    /// Check `code` for `email`. On success the code is consumed and the
    /// email is marked verified for [`VERIFIED_TTL_MS`].
    ///
    /// Every check first takes an attempt atomically, so concurrent guesses
    /// cannot exceed [`MAX_ATTEMPTS`] and only one caller can consume a code.
    pub async fn verify(&self, email: &str, code: &str, now: i64) -> ServiceResult<VerifiedEmail> {
        let Some((pending, source)) = self.lookup(email).await else {
            return Err(AppError::new(ErrorCode::VerificationNotFound).into());
        };

        if now >= pending.expires_at {
            self.delete(email, source).await;
            return Err(AppError::new(ErrorCode::VerificationCodeExpired).into());
        }

        if pending.attempts >= MAX_ATTEMPTS {
            return Err(AppError::new(ErrorCode::TooManyAttempts).into());
        }

        let Some(attempts) = self
            .claim_attempt(email, &pending.code_hash, source, now)
            .await?
        else {
            return Err(self.rejection_after_lost_claim(email, &pending.code_hash).await);
        };

        if !verify_code(code.trim(), &pending.code_hash) {
            let remaining = (MAX_ATTEMPTS - attempts).max(0);
            return Err(AppError::new(ErrorCode::VerificationCodeInvalid)
                .with_detail("attempts_remaining", remaining)
                .into());
        }

        if !self.consume(email, &pending.code_hash, source).await? {
            return Err(AppError::new(ErrorCode::VerificationNotFound).into());
        }

        let record = VerifiedEmail {
            email: email.to_string(),
            verified_at: now,
            expires_at: now + VERIFIED_TTL_MS,
        };
        match db::verification::upsert_verified(&self.pool, email, now, record.expires_at).await {
            Ok(()) => {
                self.verified.remove(email);
            }
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Storing verified email in memory fallback");
                self.verified.insert(email.to_string(), record.clone());
            }
        }

        tracing::info!(email = %email, "Email verified");
        Ok(record)
    }

    /// Expiry of the email's verification, if currently verified
    pub async fn verified_until(&self, email: &str, now: i64) -> ServiceResult<Option<i64>> {
        let from_memory = self
            .verified
            .get(email)
            .filter(|v| v.expires_at > now)
            .map(|v| v.expires_at);

        match db::verification::find_verified(&self.pool, email, now).await {
            Ok(Some(v)) => Ok(Some(v.expires_at.max(from_memory.unwrap_or(0)))),
            Ok(None) => Ok(from_memory),
            Err(e) if from_memory.is_some() => {
                tracing::warn!(email = %email, error = %e, "Verified lookup failed, using memory fallback");
                Ok(from_memory)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reject unless `email` is currently verified
    pub async fn require_verified(&self, email: &str, now: i64) -> ServiceResult<()> {
        match self.verified_until(email, now).await? {
            Some(_) => Ok(()),
            None => Err(AppError::new(ErrorCode::EmailNotVerified)
                .with_detail("email", email)
                .into()),
        }
    }

    /// Delete expired codes and verified records from both tiers
    pub async fn sweep(&self, now: i64) {
        self.pending.retain(|_, c| c.expires_at > now);
        self.verified.retain(|_, v| v.expires_at > now);

        match db::verification::delete_expired_codes(&self.pool, now).await {
            Ok(n) if n > 0 => tracing::info!(count = n, "Swept expired verification codes"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Verification code sweep failed"),
        }
        match db::verification::delete_expired_verified(&self.pool, now).await {
            Ok(n) if n > 0 => tracing::info!(count = n, "Swept expired verified emails"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Verified email sweep failed"),
        }
    }

    async fn lookup(&self, email: &str) -> Option<(VerificationCode, Source)> {
        let stored = match db::verification::find_code(&self.pool, email).await {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Code lookup failed, trying memory fallback");
                None
            }
        };
        let fallback = self.pending.get(email).map(|c| c.clone());
        newest(stored, fallback)
    }

    async fn delete(&self, email: &str, source: Source) {
        match source {
            Source::Db => {
                if let Err(e) = db::verification::delete_code(&self.pool, email).await {
                    tracing::warn!(email = %email, error = %e, "Failed to delete expired code");
                }
            }
            Source::Memory => {
                self.pending.remove(email);
            }
        }
    }

    /// Count one attempt against the code; `None` if it can take no more
    async fn claim_attempt(
        &self,
        email: &str,
        code_hash: &str,
        source: Source,
        now: i64,
    ) -> ServiceResult<Option<i32>> {
        match source {
            Source::Db => Ok(db::verification::claim_attempt(
                &self.pool,
                email,
                code_hash,
                MAX_ATTEMPTS,
                now,
            )
            .await?),
            Source::Memory => {
                let Some(mut entry) = self.pending.get_mut(email) else {
                    return Ok(None);
                };
                if entry.code_hash != code_hash
                    || entry.attempts >= MAX_ATTEMPTS
                    || entry.expires_at <= now
                {
                    return Ok(None);
                }
                entry.attempts += 1;
                Ok(Some(entry.attempts))
            }
        }
    }

    /// Remove the verified code from its tier and any stale copy in the other
    async fn consume(&self, email: &str, code_hash: &str, source: Source) -> ServiceResult<bool> {
        match source {
            Source::Db => {
                let consumed = db::verification::consume_code(&self.pool, email, code_hash).await?;
                if consumed {
                    self.pending.remove(email);
                }
                Ok(consumed)
            }
            Source::Memory => {
                let consumed = self
                    .pending
                    .remove_if(email, |_, c| c.code_hash == code_hash)
                    .is_some();
                if consumed {
                    if let Err(e) = db::verification::delete_code(&self.pool, email).await {
                        tracing::debug!(email = %email, error = %e, "No stored code to clear");
                    }
                }
                Ok(consumed)
            }
        }
    }

    /// Why a claim failed: the code was consumed or replaced, or it is locked
    async fn rejection_after_lost_claim(&self, email: &str, code_hash: &str) -> ServiceError {
        match self.lookup(email).await {
            Some((current, _)) if current.code_hash == code_hash => {
                AppError::new(ErrorCode::TooManyAttempts).into()
            }
            _ => AppError::new(ErrorCode::VerificationNotFound).into(),
        }
    }
}

/// Pick the most recently issued code across both tiers; memory wins ties
/// since it only holds codes whose database write failed.
fn newest(
    stored: Option<VerificationCode>,
    fallback: Option<VerificationCode>,
) -> Option<(VerificationCode, Source)> {
    match (stored, fallback) {
        (Some(db), Some(mem)) if db.created_at > mem.created_at => Some((db, Source::Db)),
        (_, Some(mem)) => Some((mem, Source::Memory)),
        (Some(db), None) => Some((db, Source::Db)),
        (None, None) => None,
    }
}
