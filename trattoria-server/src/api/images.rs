//! Image proxy
//!
//! GET|HEAD /images/{*key} streams objects from the image bucket with
//! long-lived caching headers and ETag revalidation.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::Response;
use chrono::DateTime;
use sha2::{Digest, Sha256};
use shared::error::{AppError, ErrorCode};

use crate::error::ServiceError;
use crate::state::AppState;
use crate::storage::ImageMeta;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "avif", "svg"];
const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
const MAX_KEY_LEN: usize = 512;

/// Accept relative keys of safe segments ending in an image extension
pub fn validate_key(key: &str) -> Result<(), AppError> {
    let invalid = || AppError::new(ErrorCode::InvalidImageKey).with_detail("key", key);

    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(invalid());
    }
    for segment in key.split('/') {
        let safe = segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if segment.is_empty() || segment == "." || segment == ".." || !safe {
            return Err(invalid());
        }
    }
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(invalid)?;
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(invalid());
    }
    Ok(())
}

/// Quote an ETag if storage returned it bare
fn strong_etag(raw: &str) -> String {
    if raw.starts_with('"') {
        raw.to_string()
    } else {
        format!("\"{raw}\"")
    }
}

fn body_etag(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body)))
}

/// Whether an `If-None-Match` header matches `etag`
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

/// RFC 7231 IMF-fixdate
fn http_date(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|t| t.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

fn storage_error(key: &str, e: impl std::fmt::Display) -> ServiceError {
    tracing::error!(key, error = %e, "Image storage read failed");
    AppError::new(ErrorCode::StorageError).into()
}

fn not_found(key: &str) -> ServiceError {
    AppError::new(ErrorCode::ImageNotFound)
        .with_detail("key", key)
        .into()
}

/// GET|HEAD /images/{*key}
pub async fn serve_image(
    State(state): State<AppState>,
    method: Method,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    validate_key(&key)?;

    // HEAD avoids the body unless storage has no ETag to offer
    let (meta, body) = if method == Method::HEAD {
        match state.images.head(&key).await {
            Ok(Some(meta)) if meta.etag.is_some() => (meta, None),
            Ok(Some(_)) => fetch(&state, &key).await?,
            Ok(None) => return Err(not_found(&key)),
            Err(e) => return Err(storage_error(&key, e)),
        }
    } else {
        fetch(&state, &key).await?
    };

    let etag = match (&meta.etag, &body) {
        (Some(raw), _) => strong_etag(raw),
        (None, Some(bytes)) => body_etag(bytes),
        (None, None) => return Err(AppError::internal("Image has no ETag").into()),
    };
    let content_type = meta.content_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(&key)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    });

    let mut builder = Response::builder()
        .header(header::CACHE_CONTROL, CACHE_CONTROL)
        .header(header::ETAG, &etag)
        .header(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    if let Some(date) = meta.last_modified.and_then(http_date) {
        builder = builder.header(header::LAST_MODIFIED, date);
    }

    let revalidated = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| etag_matches(v, &etag));
    if revalidated {
        return builder
            .status(StatusCode::NOT_MODIFIED)
            .body(Body::empty())
            .map_err(|e| AppError::internal(e.to_string()).into());
    }

    let length = meta
        .content_length
        .or_else(|| body.as_ref().map(|b| b.len() as u64));
    builder = builder
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(len) = length {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    let body = match (method == Method::HEAD, body) {
        (false, Some(bytes)) => Body::from(bytes),
        _ => Body::empty(),
    };
    builder
        .body(body)
        .map_err(|e| AppError::internal(e.to_string()).into())
}

async fn fetch(
    state: &AppState,
    key: &str,
) -> Result<(ImageMeta, Option<axum::body::Bytes>), ServiceError> {
    match state.images.get(key).await {
        Ok(Some(obj)) => Ok((obj.meta, Some(obj.body))),
        Ok(None) => Err(not_found(key)),
        Err(e) => Err(storage_error(key, e)),
    }
}
