//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 404 Not Found
            Self::NotFound
            | Self::VerificationNotFound
            | Self::ReservationNotFound
            | Self::EventNotFound
            | Self::TicketOrderNotFound
            | Self::OrderNotFound
            | Self::MenuItemNotFound
            | Self::ImageNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::SlotUnavailable | Self::EventSoldOut => StatusCode::CONFLICT,

            // 410 Gone
            Self::VerificationCodeExpired => StatusCode::GONE,

            // 403 Forbidden
            Self::EmailNotVerified => StatusCode::FORBIDDEN,

            // 402 Payment Required
            Self::PaymentNotCompleted => StatusCode::PAYMENT_REQUIRED,

            // 429 Too Many Requests
            Self::TooManyRequests | Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,

            // 502 Bad Gateway (upstream provider failed)
            Self::PaymentSetupFailed | Self::EmailDeliveryFailed | Self::StorageError => {
                StatusCode::BAD_GATEWAY
            }

            // 500 Internal Server Error
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation/business errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::VerificationNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ErrorCode::EventNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::ImageNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(
            ErrorCode::SlotUnavailable.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::EventSoldOut.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_verification_statuses() {
        assert_eq!(
            ErrorCode::VerificationCodeExpired.http_status(),
            StatusCode::GONE
        );
        assert_eq!(
            ErrorCode::TooManyAttempts.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ErrorCode::VerificationCodeInvalid.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::EmailNotVerified.http_status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_upstream_statuses() {
        assert_eq!(
            ErrorCode::PaymentSetupFailed.http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ErrorCode::EmailDeliveryFailed.http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ErrorCode::PaymentNotCompleted.http_status(),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn test_internal_error_status() {
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::InvalidRequest.http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_bad_request_status() {
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::OrderEmpty.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::InvalidImageKey.http_status(),
            StatusCode::BAD_REQUEST
        );
    }
}
