//! Unified error codes for the Trattoria backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Email verification errors
//! - 2xxx: Reservation errors
//! - 3xxx: Event and ticket errors
//! - 4xxx: Online order errors
//! - 5xxx: Payment errors
//! - 6xxx: Menu errors
//! - 7xxx: Image errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the front-end can switch
/// on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Too many requests from this client
    TooManyRequests = 9,

    // ==================== 1xxx: Verification ====================
    /// Email address is malformed
    InvalidEmail = 1001,
    /// No pending verification code for this email
    VerificationNotFound = 1002,
    /// Verification code expired
    VerificationCodeExpired = 1003,
    /// Verification code invalid
    VerificationCodeInvalid = 1004,
    /// Too many verification attempts
    TooManyAttempts = 1005,
    /// Email not verified
    EmailNotVerified = 1006,
    /// Email could not be delivered
    EmailDeliveryFailed = 1007,

    // ==================== 2xxx: Reservation ====================
    /// Reservation not found
    ReservationNotFound = 2001,
    /// Requested time slot is not available
    SlotUnavailable = 2002,
    /// Party size outside the accepted range
    PartySizeInvalid = 2003,
    /// Date outside the booking horizon
    ReservationDateOutOfRange = 2004,
    /// Restaurant closed on the requested day
    RestaurantClosed = 2005,

    // ==================== 3xxx: Event ====================
    /// Event not found
    EventNotFound = 3001,
    /// Not enough tickets left
    EventSoldOut = 3002,
    /// Event is not on sale (past, unpublished or free)
    EventNotOnSale = 3003,
    /// Ticket order not found
    TicketOrderNotFound = 3004,
    /// Ticket quantity outside the accepted range
    TicketQuantityInvalid = 3005,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no items
    OrderEmpty = 4002,
    /// Order has too many lines
    OrderTooLarge = 4003,
    /// Line quantity outside the accepted range
    OrderQuantityInvalid = 4004,

    // ==================== 5xxx: Payment ====================
    /// Checkout session could not be created
    PaymentSetupFailed = 5001,
    /// Checkout session has not been paid
    PaymentNotCompleted = 5002,

    // ==================== 6xxx: Menu ====================
    /// Menu item not found
    MenuItemNotFound = 6001,
    /// Menu item exists but cannot be ordered
    MenuItemUnavailable = 6002,

    // ==================== 7xxx: Image ====================
    /// Image not found in storage
    ImageNotFound = 7001,
    /// Image key rejected
    InvalidImageKey = 7002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Object storage error
    StorageError = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::TooManyRequests => "Too many requests, try again later",

            // Verification
            ErrorCode::InvalidEmail => "Invalid email address",
            ErrorCode::VerificationNotFound => "No verification pending for this email",
            ErrorCode::VerificationCodeExpired => "Verification code has expired",
            ErrorCode::VerificationCodeInvalid => "Invalid verification code",
            ErrorCode::TooManyAttempts => "Too many attempts, request a new code",
            ErrorCode::EmailNotVerified => "Email not verified",
            ErrorCode::EmailDeliveryFailed => "Failed to send email",

            // Reservation
            ErrorCode::ReservationNotFound => "Reservation not found",
            ErrorCode::SlotUnavailable => "Time slot is not available",
            ErrorCode::PartySizeInvalid => "Invalid party size",
            ErrorCode::ReservationDateOutOfRange => "Date is outside the booking window",
            ErrorCode::RestaurantClosed => "The restaurant is closed on this day",

            // Event
            ErrorCode::EventNotFound => "Event not found",
            ErrorCode::EventSoldOut => "Not enough tickets left",
            ErrorCode::EventNotOnSale => "Tickets for this event are not on sale",
            ErrorCode::TicketOrderNotFound => "Ticket order not found",
            ErrorCode::TicketQuantityInvalid => "Invalid ticket quantity",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order is empty",
            ErrorCode::OrderTooLarge => "Order has too many items",
            ErrorCode::OrderQuantityInvalid => "Invalid item quantity",

            // Payment
            ErrorCode::PaymentSetupFailed => "Payment setup failed",
            ErrorCode::PaymentNotCompleted => "Payment has not been completed",

            // Menu
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::MenuItemUnavailable => "Menu item is not available",

            // Image
            ErrorCode::ImageNotFound => "Image not found",
            ErrorCode::InvalidImageKey => "Invalid image path",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageError => "Storage error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            9 => Ok(ErrorCode::TooManyRequests),

            // Verification
            1001 => Ok(ErrorCode::InvalidEmail),
            1002 => Ok(ErrorCode::VerificationNotFound),
            1003 => Ok(ErrorCode::VerificationCodeExpired),
            1004 => Ok(ErrorCode::VerificationCodeInvalid),
            1005 => Ok(ErrorCode::TooManyAttempts),
            1006 => Ok(ErrorCode::EmailNotVerified),
            1007 => Ok(ErrorCode::EmailDeliveryFailed),

            // Reservation
            2001 => Ok(ErrorCode::ReservationNotFound),
            2002 => Ok(ErrorCode::SlotUnavailable),
            2003 => Ok(ErrorCode::PartySizeInvalid),
            2004 => Ok(ErrorCode::ReservationDateOutOfRange),
            2005 => Ok(ErrorCode::RestaurantClosed),

            // Event
            3001 => Ok(ErrorCode::EventNotFound),
            3002 => Ok(ErrorCode::EventSoldOut),
            3003 => Ok(ErrorCode::EventNotOnSale),
            3004 => Ok(ErrorCode::TicketOrderNotFound),
            3005 => Ok(ErrorCode::TicketQuantityInvalid),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderEmpty),
            4003 => Ok(ErrorCode::OrderTooLarge),
            4004 => Ok(ErrorCode::OrderQuantityInvalid),

            // Payment
            5001 => Ok(ErrorCode::PaymentSetupFailed),
            5002 => Ok(ErrorCode::PaymentNotCompleted),

            // Menu
            6001 => Ok(ErrorCode::MenuItemNotFound),
            6002 => Ok(ErrorCode::MenuItemUnavailable),

            // Image
            7001 => Ok(ErrorCode::ImageNotFound),
            7002 => Ok(ErrorCode::InvalidImageKey),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9006 => Ok(ErrorCode::StorageError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
