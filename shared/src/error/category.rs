//! Error category classification

use super::codes::ErrorCode;

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Email verification errors
/// - 2xxx: Reservation errors
/// - 3xxx: Event and ticket errors
/// - 4xxx: Online order errors
/// - 5xxx: Payment errors
/// - 6xxx: Menu errors
/// - 7xxx: Image errors
/// - 8xxx and above: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Email verification errors (1xxx)
    Verification,
    /// Reservation errors (2xxx)
    Reservation,
    /// Event and ticket errors (3xxx)
    Event,
    /// Online order errors (4xxx)
    Order,
    /// Payment errors (5xxx)
    Payment,
    /// Menu errors (6xxx)
    Menu,
    /// Image errors (7xxx)
    Image,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Verification,
            2000..3000 => Self::Reservation,
            3000..4000 => Self::Event,
            4000..5000 => Self::Order,
            5000..6000 => Self::Payment,
            6000..7000 => Self::Menu,
            7000..8000 => Self::Image,
            _ => Self::System,
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
