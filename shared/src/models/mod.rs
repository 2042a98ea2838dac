//! Data models
//!
//! Shared between the server and the front-end (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` and all timestamps are Unix millis.

pub mod event;
pub mod menu;
pub mod order;
pub mod reservation;
pub mod verification;

// Re-exports
pub use event::*;
pub use menu::*;
pub use order::*;
pub use reservation::*;
pub use verification::*;

/// A status column held a value with no matching variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);
