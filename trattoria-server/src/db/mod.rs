//! Database access layer
//!
//! One module per table family. Functions take a pool (or any executor when
//! they must run inside a caller's transaction) and return `sqlx::Error`.

pub mod events;
pub mod menu;
pub mod orders;
pub mod reservations;
pub mod tickets;
pub mod verification;
pub mod webhook_events;
