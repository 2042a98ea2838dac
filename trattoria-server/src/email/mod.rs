//! Transactional email
//!
//! ```text
//!          ┌──────────────┐
//!          │ Mailer trait │
//!          └──────┬───────┘
//!     ┌─────────┬─┴────────┬───────────┐
//!     ▼         ▼          ▼           ▼
//! SesMailer RelayMailer LogMailer MemoryMailer
//! (SES v2)  (HTTP fn)   (dev)     (tests)
//! ```
//!
//! Message bodies live in [`templates`].

mod log;
mod memory;
mod relay;
mod ses;
pub mod templates;

pub use log::LogMailer;
pub use memory::MemoryMailer;
pub use relay::RelayMailer;
pub use ses::SesMailer;

use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("relay rejected message (status={status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Pluggable delivery backend
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;

    /// Short transport name for logs
    fn name(&self) -> &'static str;
}

/// Which transport `EMAIL_TRANSPORT` selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTransport {
    Ses,
    Relay,
    Log,
}

impl FromStr for EmailTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ses" => Ok(Self::Ses),
            "relay" => Ok(Self::Relay),
            "log" => Ok(Self::Log),
            other => Err(format!(
                "Unknown EMAIL_TRANSPORT: {other} (expected ses, relay or log)"
            )),
        }
    }
}
