use async_trait::async_trait;

use super::{MailError, Mailer, OutgoingEmail};

/// Development transport: writes the message to the log instead of sending it
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.text,
            "Email (log transport, not delivered)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
