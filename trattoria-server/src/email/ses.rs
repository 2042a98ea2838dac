use async_trait::async_trait;
use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};

use super::{MailError, Mailer, OutgoingEmail};

/// Amazon SES v2 transport
pub struct SesMailer {
    client: SesClient,
    from: String,
}

impl SesMailer {
    pub fn new(client: SesClient, from: impl Into<String>) -> Self {
        Self {
            client,
            from: from.into(),
        }
    }
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let build = |e: aws_sdk_sesv2::error::BuildError| MailError::Build(e.to_string());

        let subject = Content::builder()
            .data(&email.subject)
            .charset("UTF-8")
            .build()
            .map_err(build)?;

        let mut body = Body::builder().text(
            Content::builder()
                .data(&email.text)
                .charset("UTF-8")
                .build()
                .map_err(build)?,
        );
        if let Some(html) = &email.html {
            body = body.html(
                Content::builder()
                    .data(html)
                    .charset("UTF-8")
                    .build()
                    .map_err(build)?,
            );
        }

        let message = Message::builder()
            .subject(subject)
            .body(body.build())
            .build();

        self.client
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(&email.to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent via SES");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ses"
    }
}
