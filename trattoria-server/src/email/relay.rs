use async_trait::async_trait;
use serde::Serialize;

use super::{MailError, Mailer, OutgoingEmail};

#[derive(Debug, Serialize)]
struct RelayBody<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
}

/// Posts messages as JSON to a serverless send-email function
pub struct RelayMailer {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    from: String,
}

impl RelayMailer {
    pub fn new(url: impl Into<String>, token: Option<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token,
            from: from.into(),
        }
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let body = RelayBody {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.text,
            html: email.html.as_deref(),
        };

        let mut req = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            tracing::info!(to = %email.to, subject = %email.subject, "Email sent via relay");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}
