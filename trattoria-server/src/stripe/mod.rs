//! Stripe integration via REST API (no SDK dependency)

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::BoxError;

/// Replay window for webhook timestamps
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// One `price_data` line of a payment-mode Checkout Session
#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub name: String,
    pub description: Option<String>,
    pub unit_amount_cents: i64,
    pub quantity: i32,
}

/// Parameters of a payment-mode Checkout Session
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_email: String,
    pub lines: Vec<CheckoutLine>,
    pub metadata: Vec<(&'static str, String)>,
    pub success_url: String,
    pub cancel_url: String,
    /// Also used as the Stripe idempotency key
    pub client_reference_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn metadata_id(&self, key: &str) -> Option<i64> {
        self.metadata.get(key).and_then(|v| v.parse().ok())
    }
}

/// Thin Stripe REST client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
    currency: String,
}

impl StripeClient {
    pub fn new(secret_key: &str, api_base: &str, currency: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            currency: currency.to_lowercase(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Create a Stripe Checkout Session (payment mode)
    pub async fn create_checkout_session(
        &self,
        req: &CheckoutRequest,
    ) -> Result<CheckoutSession, BoxError> {
        let form = checkout_form(req, &self.currency);
        let resp: serde_json::Value = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .header("Idempotency-Key", format!("checkout-{}", req.client_reference_id))
            .form(&form)
            .send()
            .await?
            .json()
            .await?;

        let session: CheckoutSession = serde_json::from_value(resp.clone())
            .map_err(|_| format!("Stripe create_checkout failed: {resp}"))?;
        if session.url.is_none() {
            return Err(format!("Stripe create_checkout returned no url: {resp}").into());
        }
        Ok(session)
    }

    /// Retrieve a Checkout Session by id
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, BoxError> {
        let resp: serde_json::Value = self
            .http
            .get(format!("{}/v1/checkout/sessions/{session_id}", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?
            .json()
            .await?;

        serde_json::from_value(resp.clone())
            .map_err(|_| format!("Stripe retrieve_session failed: {resp}").into())
    }
}

/// Encode a Checkout Session as Stripe's bracketed form fields
pub fn checkout_form(req: &CheckoutRequest, currency: &str) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("customer_email".into(), req.customer_email.clone()),
        ("success_url".into(), req.success_url.clone()),
        ("cancel_url".into(), req.cancel_url.clone()),
        ("client_reference_id".into(), req.client_reference_id.clone()),
    ];

    for (i, line) in req.lines.iter().enumerate() {
        let p = format!("line_items[{i}]");
        form.push((format!("{p}[quantity]"), line.quantity.to_string()));
        form.push((format!("{p}[price_data][currency]"), currency.to_string()));
        form.push((
            format!("{p}[price_data][unit_amount]"),
            line.unit_amount_cents.to_string(),
        ));
        form.push((format!("{p}[price_data][product_data][name]"), line.name.clone()));
        if let Some(desc) = &line.description {
            form.push((
                format!("{p}[price_data][product_data][description]"),
                desc.clone(),
            ));
        }
    }

    for (key, value) in &req.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
        form.push((format!("payment_intent_data[metadata][{key}]"), value.clone()));
    }

    form
}

/// Verify Stripe webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now_secs: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now_secs - ts).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err("Webhook timestamp outside tolerance");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Stripe may send several v1 entries during secret rotation
    for signature in signatures {
        let Ok(sig_bytes) = hex::decode(signature) else {
            continue;
        };
        if mac.clone().verify_slice(&sig_bytes).is_ok() {
            return Ok(());
        }
    }
    Err("Webhook signature mismatch")
}

/// Build a `Stripe-Signature` header value; used by tests and local tooling.
pub fn sign_webhook_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
