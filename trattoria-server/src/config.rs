//! Server configuration

use std::str::FromStr;

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;

use crate::availability::ReservationPolicy;
use crate::email::EmailTransport;
use crate::error::BoxError;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Public site URL, used for checkout redirects and links in emails
    pub site_url: String,
    /// Allowed CORS origin (defaults to the site URL)
    pub cors_origin: String,
    /// Emit JSON logs instead of the pretty formatter
    pub log_json: bool,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Stripe API base URL (overridable for stripe-mock)
    pub stripe_api_base: String,
    /// ISO currency for checkout sessions
    pub currency: String,
    /// Email transport
    pub email_transport: EmailTransport,
    /// Sender address
    pub email_from: String,
    /// Relay function endpoint (EMAIL_TRANSPORT=relay)
    pub email_relay_url: Option<String>,
    /// Bearer token for the relay function
    pub email_relay_token: Option<String>,
    /// SES region override (EMAIL_TRANSPORT=ses)
    pub ses_region: Option<String>,
    /// S3 bucket holding menu, gallery and event images
    pub image_bucket: String,
    /// Key prefix inside the bucket
    pub image_prefix: String,
    /// Table reservation rules
    pub reservation: ReservationPolicy,
    /// Freshness window of cached menu/gallery/home content
    pub content_revalidate_secs: u64,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Development defaults with log-only email; used by tests and local tooling
    pub fn development(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            http_port: 8080,
            environment: "development".into(),
            site_url: "http://localhost:3000".into(),
            cors_origin: "http://localhost:3000".into(),
            log_json: false,
            stripe_secret_key: "sk_test_dev".into(),
            stripe_webhook_secret: "whsec_dev".into(),
            stripe_api_base: "https://api.stripe.com".into(),
            currency: "eur".into(),
            email_transport: EmailTransport::Log,
            email_from: "Trattoria <prenotazioni@trattoria.example>".into(),
            email_relay_url: None,
            email_relay_token: None,
            ses_region: None,
            image_bucket: "trattoria-images".into(),
            image_prefix: String::new(),
            reservation: ReservationPolicy::default(),
            content_revalidate_secs: 60,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let site_url = std::env::var("SITE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let email_transport = match std::env::var("EMAIL_TRANSPORT") {
            Ok(v) => v.parse()?,
            Err(_) if environment == "development" => EmailTransport::Log,
            Err(_) => EmailTransport::Ses,
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: env_parse("HTTP_PORT", 8080)?,
            cors_origin: std::env::var("CORS_ORIGIN").unwrap_or_else(|_| site_url.clone()),
            site_url,
            log_json: std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")),
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            stripe_api_base: std::env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".into()),
            currency: std::env::var("CURRENCY")
                .unwrap_or_else(|_| "eur".into())
                .to_lowercase(),
            email_transport,
            email_from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Trattoria <prenotazioni@trattoria.example>".into()),
            email_relay_url: env_non_empty("EMAIL_RELAY_URL"),
            email_relay_token: env_non_empty("EMAIL_RELAY_TOKEN"),
            ses_region: env_non_empty("SES_REGION"),
            image_bucket: std::env::var("IMAGE_BUCKET")
                .unwrap_or_else(|_| "trattoria-images".into()),
            image_prefix: std::env::var("IMAGE_PREFIX").unwrap_or_default(),
            reservation: reservation_policy_from_env()?,
            content_revalidate_secs: env_parse("CONTENT_REVALIDATE_SECS", 60)?,
            environment,
        })
    }
}

fn reservation_policy_from_env() -> Result<ReservationPolicy, BoxError> {
    let defaults = ReservationPolicy::default();

    let timezone = match env_non_empty("RESTAURANT_TIMEZONE") {
        Some(tz) => Tz::from_str(&tz).map_err(|e| format!("Invalid RESTAURANT_TIMEZONE: {e}"))?,
        None => defaults.timezone,
    };
    let open = env_time("RESERVATION_OPEN")?.unwrap_or(defaults.open);
    let close = env_time("RESERVATION_CLOSE")?.unwrap_or(defaults.close);
    if close <= open {
        return Err("RESERVATION_CLOSE must be later than RESERVATION_OPEN".into());
    }

    let closed_weekdays = match std::env::var("RESERVATION_CLOSED_WEEKDAYS") {
        Ok(v) => parse_weekdays(&v)?,
        Err(_) => defaults.closed_weekdays,
    };

    let slot_minutes: u32 = env_parse("RESERVATION_SLOT_MINUTES", defaults.slot_minutes)?;
    if slot_minutes == 0 {
        return Err("RESERVATION_SLOT_MINUTES must be positive".into());
    }

    Ok(ReservationPolicy {
        timezone,
        open,
        close,
        slot_minutes,
        seating_minutes: env_parse("RESERVATION_SEATING_MINUTES", defaults.seating_minutes)?,
        max_covers: env_parse("RESERVATION_MAX_COVERS", defaults.max_covers)?,
        max_party_size: env_parse("RESERVATION_MAX_PARTY", defaults.max_party_size)?,
        lead_minutes: env_parse("RESERVATION_LEAD_MINUTES", defaults.lead_minutes)?,
        horizon_days: env_parse("RESERVATION_HORIZON_DAYS", defaults.horizon_days)?,
        closed_weekdays,
    })
}

/// Parse a comma-separated weekday list ("mon,tue" or "monday, tuesday").
pub fn parse_weekdays(value: &str) -> Result<Vec<Weekday>, BoxError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Weekday::from_str(s).map_err(|_| -> BoxError { format!("Invalid weekday in list: {s}").into() })
        })
        .collect()
}

/// Numeric setting: unset or blank takes `default`, anything unparsable is an error
fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T, BoxError> {
    parse_setting(name, env_non_empty(name), default)
}

fn parse_setting<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T, BoxError> {
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| -> BoxError { format!("{name} must be a number, got {v}").into() }),
        None => Ok(default),
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_time(name: &str) -> Result<Option<NaiveTime>, BoxError> {
    match env_non_empty(name) {
        Some(v) => NaiveTime::parse_from_str(v.trim(), "%H:%M")
            .map(Some)
            .map_err(|_| format!("{name} must be HH:MM, got {v}").into()),
        None => Ok(None),
    }
}
