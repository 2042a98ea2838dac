//! Application state

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::Client as S3Client;
use aws_sdk_sesv2::Client as SesClient;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::auth::RateLimiter;
use crate::availability::ReservationPolicy;
use crate::cache::ContentCache;
use crate::config::Config;
use crate::email::{EmailTransport, LogMailer, Mailer, RelayMailer, SesMailer};
use crate::error::BoxError;
use crate::otp::OtpStore;
use crate::storage::{ImageStore, S3ImageStore};
use crate::stripe::StripeClient;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Transactional email transport
    pub mailer: Arc<dyn Mailer>,
    /// Image bucket behind `/images`
    pub images: Arc<dyn ImageStore>,
    /// Stripe REST client
    pub stripe: StripeClient,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Verification codes and verified emails
    pub otp: OtpStore,
    /// Menu / gallery / home content cache
    pub content: ContentCache,
    /// Rate limiter for verification and checkout routes
    pub rate_limiter: RateLimiter,
    /// Table reservation rules
    pub reservation: Arc<ReservationPolicy>,
    /// Public site URL (checkout redirects, email links)
    pub site_url: String,
    /// Allowed CORS origin
    pub cors_origin: String,
}

impl AppState {
    /// Connect to PostgreSQL, run migrations and build the AWS clients
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let s3 = S3Client::new(&aws_config);
        let images: Arc<dyn ImageStore> = Arc::new(S3ImageStore::new(
            s3,
            &config.image_bucket,
            &config.image_prefix,
        ));

        let mailer: Arc<dyn Mailer> = match config.email_transport {
            EmailTransport::Ses => {
                let ses = if let Some(region) = &config.ses_region {
                    let ses_config = aws_config
                        .to_builder()
                        .region(aws_config::Region::new(region.clone()))
                        .build();
                    SesClient::new(&ses_config)
                } else {
                    SesClient::new(&aws_config)
                };
                Arc::new(SesMailer::new(ses, &config.email_from))
            }
            EmailTransport::Relay => {
                let url = config
                    .email_relay_url
                    .clone()
                    .ok_or("EMAIL_RELAY_URL must be set when EMAIL_TRANSPORT=relay")?;
                Arc::new(RelayMailer::new(
                    url,
                    config.email_relay_token.clone(),
                    &config.email_from,
                ))
            }
            EmailTransport::Log => Arc::new(LogMailer),
        };
        tracing::info!(transport = mailer.name(), "Email transport ready");

        Ok(Self::from_parts(config, pool, mailer, images))
    }

    /// Assemble state from already-built collaborators
    pub fn from_parts(
        config: &Config,
        pool: PgPool,
        mailer: Arc<dyn Mailer>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            otp: OtpStore::new(pool.clone()),
            pool,
            mailer,
            images,
            stripe: StripeClient::new(
                &config.stripe_secret_key,
                &config.stripe_api_base,
                &config.currency,
            ),
            stripe_webhook_secret: config.stripe_webhook_secret.clone(),
            content: ContentCache::new(Duration::from_secs(config.content_revalidate_secs)),
            rate_limiter: RateLimiter::new(),
            reservation: Arc::new(config.reservation.clone()),
            site_url: config.site_url.clone(),
            cors_origin: config.cors_origin.clone(),
        }
    }
}
