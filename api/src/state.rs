//! Shared application state.

use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_config::Region;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::settings::Settings;

/// State shared across all HTTP handlers.
///
/// Both backing services are optional: an instance can come up before the
/// bucket or database are reachable, and the corresponding endpoints
/// answer 503 instead of refusing to start.
#[derive(Clone)]
pub struct AppState {
    /// Runtime settings.
    pub settings: Arc<Settings>,
    /// Object-store client; `None` when no bucket is configured.
    pub s3: Option<aws_sdk_s3::Client>,
    /// Lazily-connected database pool; `None` when not configured.
    pub db: Option<PgPool>,
}

impl AppState {
    /// Build state from settings, constructing clients for whichever
    /// backing services are configured.
    pub async fn new(settings: Settings) -> Self {
        let s3 = if settings.s3_bucket_name.is_some() {
            let config = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(settings.aws_region.clone()))
                .load()
                .await;
            Some(aws_sdk_s3::Client::new(&config))
        } else {
            warn!("S3_BUCKET_NAME not set; object-store endpoints disabled");
            None
        };

        let db = match settings.database_url() {
            Some(url) => match PgPoolOptions::new().max_connections(5).connect_lazy(&url) {
                Ok(pool) => {
                    info!("database pool configured");
                    Some(pool)
                }
                Err(error) => {
                    warn!(%error, "invalid database configuration; endpoints disabled");
                    None
                }
            },
            None => {
                warn!("database not fully configured; endpoints disabled");
                None
            }
        };

        Self {
            settings: Arc::new(settings),
            s3,
            db,
        }
    }

    /// State with no backing services, for handler tests.
    #[must_use]
    pub fn disconnected(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            s3: None,
            db: None,
        }
    }
}
