//! # Groundwork API
//!
//! The minimal HTTP API a provisioned instance serves: object-store
//! CRUD over the deployment's bucket and a Postgres-backed `items`
//! table. Configuration arrives through the environment variables the
//! provisioner's bootstrap script injects (`S3_BUCKET_NAME`, `DB_HOST`,
//! `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`, `AWS_REGION`).
//!
//! # Endpoints
//!
//! ```text
//! GET    /health
//! GET    /s3/list?prefix=
//! POST   /s3/upload?key=
//! GET    /s3/download/*key
//! DELETE /s3/delete/*key
//! GET    /db/status
//! POST   /db/create
//! GET    /db/read?limit=&offset=
//! GET    /db/read/:id
//! ```
//!
//! Endpoints whose backing service is not configured answer 503 rather
//! than preventing startup.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod settings;
pub mod state;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};
pub use settings::Settings;
pub use state::AppState;

/// Build the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/s3/list", get(handlers::objects::list))
        .route("/s3/upload", post(handlers::objects::upload))
        .route("/s3/download/*key", get(handlers::objects::download))
        .route("/s3/delete/*key", delete(handlers::objects::remove))
        .route("/db/status", get(handlers::items::status))
        .route("/db/create", post(handlers::items::create))
        .route("/db/read", get(handlers::items::list))
        .route("/db/read/:id", get(handlers::items::get_one))
        .layer(middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
