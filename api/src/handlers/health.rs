//! Health endpoint.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Health report: liveness plus enough deployment context to tell which
/// image answered.
#[derive(Debug, Serialize)]
pub struct Health {
    /// Always `healthy` when the process answers at all.
    pub status: &'static str,
    /// Application name.
    pub app_name: String,
    /// Application version.
    pub version: String,
    /// Host or container name.
    pub hostname: String,
    /// Image tag the container was started from.
    pub image_tag: String,
    /// Region the instance runs in.
    pub aws_region: String,
    /// Configured bucket, if any.
    pub s3_bucket: String,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let settings = &state.settings;
    Json(Health {
        status: "healthy",
        app_name: settings.app_name.clone(),
        version: settings.app_version.clone(),
        hostname: std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string()),
        image_tag: settings
            .image_tag
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        aws_region: settings.aws_region.clone(),
        s3_bucket: settings
            .s3_bucket_name
            .clone()
            .unwrap_or_else(|| "not configured".to_string()),
    })
}
