//! Object-store endpoints: list, upload, download, delete.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use aws_sdk_s3::primitives::ByteStream;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Query parameters for [`list`].
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Restrict the listing to keys under this prefix.
    pub prefix: Option<String>,
}

/// One listed object.
#[derive(Debug, Serialize)]
pub struct ObjectSummary {
    /// Object key.
    pub key: String,
    /// Object size in bytes.
    pub size: i64,
    /// Last-modified timestamp, RFC 3339.
    pub last_modified: Option<String>,
}

/// Response body for [`list`].
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// Bucket that was listed.
    pub bucket: String,
    /// Number of objects returned.
    pub count: usize,
    /// The objects.
    pub objects: Vec<ObjectSummary>,
}

/// Query parameters for [`upload`].
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Key to store the body under.
    pub key: String,
}

/// Response body for [`upload`] and [`remove`].
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    /// Affected key.
    pub key: String,
    /// What happened to it.
    pub status: &'static str,
}

fn object_store(state: &AppState) -> ApiResult<(aws_sdk_s3::Client, String)> {
    match (&state.s3, &state.settings.s3_bucket_name) {
        (Some(client), Some(bucket)) => Ok((client.clone(), bucket.clone())),
        _ => Err(ApiError::unavailable("object store not configured")),
    }
}

/// `GET /s3/list`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let (client, bucket) = object_store(&state)?;
    let listing = client
        .list_objects_v2()
        .bucket(&bucket)
        .set_prefix(query.prefix)
        .send()
        .await
        .map_err(|error| {
            ApiError::internal("failed to list objects").with_source(error.into())
        })?;

    let objects: Vec<ObjectSummary> = listing
        .contents()
        .iter()
        .map(|object| ObjectSummary {
            key: object.key().unwrap_or_default().to_string(),
            size: object.size().unwrap_or_default(),
            last_modified: object
                .last_modified()
                .and_then(|when| chrono::DateTime::from_timestamp(when.secs(), 0))
                .map(|when| when.to_rfc3339()),
        })
        .collect();

    Ok(Json(ListResponse {
        bucket,
        count: objects.len(),
        objects,
    }))
}

/// `POST /s3/upload?key=...` with the object bytes as the request body.
pub async fn upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<Json<MutationResponse>> {
    let (client, bucket) = object_store(&state)?;
    if query.key.trim().is_empty() {
        return Err(ApiError::bad_request("key must not be empty"));
    }

    client
        .put_object()
        .bucket(&bucket)
        .key(&query.key)
        .body(ByteStream::from(body.to_vec()))
        .send()
        .await
        .map_err(|error| {
            ApiError::internal("failed to upload object").with_source(error.into())
        })?;

    Ok(Json(MutationResponse {
        key: query.key,
        status: "uploaded",
    }))
}

/// `GET /s3/download/*key`
pub async fn download(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Response> {
    let (client, bucket) = object_store(&state)?;
    let object = client
        .get_object()
        .bucket(&bucket)
        .key(&key)
        .send()
        .await
        .map_err(|error| {
            let service_error = error.into_service_error();
            if service_error.is_no_such_key() {
                ApiError::not_found(format!("object `{key}` not found"))
            } else {
                ApiError::internal("failed to download object")
                    .with_source(service_error.into())
            }
        })?;

    let bytes = object
        .body
        .collect()
        .await
        .map_err(|error| {
            ApiError::internal("failed to read object body").with_source(error.into())
        })?
        .into_bytes();

    let filename = key.rsplit('/').next().unwrap_or_default().to_string();
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// `DELETE /s3/delete/*key`
pub async fn remove(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<MutationResponse>> {
    let (client, bucket) = object_store(&state)?;
    client
        .delete_object()
        .bucket(&bucket)
        .key(&key)
        .send()
        .await
        .map_err(|error| {
            ApiError::internal("failed to delete object").with_source(error.into())
        })?;

    Ok(Json(MutationResponse {
        key,
        status: "deleted",
    }))
}
