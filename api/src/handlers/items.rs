//! Relational-table endpoints: status, create, read.
//!
//! Queries are runtime-checked (`query_as`) rather than compile-time
//! macros so the crate builds without a live database.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const SELECT_COLUMNS: &str = "id, name, description, created_at";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS items (
    id SERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

/// A stored item.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Item {
    /// Row id.
    pub id: i32,
    /// Item name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Insertion timestamp.
    pub created_at: DateTime<Utc>,
}

/// Request body for [`create`].
#[derive(Debug, Deserialize)]
pub struct ItemCreate {
    /// Item name; must be non-empty.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Query parameters for [`list`].
#[derive(Debug, Deserialize)]
pub struct Pagination {
    /// Page size; defaults to 100, capped at 500.
    pub limit: Option<i64>,
    /// Rows to skip.
    pub offset: Option<i64>,
}

/// Response body for [`status`].
#[derive(Debug, Serialize)]
pub struct DbStatus {
    /// `connected`, `disconnected`, or `error`.
    pub status: &'static str,
    /// Human-readable detail.
    pub message: String,
}

fn pool(state: &AppState) -> ApiResult<PgPool> {
    state
        .db
        .clone()
        .ok_or_else(|| ApiError::unavailable("database not configured"))
}

/// `GET /db/status` — connectivity probe. Always answers 200; the body
/// says whether the database is reachable.
pub async fn status(State(state): State<AppState>) -> Json<DbStatus> {
    let Some(db) = &state.db else {
        return Json(DbStatus {
            status: "disconnected",
            message: "database not configured".to_string(),
        });
    };
    match sqlx::query("SELECT 1").execute(db).await {
        Ok(_) => Json(DbStatus {
            status: "connected",
            message: "database connection successful".to_string(),
        }),
        Err(error) => Json(DbStatus {
            status: "error",
            message: format!("database connection failed: {error}"),
        }),
    }
}

/// `POST /db/create`
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<ItemCreate>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }
    let db = pool(&state)?;

    sqlx::query(CREATE_TABLE)
        .execute(&db)
        .await
        .map_err(|error| {
            ApiError::internal("failed to initialize table").with_source(error.into())
        })?;

    let item: Item = sqlx::query_as(&format!(
        "INSERT INTO items (name, description) VALUES ($1, $2) RETURNING {SELECT_COLUMNS}"
    ))
    .bind(&body.name)
    .bind(&body.description)
    .fetch_one(&db)
    .await
    .map_err(|error| ApiError::internal("failed to create item").with_source(error.into()))?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /db/read`
pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Item>>> {
    let db = pool(&state)?;
    let limit = page.limit.unwrap_or(100).clamp(1, 500);
    let offset = page.offset.unwrap_or(0).max(0);

    let items: Vec<Item> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM items ORDER BY id LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(&db)
    .await
    .map_err(|error| ApiError::internal("failed to fetch items").with_source(error.into()))?;

    Ok(Json(items))
}

/// `GET /db/read/:id`
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Item>> {
    let db = pool(&state)?;
    let item: Option<Item> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM items WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&db)
    .await
    .map_err(|error| ApiError::internal("failed to fetch item").with_source(error.into()))?;

    item.map(Json)
        .ok_or_else(|| ApiError::not_found(format!("item {id} not found")))
}
