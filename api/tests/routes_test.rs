//! Handler tests against a server with no backing services.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use axum_test::TestServer;
use http::StatusCode;
use serde_json::{Value, json};

use groundwork_api::{AppState, Settings, router};

fn test_settings() -> Settings {
    Settings {
        aws_region: "us-east-1".to_string(),
        s3_bucket_name: None,
        db_host: None,
        db_port: 5432,
        db_name: None,
        db_user: "dbadmin".to_string(),
        db_password: None,
        app_name: "Groundwork API".to_string(),
        app_version: "0.1.0".to_string(),
        image_tag: Some("test".to_string()),
    }
}

fn server() -> TestServer {
    TestServer::new(router(AppState::disconnected(test_settings()))).unwrap()
}

#[tokio::test]
async fn health_reports_deployment_context() {
    let server = server();
    let response = server.get("/health").await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["image_tag"], json!("test"));
    assert_eq!(body["s3_bucket"], json!("not configured"));
}

#[tokio::test]
async fn object_store_endpoints_answer_503_when_unconfigured() {
    let server = server();
    server
        .get("/s3/list")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    server
        .delete("/s3/delete/some/key.txt")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn db_status_reports_disconnected_with_200() {
    let server = server();
    let response = server.get("/db/status").await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], json!("disconnected"));
}

#[tokio::test]
async fn db_reads_answer_503_when_unconfigured() {
    let server = server();
    server
        .get("/db/read")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    server
        .get("/db/read/7")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn create_rejects_an_empty_name_before_touching_the_pool() {
    let server = server();
    let response = server
        .post("/db/create")
        .json(&json!({ "name": "  " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], json!("name must not be empty"));
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let server = server();
    let response = server.get("/health").await;
    assert!(response.headers().contains_key("X-Request-ID"));
}
