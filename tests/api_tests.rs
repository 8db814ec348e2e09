mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use cover_match::{
    routes::{create_router, AppState},
    services::catalog::InMemoryCatalogSource,
};

use common::{color_pipeline, movie};

fn create_test_server() -> TestServer {
    let catalog = InMemoryCatalogSource::new(vec![
        movie(1, "color:255,0,0"),
        movie(2, "color:0,0,255"),
        movie(3, "color:230,20,20"),
        movie(4, "https://covers.invalid/4.jpg"),
    ]);

    let state = Arc::new(AppState {
        catalog: Arc::new(catalog),
        pipeline: Arc::new(color_pipeline(2)),
        default_top_n: 5,
        catalog_deadline: Some(Duration::from_secs(10)),
    });

    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_recommendations_ranked_with_skipped_items() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({
            "title": "Red Movie",
            "image_reference": "color:250,5,5",
            "top_n": 2
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["query_title"], "Red Movie");
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 2);
    assert_eq!(recommendations[0]["id"], 1);
    assert_eq!(recommendations[1]["id"], 3);
    let distance = |i: usize| recommendations[i]["distance"].as_f64().unwrap();
    assert!(distance(0) <= distance(1));

    let skipped = body["skipped"].as_array().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["id"], 4);
    assert_eq!(skipped[0]["kind"], "unreachable");

    assert_eq!(body["excluded"], json!([]));
    assert_eq!(body["cancelled"], false);
}

#[tokio::test]
async fn test_default_top_n_returns_whole_scored_catalog() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "image_reference": "color:0,0,250" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 3);
    assert_eq!(recommendations[0]["id"], 2);
    assert_eq!(body["query_title"], Value::Null);
}

#[tokio::test]
async fn test_negative_top_n_rejected() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "image_reference": "color:1,1,1", "top_n": -1 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("top_n"));
}

#[tokio::test]
async fn test_blank_reference_rejected() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "image_reference": "  " }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unusable_query_image() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "image_reference": "https://covers.invalid/query.jpg" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_request_id_echoed() {
    let server = create_test_server();
    let request_id = "6f1c2f5e-8d7a-4c1b-9a53-0d2b7e4f9a10";

    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_static(request_id),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("x-request-id"), request_id);
}
