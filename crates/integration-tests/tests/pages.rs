//! Page rendering tests: listing, detail, tags, top stores and errors.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use delicious_integration_tests::{TestApp, body_string};

const TORONTO: (f64, f64) = (-79.3832, 43.6532);

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");

    let response = app.get("/health/ready", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_unknown_path_renders_not_found_page() {
    let app = TestApp::new();
    let response = app.get("/no/such/page", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_string(response).await.contains("Not Found"));
}

#[tokio::test]
async fn test_unknown_store_renders_not_found_page() {
    let app = TestApp::new();
    let response = app.get("/store/nowhere", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_string(response).await.contains("nowhere"));
}

#[tokio::test]
async fn test_page_past_the_end_is_clamped() {
    let app = TestApp::new();
    app.register("Ann", "ann@example.com").await;
    let ann = app.user_id("ann@example.com").await;
    for i in 1..=13 {
        app.add_store(ann, &format!("Store {i}"), "", &[], TORONTO)
            .await;
    }

    let response = app.get("/stores/page/99", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Page 3 of 3"));
    assert!(body.contains("You asked for page 99"));
}

#[tokio::test]
async fn test_store_page_shows_details() {
    let app = TestApp::new();
    app.register("Ann", "ann@example.com").await;
    let ann = app.user_id("ann@example.com").await;
    app.add_store(ann, "Bean There", "Pour-overs all day", &["Wifi"], TORONTO)
        .await;

    let response = app.get("/store/bean-there", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Bean There"));
    assert!(body.contains("Pour-overs all day"));
    assert!(body.contains("#Wifi"));
}

#[tokio::test]
async fn test_tags_page_lists_counts_and_filters() {
    let app = TestApp::new();
    app.register("Ann", "ann@example.com").await;
    let ann = app.user_id("ann@example.com").await;
    app.add_store(ann, "Bean There", "", &["Wifi", "Open Late"], TORONTO)
        .await;
    app.add_store(ann, "Byte Cafe", "", &["Wifi"], TORONTO).await;

    let body = body_string(app.get("/tags/Open%20Late", None).await).await;
    assert!(body.contains("Bean There"));
    assert!(!body.contains("Byte Cafe"));
    assert!(body.contains("tag__link--active"));

    let body = body_string(app.get("/tags", None).await).await;
    assert!(body.contains("Bean There"));
    assert!(body.contains("Byte Cafe"));
}

#[tokio::test]
async fn test_top_page_renders() {
    let app = TestApp::new();
    let response = app.get("/top", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("No store has two reviews yet."));
}

#[tokio::test]
async fn test_unknown_flash_code_is_not_rendered() {
    let app = TestApp::new();
    let body = body_string(app.get("/stores?error=%3Cscript%3E", None).await).await;
    assert!(!body.contains("flash--error"));
}
