//! JSON API tests: search, nearby stores and hearts.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::Value;

use delicious_integration_tests::{TestApp, body_json};

const DOWNTOWN: (f64, f64) = (-79.3832, 43.6532);
/// About 1 km north of downtown.
const NEARBY: (f64, f64) = (-79.3832, 43.6622);
/// About 15 km east of downtown.
const FAR: (f64, f64) = (-79.2000, 43.6532);

fn names(json: &Value) -> Vec<&str> {
    json.as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_search_matches_name_and_description() {
    let app = TestApp::new();
    app.register("Ann", "ann@example.com").await;
    let ann = app.user_id("ann@example.com").await;

    app.add_store(ann, "Bean There", "Pour-over coffee and pastries", &[], DOWNTOWN)
        .await;
    app.add_store(ann, "Hoppy Badger", "Craft beer on tap", &[], DOWNTOWN)
        .await;

    let json = body_json(app.get("/api/v1/search?q=coffee", None).await).await;
    assert_eq!(names(&json), vec!["Bean There"]);

    let json = body_json(app.get("/api/v1/search?q=badger", None).await).await;
    assert_eq!(names(&json), vec!["Hoppy Badger"]);

    let json = body_json(app.get("/api/v1/search?q=sushi", None).await).await;
    assert!(names(&json).is_empty());
}

#[tokio::test]
async fn test_blank_search_returns_empty_array() {
    let app = TestApp::new();
    let response = app.get("/api/v1/search?q=%20%20", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_near_returns_stores_within_radius() {
    let app = TestApp::new();
    app.register("Ann", "ann@example.com").await;
    let ann = app.user_id("ann@example.com").await;

    app.add_store(ann, "Close By", "", &[], NEARBY).await;
    app.add_store(ann, "Far Away", "", &[], FAR).await;

    let uri = format!("/api/v1/stores/near?lng={}&lat={}", DOWNTOWN.0, DOWNTOWN.1);
    let response = app.get(&uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(names(&json), vec!["Close By"]);
    // reduced projection
    let store = &json[0];
    assert_eq!(store["slug"], "close-by");
    assert!(store.get("author").is_none());
    assert!(store["location"]["address"].is_string());
}

#[tokio::test]
async fn test_near_rejects_bad_coordinates() {
    let app = TestApp::new();

    for uri in [
        "/api/v1/stores/near?lng=abc&lat=43.6",
        "/api/v1/stores/near?lng=-79.3",
        "/api/v1/stores/near?lng=-79.3&lat=95",
    ] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn test_heart_requires_session() {
    let app = TestApp::new();
    let response = app.post_form("/api/v1/stores/1/heart", "", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_heart_toggles_and_returns_user() {
    let app = TestApp::new();
    let cookie = app.register("Ann", "ann@example.com").await;
    let ann = app.user_id("ann@example.com").await;
    let store = app.add_store(ann, "Bean There", "", &[], DOWNTOWN).await;
    let uri = format!("/api/v1/stores/{store}/heart");

    let response = app.post_form(&uri, "", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let user = body_json(response).await;
    assert_eq!(user["hearts"], serde_json::json!([store.as_i32()]));
    assert!(user.get("password_hash").is_none());

    let user = body_json(app.post_form(&uri, "", Some(&cookie)).await).await;
    assert_eq!(user["hearts"], serde_json::json!([]));
}

#[tokio::test]
async fn test_heart_unknown_store_is_not_found() {
    let app = TestApp::new();
    let cookie = app.register("Ann", "ann@example.com").await;

    let response = app
        .post_form("/api/v1/stores/999/heart", "", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
