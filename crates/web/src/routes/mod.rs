//! HTTP route handlers for the store directory.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Store listing, page 1
//! GET  /stores                    - Store listing, page 1
//! GET  /stores/page/{page}        - Store listing, page N (clamped)
//! GET  /store/{slug}              - Store detail with reviews
//! GET  /tags                      - Tag counts and tagged stores
//! GET  /tags/{tag}                - Stores with one tag
//! GET  /top                       - Top rated stores
//! GET  /map                       - Map of nearby stores
//! GET  /health                    - Liveness
//! GET  /health/ready              - Readiness (storage ping)
//!
//! # Stores (requires auth)
//! GET  /add                       - New store form
//! POST /add                       - Create store (multipart)
//! GET  /stores/{id}/edit          - Edit store form, owner only
//! POST /add/{id}                  - Update store (multipart), owner only
//! POST /reviews/{id}              - Add a review
//! GET  /hearts                    - Hearted stores
//!
//! # Auth
//! GET  /login                     - Login page
//! POST /login                     - Login action
//! GET  /register                  - Register page
//! POST /register                  - Register action
//! GET  /logout                    - Logout action
//! POST /account/forgot            - Issue a password reset link
//! GET  /account/reset/{token}     - Reset password form
//! POST /account/reset/{token}     - Reset password action
//!
//! # Account (requires auth)
//! GET  /account                   - Account form
//! POST /account                   - Update name and email
//!
//! # JSON API
//! GET  /api/v1/search             - Text search
//! GET  /api/v1/stores/near        - Stores near a point
//! POST /api/v1/stores/{id}/heart  - Toggle a heart (401 without a session)
//!
//! # Files
//! GET  /static/*                  - CSS and scripts
//! GET  /uploads/*                 - Store photos
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod health;
pub mod hearts;
pub mod map;
pub mod messages;
pub mod reviews;
pub mod stores;
pub mod tags;
pub mod top;

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::service::SignedCookie;
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::error::NotFoundTemplate;
use crate::middleware::{OptionalAuth, request_id_middleware};
use crate::services::photos::MAX_PHOTO_BYTES;
use crate::state::AppState;

/// Directory served under `/static`.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Body limit for the store form: one photo plus the text fields.
const STORE_FORM_BODY_LIMIT: usize = MAX_PHOTO_BYTES + 64 * 1024;

/// Create the store form routes, which accept photo uploads.
pub fn store_form_routes() -> Router<AppState> {
    Router::new()
        .route("/add", get(stores::add_page).post(stores::create))
        .route("/add/{id}", post(stores::update))
        .layer(DefaultBodyLimit::max(STORE_FORM_BODY_LIMIT))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout))
        .route("/account", get(account::index).post(account::update))
        .route("/account/forgot", post(auth::forgot_password))
        .route(
            "/account/reset/{token}",
            get(auth::reset_password_page).post(auth::reset_password),
        )
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(api::search))
        .route("/stores/near", get(api::near))
        .route("/stores/{id}/heart", post(api::heart))
}

/// Create all page and API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/stores", get(stores::index))
        .route("/stores/page/{page}", get(stores::page))
        .route("/stores/{id}/edit", get(stores::edit_page))
        .route("/store/{slug}", get(stores::show))
        .route("/tags", get(tags::index))
        .route("/tags/{tag}", get(tags::show))
        .route("/top", get(top::index))
        .route("/hearts", get(hearts::index))
        .route("/map", get(map::index))
        .route("/reviews/{id}", post(reviews::create))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(store_form_routes())
        .merge(auth_routes())
        .nest("/api/v1", api_routes())
}

/// Fallback for unmatched paths.
pub async fn not_found(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate::new(user, "That page doesn't exist."),
    )
}

/// Requests still running after `timeout` are answered with 408.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Build the full application: routes, files and the middleware stack.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S, SignedCookie>) -> Router
where
    S: SessionStore + Clone,
{
    let timeout = state.config().request_timeout;
    let uploads = ServeDir::new(&state.config().uploads_dir);

    Router::new()
        .merge(routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .nest_service("/uploads", uploads)
        .fallback(not_found)
        .layer(session_layer)
        .layer(timeout_layer(timeout))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_slow_requests_time_out_with_408() {
        let router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    "late"
                }),
            )
            .route("/fast", get(|| async { "ok" }))
            .layer(timeout_layer(Duration::from_millis(20)));

        let slow = router
            .clone()
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(slow.status(), StatusCode::REQUEST_TIMEOUT);

        let fast = router
            .oneshot(Request::get("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(fast.status(), StatusCode::OK);
    }
}
