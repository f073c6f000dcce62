//! Integration tests for Delicious.
//!
//! Most tests drive the full router (middleware, sessions, templates and JSON
//! API) in process against the in-memory backend, so they need no database
//! or running server. The `postgres` tests are ignored by default.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p delicious-integration-tests
//!
//! # Postgres-backed store queries (the database is truncated)
//! DELICIOUS_TEST_DATABASE_URL=postgres://localhost/delicious_test \
//!     cargo test -p delicious-integration-tests --test postgres -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `api` - JSON search, nearby stores and hearts
//! - `pages` - Listing, detail, tags, top stores and error pages
//! - `accounts` - Registration, login, logout, store forms and photo uploads
//! - `postgres` - Search, nearby, tag and rating queries on `PostgreSQL`

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use delicious_core::{Email, StoreId, UserId};
use delicious_web::config::{StorageBackend, WebConfig};
use delicious_web::db::Repositories;
use delicious_web::middleware::create_session_layer;
use delicious_web::services::stores::{StoreInput, StoreService};
use delicious_web::state::AppState;

/// Password used by every test account.
pub const PASSWORD: &str = "integration-password";

/// The application wired to in-memory storage.
pub struct TestApp {
    pub router: Router,
    pub repos: Repositories,
    pub uploads_dir: std::path::PathBuf,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let config = WebConfig {
            storage: StorageBackend::Memory,
            database_url: None,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            base_url: "http://localhost:7777".to_string(),
            session_secret: SecretString::from("kX9#mQ2$vL7@pR4!nT8&wZ3^yB6*cF1%".to_string()),
            uploads_dir: std::env::temp_dir().join(format!("delicious-{}", uuid::Uuid::new_v4())),
            request_timeout: Duration::from_secs(10),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let uploads_dir = config.uploads_dir.clone();
        let repos = Repositories::memory();
        let session_layer = create_session_layer(MemoryStore::default(), &config);
        let state = AppState::new(config, repos.clone());

        Self {
            router: delicious_web::app(state, session_layer),
            repos,
            uploads_dir,
        }
    }

    /// Send one request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// POST a url-encoded form.
    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form.to_owned())).unwrap())
            .await
    }

    /// POST a multipart form of text fields.
    pub async fn post_multipart(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Response<Body> {
        self.post_multipart_with_file(uri, fields, None, cookie)
            .await
    }

    /// POST a multipart form of text fields plus an optional `photo` file part.
    pub async fn post_multipart_with_file(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        photo: Option<Photo<'_>>,
        cookie: Option<&str>,
    ) -> Response<Body> {
        const BOUNDARY: &str = "delicious-test-boundary";

        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        if let Some(photo) = photo {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n{}\r\n",
                photo.file_name, photo.content_type, photo.body
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Register through the site and return the session cookie.
    pub async fn register(&self, name: &str, email: &str) -> String {
        let form = format!(
            "name={name}&email={email}&password={PASSWORD}&password_confirm={PASSWORD}",
            email = email.replace('@', "%40"),
        );
        let response = self.post_form("/register", &form, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        session_cookie(&response).unwrap()
    }

    /// The id of the account with `email`.
    pub async fn user_id(&self, email: &str) -> UserId {
        self.repos
            .users
            .get_by_email(&Email::parse(email).unwrap())
            .await
            .unwrap()
            .unwrap()
            .id
    }

    /// Create a store directly through the service layer.
    pub async fn add_store(
        &self,
        author: UserId,
        name: &str,
        description: &str,
        tags: &[&str],
        (lng, lat): (f64, f64),
    ) -> StoreId {
        let input = StoreInput {
            name: name.to_owned(),
            description: description.to_owned(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            address: format!("{name} Street"),
            lng: Some(lng.to_string()),
            lat: Some(lat.to_string()),
        };
        StoreService::new(&self.repos)
            .create(author, &input, None)
            .await
            .unwrap()
            .id
    }
}

/// A file attached to a multipart store form.
#[derive(Debug, Clone, Copy)]
pub struct Photo<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub body: &'a str,
}

/// Names of the files written under `dir`, if it exists.
#[must_use]
pub fn uploaded_files(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

/// The `name=value` pair of the session cookie set by `response`.
#[must_use]
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("delicious_session="))
        .and_then(|v| v.split(';').next())
        .map(ToOwned::to_owned)
}

/// Where a redirect points.
#[must_use]
pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
