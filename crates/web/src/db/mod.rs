//! Data access for stores, reviews and users.
//!
//! Handlers and services talk to storage through the repository traits in
//! this module. Two backends implement them:
//!
//! - [`postgres`] - `PostgreSQL` with `PostGIS`, the production backend.
//!   Aggregations (tag counts, ranking, relevance, radius search) run in SQL.
//! - [`memory`] - a single `RwLock`-guarded map, used in development and in
//!   tests. Aggregations use the algorithms in `delicious-core`.
//!
//! # Database: schema `delicious`
//!
//! ## Tables
//!
//! - `user` - Accounts, password hashes, hearts, reset tokens
//! - `store` - Listings with geography point, tags and a generated search vector
//! - `review` - Ratings and text, one row per review
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p delicious-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use delicious_core::{Email, GeoPoint, StoreId, TagCount, UserId};

use crate::models::{NearbyStore, NewReview, NewStore, Review, Store, StoreUpdate, TopStore, User};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email or slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Store listings and the aggregations over them.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Every slug matching a POSIX regex, case-insensitively.
    async fn slugs_matching(&self, pattern: &str) -> Result<Vec<String>, RepositoryError>;

    /// Insert a store. A taken slug is a [`RepositoryError::Conflict`].
    async fn insert(&self, store: &NewStore) -> Result<Store, RepositoryError>;

    /// Replace a store's editable fields. A taken slug is a
    /// [`RepositoryError::Conflict`], an unknown id [`RepositoryError::NotFound`].
    async fn update(&self, id: StoreId, update: &StoreUpdate) -> Result<Store, RepositoryError>;

    async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError>;

    /// A page of stores, newest first.
    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Store>, RepositoryError>;

    async fn count(&self) -> Result<u64, RepositoryError>;

    /// Stores with the given ids, newest first. Unknown ids are skipped.
    async fn get_many(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError>;

    /// Distinct tags with store counts, count descending then tag ascending.
    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError>;

    /// Stores carrying `tag`, or every tagged store when `tag` is `None`.
    async fn by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError>;

    /// Text search over name and description, most relevant first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Store>, RepositoryError>;

    /// Stores within `radius_m` meters of `center`, nearest first.
    async fn near(
        &self,
        center: GeoPoint,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, RepositoryError>;

    /// Stores with at least `min_reviews` reviews by mean rating, best first.
    async fn top_rated(
        &self,
        min_reviews: usize,
        limit: usize,
    ) -> Result<Vec<TopStore>, RepositoryError>;
}

/// Store reviews.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert a review. An unknown store is [`RepositoryError::NotFound`].
    async fn insert(&self, review: &NewReview) -> Result<Review, RepositoryError>;

    /// Reviews of the given stores, newest first.
    async fn for_stores(&self, ids: &[StoreId]) -> Result<Vec<Review>, RepositoryError>;
}

/// User accounts and their hearts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user. A taken email is a [`RepositoryError::Conflict`].
    async fn create(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// The user and their argon2 PHC hash.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Change name and email. A taken email is a [`RepositoryError::Conflict`].
    async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError>;

    /// Store a reset token for the account with `email`.
    ///
    /// Returns `false` when no such account exists.
    async fn set_reset_token(
        &self,
        email: &Email,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// The user owning `token`, if it expires after `now`.
    async fn get_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError>;

    /// Set a new password hash and clear any reset token.
    async fn set_password(&self, id: UserId, password_hash: &str) -> Result<User, RepositoryError>;

    /// Add `store` to the user's hearts if absent, remove it otherwise, as
    /// one atomic operation.
    async fn toggle_heart(&self, id: UserId, store: StoreId) -> Result<User, RepositoryError>;
}

/// The repositories handlers and services work against.
#[derive(Clone)]
pub struct Repositories {
    pub stores: Arc<dyn StoreRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    /// `PostgreSQL`-backed repositories sharing one pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            stores: Arc::new(postgres::PgStoreRepository::new(pool.clone())),
            reviews: Arc::new(postgres::PgReviewRepository::new(pool.clone())),
            users: Arc::new(postgres::PgUserRepository::new(pool)),
        }
    }

    /// In-memory repositories sharing one store.
    #[must_use]
    pub fn memory() -> Self {
        let db = memory::MemoryDb::default();
        Self {
            stores: Arc::new(db.clone()),
            reviews: Arc::new(db.clone()),
            users: Arc::new(db),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
