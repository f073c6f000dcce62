//! Load sample users, stores and reviews from a YAML file.
//!
//! Records go through the same services the site uses, so slugs, tags,
//! coordinates and ratings are validated exactly as they are for form
//! submissions.
//!
//! # File Format
//!
//! ```yaml
//! users:
//!   - name: Wes
//!     email: wes@example.com
//!     password: correct horse battery
//! stores:
//!   - name: Bean There
//!     description: Pour-overs and pastries.
//!     tags: [Wifi, Open Late]
//!     address: 12 King St W, Toronto
//!     location: [-79.3832, 43.6532]
//!     author: wes@example.com
//! reviews:
//!   - store: Bean There
//!     author: wes@example.com
//!     rating: 5
//!     text: Best flat white in town.
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use delicious_core::{StoreId, UserId};
use delicious_web::db::{self, Repositories};
use delicious_web::services::auth::{AuthError, AuthService};
use delicious_web::services::stores::{StoreError, StoreInput, StoreService};

use super::{CommandError, database_url};

/// Tables emptied by `--clear`, children first.
const CLEAR_SQL: &str =
    "TRUNCATE delicious.review, delicious.store, delicious.user RESTART IDENTITY CASCADE";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("User {email}: {source}")]
    User { email: String, source: AuthError },

    #[error("Store {name}: {source}")]
    Store { name: String, source: StoreError },

    #[error("Review of {store}: {source}")]
    Review { store: String, source: StoreError },

    #[error("Unknown author: {0}")]
    UnknownUser(String),

    #[error("Unknown store: {0}")]
    UnknownStore(String),
}

/// Contents of a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub users: Vec<SeedUser>,
    pub stores: Vec<SeedStore>,
    pub reviews: Vec<SeedReview>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedStore {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub address: String,
    /// `[lng, lat]`
    pub location: [f64; 2],
    /// Email of a user in the same file.
    pub author: String,
    #[serde(default)]
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedReview {
    /// Name of a store in the same file.
    pub store: String,
    /// Email of a user in the same file.
    pub author: String,
    pub rating: i64,
    pub text: String,
}

/// What a seed run inserted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub stores: usize,
    pub reviews: usize,
}

/// Seed the configured database from `file`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the database is
/// unreachable, or any record is rejected.
pub async fn run(file: &Path, clear: bool) -> Result<(), SeedError> {
    info!(path = %file.display(), "Loading sample data");
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| SeedError::Read {
            path: file.display().to_string(),
            source,
        })?;
    let data: SeedData = serde_yaml::from_str(&content)?;

    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    if clear {
        sqlx::query(CLEAR_SQL).execute(&pool).await?;
        info!("Cleared stores, reviews and users");
    }

    let summary = seed(&Repositories::postgres(pool), &data).await?;

    info!("Seeding complete!");
    info!("  Users inserted: {}", summary.users);
    info!("  Stores inserted: {}", summary.stores);
    info!("  Reviews inserted: {}", summary.reviews);
    Ok(())
}

/// Insert everything in `data`, users first.
///
/// # Errors
///
/// Stops at the first rejected record.
pub async fn seed(repos: &Repositories, data: &SeedData) -> Result<SeedSummary, SeedError> {
    let auth = AuthService::new(repos.users.as_ref());
    let stores = StoreService::new(repos);
    let mut summary = SeedSummary::default();

    let mut users: HashMap<&str, UserId> = HashMap::new();
    for user in &data.users {
        let created = auth
            .register(&user.name, &user.email, &user.password, &user.password)
            .await
            .map_err(|source| SeedError::User {
                email: user.email.clone(),
                source,
            })?;
        users.insert(user.email.as_str(), created.id);
        summary.users += 1;
    }

    let author = |email: &str| {
        users
            .get(email)
            .copied()
            .ok_or_else(|| SeedError::UnknownUser(email.to_owned()))
    };

    let mut created_stores: HashMap<&str, StoreId> = HashMap::new();
    for store in &data.stores {
        let [lng, lat] = store.location;
        let input = StoreInput {
            name: store.name.clone(),
            description: store.description.clone(),
            tags: store.tags.clone(),
            address: store.address.clone(),
            lng: Some(lng.to_string()),
            lat: Some(lat.to_string()),
        };
        let created = stores
            .create(author(&store.author)?, &input, store.photo.clone())
            .await
            .map_err(|source| SeedError::Store {
                name: store.name.clone(),
                source,
            })?;
        created_stores.insert(store.name.as_str(), created.id);
        summary.stores += 1;
    }

    for review in &data.reviews {
        let store_id = created_stores
            .get(review.store.as_str())
            .copied()
            .ok_or_else(|| SeedError::UnknownStore(review.store.clone()))?;
        stores
            .add_review(author(&review.author)?, store_id, &review.text, Some(review.rating))
            .await
            .map_err(|source| SeedError::Review {
                store: review.store.clone(),
                source,
            })?;
        summary.reviews += 1;
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delicious_core::Slug;
    use delicious_web::models::Populate;

    use super::*;

    const SAMPLE: &str = include_str!("../../data/sample.yaml");

    #[test]
    fn test_sample_file_parses() {
        let data: SeedData = serde_yaml::from_str(SAMPLE).unwrap();
        assert!(!data.users.is_empty());
        assert!(!data.stores.is_empty());
        assert!(!data.reviews.is_empty());
    }

    #[tokio::test]
    async fn test_seed_sample_into_memory() {
        let data: SeedData = serde_yaml::from_str(SAMPLE).unwrap();
        let repos = Repositories::memory();

        let summary = seed(&repos, &data).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                users: data.users.len(),
                stores: data.stores.len(),
                reviews: data.reviews.len(),
            }
        );

        let first = &data.stores[0];
        let details = StoreService::new(&repos)
            .get_by_slug(Slug::from_name(&first.name).unwrap().as_str(), Populate::Reviews)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.store.name, first.name);
    }

    #[tokio::test]
    async fn test_unknown_author_is_rejected() {
        let data: SeedData = serde_yaml::from_str(
            r"
stores:
  - name: Orphan
    address: Nowhere
    location: [0.0, 0.0]
    author: ghost@example.com
",
        )
        .unwrap();

        let err = seed(&Repositories::memory(), &data).await.unwrap_err();
        assert!(matches!(err, SeedError::UnknownUser(ref email) if email == "ghost@example.com"));
    }

    #[tokio::test]
    async fn test_bad_rating_names_the_store() {
        let data: SeedData = serde_yaml::from_str(
            r"
users:
  - name: Ann
    email: ann@example.com
    password: long enough password
stores:
  - name: Corner Cafe
    address: 1 Main St
    location: [-79.38, 43.65]
    author: ann@example.com
reviews:
  - store: Corner Cafe
    author: ann@example.com
    rating: 9
    text: Too good.
",
        )
        .unwrap();

        let err = seed(&Repositories::memory(), &data).await.unwrap_err();
        assert!(matches!(err, SeedError::Review { ref store, .. } if store == "Corner Cafe"));
    }
}
