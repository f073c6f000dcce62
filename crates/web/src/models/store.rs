//! Store domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use delicious_core::{Location, Slug, StoreId, UserId};

use super::Review;

/// A store listing.
#[derive(Debug, Clone, Serialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created: DateTime<Utc>,
    pub location: Location,
    /// File name under the uploads directory.
    pub photo: Option<String>,
    #[serde(rename = "author")]
    pub author_id: UserId,
}

/// A validated store ready to insert.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub location: Location,
    pub photo: Option<String>,
    pub author_id: UserId,
}

/// New field values for an existing store.
///
/// Author and creation time are immutable and absent here.
#[derive(Debug, Clone)]
pub struct StoreUpdate {
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub location: Location,
    /// `None` keeps the current photo.
    pub photo: Option<String>,
}

/// Whether store reads attach their reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Populate {
    /// Attach every review, newest first.
    #[default]
    Reviews,
    /// Store fields only.
    None,
}

/// A store read together with its reviews when requested.
#[derive(Debug, Clone)]
pub struct StoreDetails {
    pub store: Store,
    /// `None` when read with [`Populate::None`].
    pub reviews: Option<Vec<Review>>,
}

impl StoreDetails {
    #[must_use]
    pub fn review_count(&self) -> usize {
        self.reviews.as_ref().map_or(0, Vec::len)
    }
}

/// Reduced projection returned by the nearby-stores endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyStore {
    pub slug: Slug,
    pub name: String,
    pub description: Option<String>,
    pub location: Location,
    pub photo: Option<String>,
}

impl From<Store> for NearbyStore {
    fn from(store: Store) -> Self {
        Self {
            slug: store.slug,
            name: store.name,
            description: store.description,
            location: store.location,
            photo: store.photo,
        }
    }
}

/// A row of the top stores ranking.
#[derive(Debug, Clone, Serialize)]
pub struct TopStore {
    pub id: StoreId,
    pub slug: Slug,
    pub name: String,
    pub photo: Option<String>,
    pub average_rating: f64,
    pub review_count: i64,
}
