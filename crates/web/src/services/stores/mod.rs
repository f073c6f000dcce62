//! Store service.
//!
//! Owns the store lifecycle (create, edit with ownership checks, unique
//! slugs), reviews and hearts, plus the read paths the pages and JSON API
//! share.

mod error;

pub use error::StoreError;

use std::collections::HashMap;

use tracing::instrument;

use delicious_core::{
    GeoPoint, Location, Page, Rating, Slug, StoreId, TagCount, UserId,
    geo::{NEARBY_LIMIT, NEARBY_RADIUS_M},
    pagination::STORES_PER_PAGE,
    rating::{MIN_REVIEWS_FOR_RANKING, TOP_STORES_LIMIT},
    search::SEARCH_LIMIT,
    tags,
};

use crate::db::{RepositoryError, Repositories};
use crate::models::{
    NearbyStore, NewReview, NewStore, Populate, Review, Store, StoreDetails, StoreUpdate,
    TopStore, User,
};

/// Attempts at reserving a slug before giving up on a write race.
const MAX_SLUG_ATTEMPTS: usize = 3;

/// Largest list offset a backend is asked for; `i64::MAX`, the `BIGINT` ceiling.
const MAX_LIST_OFFSET: u64 = u64::MAX >> 1;

/// Raw store form fields, before validation.
#[derive(Debug, Clone, Default)]
pub struct StoreInput {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub address: String,
    pub lng: Option<String>,
    pub lat: Option<String>,
}

/// Store fields that passed validation.
#[derive(Debug, Clone)]
struct ValidStore {
    name: String,
    description: Option<String>,
    tags: Vec<String>,
    location: Location,
}

impl StoreInput {
    fn validate(&self) -> Result<ValidStore, StoreError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(StoreError::MissingName);
        }
        // fail early on names without slug material
        Slug::from_name(name)?;

        let address = self.address.trim();
        if address.is_empty() {
            return Err(StoreError::MissingAddress);
        }
        let coordinates = GeoPoint::parse(self.lng.as_deref(), self.lat.as_deref())?;

        let description = self.description.trim();
        Ok(ValidStore {
            name: name.to_owned(),
            description: (!description.is_empty()).then(|| description.to_owned()),
            tags: tags::normalize(&self.tags),
            location: Location {
                coordinates,
                address: address.to_owned(),
            },
        })
    }
}

/// One page of the store listing.
#[derive(Debug, Clone)]
pub struct StorePage {
    pub page: Page,
    pub stores: Vec<StoreDetails>,
}

/// Everything the tags page shows.
#[derive(Debug, Clone)]
pub struct TagsPage {
    pub tags: Vec<TagCount>,
    pub selected: Option<String>,
    pub stores: Vec<StoreDetails>,
}

/// Store service.
pub struct StoreService<'a> {
    repos: &'a Repositories,
}

impl<'a> StoreService<'a> {
    /// Create a new store service.
    #[must_use]
    pub const fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Validate and insert a new store owned by `author`.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for bad input, `StoreError::SlugConflict`
    /// if concurrent writers kept taking the chosen slug, or
    /// `StoreError::Repository` on storage failure.
    #[instrument(skip(self, input), fields(author = %author))]
    pub async fn create(
        &self,
        author: UserId,
        input: &StoreInput,
        photo: Option<String>,
    ) -> Result<Store, StoreError> {
        let valid = input.validate()?;

        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let slug = self.unique_slug(&valid.name, None).await?;
            let new_store = NewStore {
                name: valid.name.clone(),
                slug,
                description: valid.description.clone(),
                tags: valid.tags.clone(),
                location: valid.location.clone(),
                photo: photo.clone(),
                author_id: author,
            };

            match self.repos.stores.insert(&new_store).await {
                Ok(store) => {
                    tracing::info!(store_id = %store.id, slug = %store.slug, "Store created");
                    return Ok(store);
                }
                Err(RepositoryError::Conflict(_)) => {
                    tracing::warn!(attempt, slug = %new_store.slug, "Slug taken concurrently");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::SlugConflict)
    }

    /// Load a store for editing by `editor`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` or `StoreError::OwnershipViolation`.
    pub async fn get_for_edit(&self, editor: UserId, id: StoreId) -> Result<Store, StoreError> {
        let store = self
            .repos
            .stores
            .get_by_id(id)
            .await?
            .ok_or(StoreError::NotFound)?;
        confirm_owner(&store, editor)?;
        Ok(store)
    }

    /// Replace a store's fields. Only its author may do this.
    ///
    /// The slug is recomputed only when the name changed. `photo` of `None`
    /// keeps the current photo.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound`, `StoreError::OwnershipViolation`
    /// (checked before anything is validated or written), a validation
    /// variant, `StoreError::SlugConflict` or `StoreError::Repository`.
    #[instrument(skip(self, input), fields(editor = %editor, store_id = %id))]
    pub async fn update(
        &self,
        editor: UserId,
        id: StoreId,
        input: &StoreInput,
        photo: Option<String>,
    ) -> Result<Store, StoreError> {
        let current = self.get_for_edit(editor, id).await?;
        let valid = input.validate()?;
        let renamed = valid.name != current.name;

        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let slug = if renamed {
                self.unique_slug(&valid.name, Some(&current.slug)).await?
            } else {
                current.slug.clone()
            };
            let update = StoreUpdate {
                name: valid.name.clone(),
                slug,
                description: valid.description.clone(),
                tags: valid.tags.clone(),
                location: valid.location.clone(),
                photo: photo.clone(),
            };

            match self.repos.stores.update(id, &update).await {
                Ok(store) => {
                    tracing::info!(slug = %store.slug, renamed, "Store updated");
                    return Ok(store);
                }
                Err(RepositoryError::Conflict(_)) => {
                    tracing::warn!(attempt, slug = %update.slug, "Slug taken concurrently");
                }
                Err(RepositoryError::NotFound) => return Err(StoreError::NotFound),
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::SlugConflict)
    }

    /// Pick an unused slug for `name`, ignoring the store's own current slug.
    async fn unique_slug(&self, name: &str, own: Option<&Slug>) -> Result<Slug, StoreError> {
        let base = Slug::from_name(name)?;
        let mut existing = self
            .repos
            .stores
            .slugs_matching(&base.variant_pattern())
            .await?;
        if let Some(own) = own {
            existing.retain(|s| s != own.as_str());
        }
        Ok(base.next_available(&existing))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// # Errors
    ///
    /// Returns `StoreError::Repository` on storage failure.
    pub async fn get_by_slug(
        &self,
        slug: &str,
        populate: Populate,
    ) -> Result<Option<StoreDetails>, StoreError> {
        let Some(store) = self.repos.stores.get_by_slug(slug).await? else {
            return Ok(None);
        };
        Ok(self.populate(vec![store], populate).await?.pop())
    }

    /// A page of stores, newest first.
    ///
    /// A page past the end is clamped to the last page and flagged.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` on storage failure.
    #[instrument(skip(self))]
    pub async fn list_page(
        &self,
        requested: u64,
        populate: Populate,
    ) -> Result<StorePage, StoreError> {
        let offset = requested_offset(requested);
        let (mut stores, total) = tokio::try_join!(
            self.repos.stores.list(offset, STORES_PER_PAGE),
            self.repos.stores.count(),
        )?;

        let page = Page::resolve(requested, total, STORES_PER_PAGE);
        if page.clamped {
            tracing::debug!(requested, last = page.number, "Page past the end, clamping");
            stores = self.repos.stores.list(page.offset(), page.limit()).await?;
        }

        Ok(StorePage {
            page,
            stores: self.populate(stores, populate).await?,
        })
    }

    /// Tag counts alongside the stores carrying `tag` (or any tag).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` on storage failure.
    pub async fn tags_page(
        &self,
        tag: Option<&str>,
        populate: Populate,
    ) -> Result<TagsPage, StoreError> {
        let (tags, stores) = tokio::try_join!(
            self.repos.stores.tag_counts(),
            self.repos.stores.by_tag(tag),
        )?;

        Ok(TagsPage {
            tags,
            selected: tag.map(ToOwned::to_owned),
            stores: self.populate(stores, populate).await?,
        })
    }

    /// Up to five stores matching `query`, most relevant first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` on storage failure.
    pub async fn search(&self, query: &str) -> Result<Vec<Store>, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.repos.stores.search(query, SEARCH_LIMIT).await?)
    }

    /// Stores within ten kilometers of the given point, nearest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidLocation` for bad coordinates, before any
    /// storage access.
    pub async fn near(
        &self,
        lng: Option<&str>,
        lat: Option<&str>,
    ) -> Result<Vec<NearbyStore>, StoreError> {
        let center = GeoPoint::parse(lng, lat)?;
        Ok(self
            .repos
            .stores
            .near(center, NEARBY_RADIUS_M, NEARBY_LIMIT)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `StoreError::Repository` on storage failure.
    pub async fn top_rated(&self) -> Result<Vec<TopStore>, StoreError> {
        Ok(self
            .repos
            .stores
            .top_rated(MIN_REVIEWS_FOR_RANKING, TOP_STORES_LIMIT)
            .await?)
    }

    // =========================================================================
    // Hearts
    // =========================================================================

    /// The stores `user` has hearted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` on storage failure.
    pub async fn hearted_stores(
        &self,
        user: &User,
        populate: Populate,
    ) -> Result<Vec<StoreDetails>, StoreError> {
        let stores = self.repos.stores.get_many(user.hearts.as_slice()).await?;
        self.populate(stores, populate).await
    }

    /// Heart or un-heart a store and return the updated user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the store or user does not exist.
    #[instrument(skip(self), fields(user_id = %user, store_id = %store))]
    pub async fn toggle_heart(&self, user: UserId, store: StoreId) -> Result<User, StoreError> {
        if self.repos.stores.get_by_id(store).await?.is_none() {
            return Err(StoreError::NotFound);
        }

        let updated = self
            .repos
            .users
            .toggle_heart(user, store)
            .await
            .map_err(not_found)?;
        tracing::debug!(hearted = updated.hearts.contains(store), "Heart toggled");
        Ok(updated)
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Add a review to a store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MissingReviewText` or `StoreError::MissingRating`,
    /// `StoreError::InvalidRating` outside 1 to 5, or `StoreError::NotFound`
    /// for an unknown store.
    #[instrument(skip(self, text), fields(author = %author, store_id = %store))]
    pub async fn add_review(
        &self,
        author: UserId,
        store: StoreId,
        text: &str,
        rating: Option<i64>,
    ) -> Result<Review, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::MissingReviewText);
        }
        let rating = Rating::new(rating.ok_or(StoreError::MissingRating)?)?;

        let review = self
            .repos
            .reviews
            .insert(&NewReview {
                store_id: store,
                author_id: author,
                text: text.to_owned(),
                rating,
            })
            .await
            .map_err(not_found)?;

        tracing::info!(review_id = %review.id, "Review added");
        Ok(review)
    }

    /// Attach reviews to each store when asked to.
    async fn populate(
        &self,
        stores: Vec<Store>,
        populate: Populate,
    ) -> Result<Vec<StoreDetails>, StoreError> {
        if populate == Populate::None {
            return Ok(stores
                .into_iter()
                .map(|store| StoreDetails { store, reviews: None })
                .collect());
        }

        let ids: Vec<StoreId> = stores.iter().map(|s| s.id).collect();
        let mut by_store: HashMap<StoreId, Vec<Review>> = HashMap::new();
        for review in self.repos.reviews.for_stores(&ids).await? {
            by_store.entry(review.store_id).or_default().push(review);
        }

        Ok(stores
            .into_iter()
            .map(|store| {
                let reviews = by_store.remove(&store.id).unwrap_or_default();
                StoreDetails {
                    store,
                    reviews: Some(reviews),
                }
            })
            .collect())
    }
}

fn confirm_owner(store: &Store, editor: UserId) -> Result<(), StoreError> {
    if store.author_id == editor {
        Ok(())
    } else {
        tracing::warn!(store_id = %store.id, editor = %editor, "Edit attempt by non-owner");
        Err(StoreError::OwnershipViolation)
    }
}

fn not_found(e: RepositoryError) -> StoreError {
    match e {
        RepositoryError::NotFound => StoreError::NotFound,
        other => StoreError::Repository(other),
    }
}

/// Offset of the first store on the requested page, before clamping.
///
/// Absurd page numbers land on the ceiling and are clamped once the count
/// is known.
fn requested_offset(requested: u64) -> u64 {
    requested
        .max(1)
        .saturating_sub(1)
        .saturating_mul(STORES_PER_PAGE)
        .min(MAX_LIST_OFFSET)
}
