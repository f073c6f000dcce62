//! In-memory repositories for development and tests.
//!
//! All three repository traits are implemented by one [`MemoryDb`] so that
//! stores, reviews and users share the same lock. Writers take the write
//! lock for the whole read-modify-write, which is what makes the heart toggle
//! and slug uniqueness checks atomic here.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use tokio::sync::RwLock;

use delicious_core::{
    Email, GeoPoint, Hearts, Rating, ReviewId, StoreId, TagCount, TextQuery, UserId, geo, rating,
    tags,
};

use super::{RepositoryError, ReviewRepository, StoreRepository, UserRepository};
use crate::models::{
    NearbyStore, NewReview, NewStore, Review, ReviewAuthor, Store, StoreUpdate, TopStore, User,
};

#[derive(Debug, Clone)]
struct StoredReview {
    id: ReviewId,
    store_id: StoreId,
    author_id: UserId,
    text: String,
    rating: Rating,
    created: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
    reset: Option<(String, DateTime<Utc>)>,
}

#[derive(Debug, Default)]
struct MemoryData {
    last_store_id: i32,
    last_review_id: i32,
    last_user_id: i32,
    stores: BTreeMap<StoreId, Store>,
    reviews: Vec<StoredReview>,
    users: BTreeMap<UserId, StoredUser>,
}

impl MemoryData {
    fn slug_taken(&self, slug: &str, except: Option<StoreId>) -> bool {
        self.stores
            .values()
            .any(|s| s.slug.as_str() == slug && Some(s.id) != except)
    }

    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.user.email == *email && Some(u.user.id) != except)
    }

    fn user_by_email_mut(&mut self, email: &Email) -> Option<&mut StoredUser> {
        self.users.values_mut().find(|u| u.user.email == *email)
    }

    fn resolve_review(&self, r: &StoredReview) -> Result<Review, RepositoryError> {
        let author = self.users.get(&r.author_id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("review {} has no author", r.id))
        })?;

        Ok(Review {
            id: r.id,
            store_id: r.store_id,
            author: ReviewAuthor {
                id: author.user.id,
                name: author.user.name.clone(),
                email: author.user.email.clone(),
            },
            text: r.text.clone(),
            rating: r.rating,
            created: r.created,
        })
    }
}

/// Newest first; ids break ties between stores created in the same instant.
fn newest_first(stores: &mut [Store]) {
    stores.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
}

/// Process-local storage shared by every repository handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    inner: Arc<RwLock<MemoryData>>,
}

#[async_trait]
impl StoreRepository for MemoryDb {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn slugs_matching(&self, pattern: &str) -> Result<Vec<String>, RepositoryError> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid slug pattern: {e}")))?;

        let data = self.inner.read().await;
        Ok(data
            .stores
            .values()
            .filter(|s| re.is_match(s.slug.as_str()))
            .map(|s| s.slug.to_string())
            .collect())
    }

    async fn insert(&self, store: &NewStore) -> Result<Store, RepositoryError> {
        let mut data = self.inner.write().await;
        if data.slug_taken(store.slug.as_str(), None) {
            return Err(RepositoryError::Conflict("slug already exists".to_owned()));
        }

        data.last_store_id += 1;
        let created = Store {
            id: StoreId::new(data.last_store_id),
            name: store.name.clone(),
            slug: store.slug.clone(),
            description: store.description.clone(),
            tags: store.tags.clone(),
            created: Utc::now(),
            location: store.location.clone(),
            photo: store.photo.clone(),
            author_id: store.author_id,
        };
        data.stores.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: StoreId, update: &StoreUpdate) -> Result<Store, RepositoryError> {
        let mut data = self.inner.write().await;
        if data.slug_taken(update.slug.as_str(), Some(id)) {
            return Err(RepositoryError::Conflict("slug already exists".to_owned()));
        }

        let store = data.stores.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        store.name.clone_from(&update.name);
        store.slug = update.slug.clone();
        store.description.clone_from(&update.description);
        store.tags.clone_from(&update.tags);
        store.location = update.location.clone();
        if let Some(photo) = &update.photo {
            store.photo = Some(photo.clone());
        }
        Ok(store.clone())
    }

    async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        Ok(self.inner.read().await.stores.get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let data = self.inner.read().await;
        Ok(data.stores.values().find(|s| s.slug.as_str() == slug).cloned())
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Store>, RepositoryError> {
        let mut stores: Vec<Store> = self.inner.read().await.stores.values().cloned().collect();
        newest_first(&mut stores);

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(stores.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.inner.read().await.stores.len() as u64)
    }

    async fn get_many(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        let data = self.inner.read().await;
        let mut stores: Vec<Store> = ids
            .iter()
            .filter_map(|id| data.stores.get(id).cloned())
            .collect();
        newest_first(&mut stores);
        Ok(stores)
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let data = self.inner.read().await;
        Ok(tags::count(data.stores.values().map(|s| &s.tags)))
    }

    async fn by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let data = self.inner.read().await;
        let mut stores: Vec<Store> = data
            .stores
            .values()
            .filter(|s| match tag {
                Some(tag) => s.tags.iter().any(|t| t == tag),
                None => !s.tags.is_empty(),
            })
            .cloned()
            .collect();
        newest_first(&mut stores);
        Ok(stores)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Store>, RepositoryError> {
        let query = TextQuery::parse(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let data = self.inner.read().await;
        Ok(query
            .rank(data.stores.values(), limit, |s| {
                (s.name.as_str(), s.description.as_deref())
            })
            .into_iter()
            .cloned()
            .collect())
    }

    async fn near(
        &self,
        center: GeoPoint,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, RepositoryError> {
        let data = self.inner.read().await;
        Ok(
            geo::nearest_within(data.stores.values(), &center, radius_m, limit, |s| {
                s.location.coordinates
            })
            .into_iter()
            .map(|(s, _)| NearbyStore::from(s.clone()))
            .collect(),
        )
    }

    async fn top_rated(
        &self,
        min_reviews: usize,
        limit: usize,
    ) -> Result<Vec<TopStore>, RepositoryError> {
        let data = self.inner.read().await;
        let ranked = rating::rank_by_average(
            data.reviews.iter().map(|r| (r.store_id, r.rating)),
            min_reviews,
            limit,
        );

        ranked
            .into_iter()
            .map(|summary| {
                let store = data.stores.get(&summary.key).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "review points at missing store {}",
                        summary.key
                    ))
                })?;
                Ok(TopStore {
                    id: store.id,
                    slug: store.slug.clone(),
                    name: store.name.clone(),
                    photo: store.photo.clone(),
                    average_rating: summary.average,
                    review_count: i64::try_from(summary.count).unwrap_or(i64::MAX),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ReviewRepository for MemoryDb {
    async fn insert(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let mut data = self.inner.write().await;
        if !data.stores.contains_key(&review.store_id)
            || !data.users.contains_key(&review.author_id)
        {
            return Err(RepositoryError::NotFound);
        }

        data.last_review_id += 1;
        let stored = StoredReview {
            id: ReviewId::new(data.last_review_id),
            store_id: review.store_id,
            author_id: review.author_id,
            text: review.text.clone(),
            rating: review.rating,
            created: Utc::now(),
        };
        data.reviews.push(stored.clone());
        data.resolve_review(&stored)
    }

    async fn for_stores(&self, ids: &[StoreId]) -> Result<Vec<Review>, RepositoryError> {
        let data = self.inner.read().await;
        let mut matching: Vec<&StoredReview> = data
            .reviews
            .iter()
            .filter(|r| ids.contains(&r.store_id))
            .collect();
        matching.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));

        matching.into_iter().map(|r| data.resolve_review(r)).collect()
    }
}

#[async_trait]
impl UserRepository for MemoryDb {
    async fn create(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut data = self.inner.write().await;
        if data.email_taken(email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        data.last_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: UserId::new(data.last_user_id),
            name: name.to_owned(),
            email: email.clone(),
            hearts: Hearts::new(),
            created_at: now,
            updated_at: now,
        };
        data.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
                reset: None,
            },
        );
        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.inner.read().await.users.get(&id).map(|u| u.user.clone()))
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let data = self.inner.read().await;
        Ok(data
            .users
            .values()
            .find(|u| u.user.email == *email)
            .map(|u| u.user.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let data = self.inner.read().await;
        Ok(data
            .users
            .values()
            .find(|u| u.user.email == *email)
            .map(|u| (u.user.clone(), u.password_hash.clone())))
    }

    async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        let mut data = self.inner.write().await;
        if data.email_taken(email, Some(id)) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let stored = data.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        name.clone_into(&mut stored.user.name);
        stored.user.email = email.clone();
        stored.user.updated_at = Utc::now();
        Ok(stored.user.clone())
    }

    async fn set_reset_token(
        &self,
        email: &Email,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut data = self.inner.write().await;
        let Some(stored) = data.user_by_email_mut(email) else {
            return Ok(false);
        };
        stored.reset = Some((token.to_owned(), expires_at));
        stored.user.updated_at = Utc::now();
        Ok(true)
    }

    async fn get_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let data = self.inner.read().await;
        Ok(data
            .users
            .values()
            .find(|u| {
                u.reset
                    .as_ref()
                    .is_some_and(|(t, expires)| t == token && *expires > now)
            })
            .map(|u| u.user.clone()))
    }

    async fn set_password(&self, id: UserId, password_hash: &str) -> Result<User, RepositoryError> {
        let mut data = self.inner.write().await;
        let stored = data.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(&mut stored.password_hash);
        stored.reset = None;
        stored.user.updated_at = Utc::now();
        Ok(stored.user.clone())
    }

    async fn toggle_heart(&self, id: UserId, store: StoreId) -> Result<User, RepositoryError> {
        let mut data = self.inner.write().await;
        let stored = data.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.user.hearts.toggle(store);
        stored.user.updated_at = Utc::now();
        Ok(stored.user.clone())
    }
}
