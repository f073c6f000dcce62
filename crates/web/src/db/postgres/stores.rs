//! Store repository backed by `PostgreSQL` and `PostGIS`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use delicious_core::{GeoPoint, Location, Slug, StoreId, TagCount, UserId};

use super::{RepositoryError, conflict_on_unique, to_i64};
use crate::db::StoreRepository;
use crate::models::{NearbyStore, NewStore, Store, StoreUpdate, TopStore};

/// Columns every store query selects, matching [`StoreRow`].
macro_rules! store_columns {
    () => {
        "id, name, slug, description, tags, created, \
         ST_X(location::geometry) AS lng, ST_Y(location::geometry) AS lat, \
         address, photo, author_id"
    };
}

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: i32,
    name: String,
    slug: String,
    description: Option<String>,
    tags: Vec<String>,
    created: DateTime<Utc>,
    lng: f64,
    lat: f64,
    address: String,
    photo: Option<String>,
    author_id: i32,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(r: StoreRow) -> Result<Self, Self::Error> {
        let coordinates = GeoPoint::new(r.lng, r.lat).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid location for store {}: {e}", r.id))
        })?;

        Ok(Self {
            id: StoreId::new(r.id),
            name: r.name,
            slug: Slug::from_stored(r.slug),
            description: r.description,
            tags: r.tags,
            created: r.created,
            location: Location {
                coordinates,
                address: r.address,
            },
            photo: r.photo,
            author_id: UserId::new(r.author_id),
        })
    }
}

fn into_stores(rows: Vec<StoreRow>) -> Result<Vec<Store>, RepositoryError> {
    rows.into_iter().map(Store::try_from).collect()
}

#[derive(sqlx::FromRow)]
struct TopStoreRow {
    id: i32,
    slug: String,
    name: String,
    photo: Option<String>,
    average_rating: f64,
    review_count: i64,
}

/// Repository for store database operations.
#[derive(Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreRepository for PgStoreRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn slugs_matching(&self, pattern: &str) -> Result<Vec<String>, RepositoryError> {
        let slugs = sqlx::query_scalar::<_, String>(
            "SELECT slug FROM delicious.store WHERE slug ~* $1",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(slugs)
    }

    async fn insert(&self, store: &NewStore) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(concat!(
            "INSERT INTO delicious.store \
             (name, slug, description, tags, location, address, photo, author_id) \
             VALUES ($1, $2, $3, $4, ST_SetSRID(ST_MakePoint($5, $6), 4326)::geography, $7, $8, $9) \
             RETURNING ",
            store_columns!()
        ))
        .bind(&store.name)
        .bind(store.slug.as_str())
        .bind(store.description.as_deref())
        .bind(&store.tags)
        .bind(store.location.coordinates.lng())
        .bind(store.location.coordinates.lat())
        .bind(&store.location.address)
        .bind(store.photo.as_deref())
        .bind(store.author_id.as_i32())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "slug"))?;

        row.try_into()
    }

    async fn update(&self, id: StoreId, update: &StoreUpdate) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(concat!(
            "UPDATE delicious.store SET \
             name = $2, slug = $3, description = $4, tags = $5, \
             location = ST_SetSRID(ST_MakePoint($6, $7), 4326)::geography, \
             address = $8, photo = COALESCE($9, photo) \
             WHERE id = $1 \
             RETURNING ",
            store_columns!()
        ))
        .bind(id.as_i32())
        .bind(&update.name)
        .bind(update.slug.as_str())
        .bind(update.description.as_deref())
        .bind(&update.tags)
        .bind(update.location.coordinates.lng())
        .bind(update.location.coordinates.lat())
        .bind(&update.location.address)
        .bind(update.photo.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "slug"))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(concat!(
            "SELECT ",
            store_columns!(),
            " FROM delicious.store WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(concat!(
            "SELECT ",
            store_columns!(),
            " FROM delicious.store WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(concat!(
            "SELECT ",
            store_columns!(),
            " FROM delicious.store ORDER BY created DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(to_i64(limit)?)
        .bind(to_i64(offset)?)
        .fetch_all(&self.pool)
        .await?;

        into_stores(rows)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM delicious.store")
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative count {count}")))
    }

    async fn get_many(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = ids.iter().map(StoreId::as_i32).collect();

        let rows = sqlx::query_as::<_, StoreRow>(concat!(
            "SELECT ",
            store_columns!(),
            " FROM delicious.store WHERE id = ANY($1) ORDER BY created DESC, id DESC"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        into_stores(rows)
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r"
            SELECT tag, COUNT(DISTINCT s.id) AS count
            FROM delicious.store s, unnest(s.tags) AS tag
            GROUP BY tag
            ORDER BY count DESC, tag ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(tag, count)| {
                let count = u64::try_from(count).map_err(|_| {
                    RepositoryError::DataCorruption(format!("negative count for tag {tag}"))
                })?;
                Ok(TagCount { tag, count })
            })
            .collect()
    }

    async fn by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let rows = match tag {
            Some(tag) => {
                sqlx::query_as::<_, StoreRow>(concat!(
                    "SELECT ",
                    store_columns!(),
                    " FROM delicious.store WHERE $1 = ANY(tags) ORDER BY created DESC, id DESC"
                ))
                .bind(tag)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, StoreRow>(concat!(
                    "SELECT ",
                    store_columns!(),
                    " FROM delicious.store WHERE cardinality(tags) > 0 \
                     ORDER BY created DESC, id DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        into_stores(rows)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Store>, RepositoryError> {
        // plainto_tsquery ANDs its terms; any single term should match
        let rows = sqlx::query_as::<_, StoreRow>(concat!(
            "WITH q AS ( \
                SELECT replace(plainto_tsquery('english', $1)::text, '&', '|')::tsquery AS query \
             ) \
             SELECT ",
            store_columns!(),
            " FROM delicious.store, q \
             WHERE search_vector @@ q.query \
             ORDER BY ts_rank(search_vector, q.query) DESC, id ASC \
             LIMIT $2"
        ))
        .bind(query)
        .bind(to_i64(limit)?)
        .fetch_all(&self.pool)
        .await?;

        into_stores(rows)
    }

    async fn near(
        &self,
        center: GeoPoint,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(concat!(
            "WITH c AS ( \
                SELECT ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography AS point \
             ) \
             SELECT ",
            store_columns!(),
            " FROM delicious.store, c \
             WHERE ST_DWithin(location, c.point, $3) \
             ORDER BY location <-> c.point \
             LIMIT $4"
        ))
        .bind(center.lng())
        .bind(center.lat())
        .bind(radius_m)
        .bind(to_i64(limit)?)
        .fetch_all(&self.pool)
        .await?;

        Ok(into_stores(rows)?.into_iter().map(NearbyStore::from).collect())
    }

    async fn top_rated(
        &self,
        min_reviews: usize,
        limit: usize,
    ) -> Result<Vec<TopStore>, RepositoryError> {
        let rows = sqlx::query_as::<_, TopStoreRow>(
            r"
            SELECT s.id, s.slug, s.name, s.photo,
                   AVG(r.rating)::float8 AS average_rating,
                   COUNT(r.id) AS review_count
            FROM delicious.store s
            LEFT JOIN delicious.review r ON r.store_id = s.id
            GROUP BY s.id
            HAVING COUNT(r.id) >= $1
            ORDER BY average_rating DESC, s.id ASC
            LIMIT $2
            ",
        )
        .bind(to_i64(min_reviews)?)
        .bind(to_i64(limit)?)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TopStore {
                id: StoreId::new(r.id),
                slug: Slug::from_stored(r.slug),
                name: r.name,
                photo: r.photo,
                average_rating: r.average_rating,
                review_count: r.review_count,
            })
            .collect())
    }
}
