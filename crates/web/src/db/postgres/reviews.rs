//! Review repository backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use delicious_core::{Email, Rating, ReviewId, StoreId, UserId};

use super::RepositoryError;
use crate::db::ReviewRepository;
use crate::models::{NewReview, Review, ReviewAuthor};

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    store_id: i32,
    author_id: i32,
    author_name: String,
    author_email: String,
    text: String,
    rating: i16,
    created: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(r: ReviewRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.author_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let rating = Rating::new(i64::from(r.rating)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rating for review {}: {e}", r.id))
        })?;

        Ok(Self {
            id: ReviewId::new(r.id),
            store_id: StoreId::new(r.store_id),
            author: ReviewAuthor {
                id: UserId::new(r.author_id),
                name: r.author_name,
                email,
            },
            text: r.text,
            rating,
            created: r.created,
        })
    }
}

/// Repository for review database operations.
#[derive(Clone)]
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn insert(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            WITH inserted AS (
                INSERT INTO delicious.review (store_id, author_id, text, rating)
                VALUES ($1, $2, $3, $4)
                RETURNING id, store_id, author_id, text, rating, created
            )
            SELECT i.id, i.store_id, i.author_id,
                   u.name AS author_name, u.email AS author_email,
                   i.text, i.rating, i.created
            FROM inserted i
            JOIN delicious.user u ON u.id = i.author_id
            ",
        )
        .bind(review.store_id.as_i32())
        .bind(review.author_id.as_i32())
        .bind(&review.text)
        .bind(i16::from(review.rating.get()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }

    async fn for_stores(&self, ids: &[StoreId]) -> Result<Vec<Review>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = ids.iter().map(StoreId::as_i32).collect();

        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT r.id, r.store_id, r.author_id,
                   u.name AS author_name, u.email AS author_email,
                   r.text, r.rating, r.created
            FROM delicious.review r
            JOIN delicious.user u ON u.id = r.author_id
            WHERE r.store_id = ANY($1)
            ORDER BY r.created DESC, r.id DESC
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Review::try_from).collect()
    }
}
