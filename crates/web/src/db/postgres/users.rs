//! User repository backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use delicious_core::{Email, Hearts, StoreId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::db::UserRepository;
use crate::models::User;

/// Columns every user query selects, matching [`UserRow`].
macro_rules! user_columns {
    () => {
        "id, name, email, hearts, created_at, updated_at"
    };
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    hearts: Vec<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(r.id),
            name: r.name,
            email,
            hearts: r.hearts.into_iter().map(StoreId::new).collect::<Hearts>(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Repository for user database operations.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "INSERT INTO delicious.user (name, email, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING ",
            user_columns!()
        ))
        .bind(name)
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        row.try_into()
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM delicious.user WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM delicious.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(concat!(
            "SELECT ",
            user_columns!(),
            ", password_hash FROM delicious.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Ok((User::try_from(r.user)?, r.password_hash)))
            .transpose()
    }

    async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "UPDATE delicious.user SET name = $2, email = $3, updated_at = now() \
             WHERE id = $1 \
             RETURNING ",
            user_columns!()
        ))
        .bind(id.as_i32())
        .bind(name)
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn set_reset_token(
        &self,
        email: &Email,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE delicious.user
            SET reset_token = $2, reset_expires_at = $3, updated_at = now()
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM delicious.user WHERE reset_token = $1 AND reset_expires_at > $2"
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn set_password(&self, id: UserId, password_hash: &str) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "UPDATE delicious.user \
             SET password_hash = $2, reset_token = NULL, reset_expires_at = NULL, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING ",
            user_columns!()
        ))
        .bind(id.as_i32())
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn toggle_heart(&self, id: UserId, store: StoreId) -> Result<User, RepositoryError> {
        // One statement: concurrent toggles serialize on the row lock and each
        // re-evaluates the CASE against the latest hearts.
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "UPDATE delicious.user SET \
             hearts = CASE WHEN $2 = ANY(hearts) \
                 THEN array_remove(hearts, $2) \
                 ELSE array_append(hearts, $2) END, \
             updated_at = now() \
             WHERE id = $1 \
             RETURNING ",
            user_columns!()
        ))
        .bind(id.as_i32())
        .bind(store.as_i32())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }
}
