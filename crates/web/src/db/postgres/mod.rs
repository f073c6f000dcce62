//! `PostgreSQL` repositories.
//!
//! Queries are checked at runtime (`query_as` with `FromRow` rows) so the
//! crate builds without a live database.

mod reviews;
mod stores;
mod users;

pub use reviews::PgReviewRepository;
pub use stores::PgStoreRepository;
pub use users::PgUserRepository;

use super::RepositoryError;

/// Map a unique violation to [`RepositoryError::Conflict`].
fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Convert an unsigned count or offset for binding as `BIGINT`.
fn to_i64(value: impl TryInto<i64>) -> Result<i64, RepositoryError> {
    value
        .try_into()
        .map_err(|_| RepositoryError::DataCorruption("value exceeds BIGINT range".to_owned()))
}
