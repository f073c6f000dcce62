//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use delicious_core::{Email, Hearts, UserId};

/// Avatar size used in the navigation bar.
pub const AVATAR_SIZE: u32 = 200;

/// A registered user (domain type).
///
/// Serializes as the JSON returned by the heart toggle; the password hash and
/// reset token never leave the repository layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalized email address.
    pub email: Email,
    /// Hearted stores.
    pub hearts: Hearts,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Gravatar image URL for this user's email.
    #[must_use]
    pub fn gravatar(&self) -> String {
        self.email.gravatar_url(AVATAR_SIZE)
    }
}
