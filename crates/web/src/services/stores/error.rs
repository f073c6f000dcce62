//! Store service error types.

use thiserror::Error;

use delicious_core::{GeoError, RatingError, SlugError};

use crate::db::RepositoryError;

/// Errors that can occur during store, review and heart operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store name left blank.
    #[error("please enter a store name")]
    MissingName,

    /// Address left blank.
    #[error("you must supply an address")]
    MissingAddress,

    /// Review without text.
    #[error("your review needs some text")]
    MissingReviewText,

    /// Review without a rating.
    #[error("please pick a rating")]
    MissingRating,

    /// The name has nothing to build a slug from.
    #[error("invalid store name: {0}")]
    InvalidName(#[from] SlugError),

    /// Coordinates are missing, not numbers or out of range.
    #[error("invalid location: {0}")]
    InvalidLocation(#[from] GeoError),

    /// Rating outside 1..=5.
    #[error("invalid rating: {0}")]
    InvalidRating(#[from] RatingError),

    /// Store does not exist.
    #[error("store not found")]
    NotFound,

    /// Editor is not the store's author.
    #[error("you must own a store in order to edit it")]
    OwnershipViolation,

    /// Every slug attempt lost a race with a concurrent writer.
    #[error("could not reserve a unique slug")]
    SlugConflict,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl StoreError {
    /// Whether the caller sent bad input, as opposed to a lookup or server failure.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::MissingName
                | Self::MissingAddress
                | Self::MissingReviewText
                | Self::MissingRating
                | Self::InvalidName(_)
                | Self::InvalidLocation(_)
                | Self::InvalidRating(_)
        )
    }
}
