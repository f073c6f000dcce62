//! Review domain types.

use chrono::{DateTime, Utc};

use delicious_core::{Email, Rating, ReviewId, StoreId, UserId};

/// Who wrote a review, as shown next to it.
#[derive(Debug, Clone)]
pub struct ReviewAuthor {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

impl ReviewAuthor {
    #[must_use]
    pub fn gravatar(&self) -> String {
        self.email.gravatar_url(100)
    }
}

/// A review of a store.
#[derive(Debug, Clone)]
pub struct Review {
    pub id: ReviewId,
    pub store_id: StoreId,
    pub author: ReviewAuthor,
    pub text: String,
    pub rating: Rating,
    pub created: DateTime<Utc>,
}

impl Review {
    /// Filled and empty stars, e.g. `★★★☆☆` for a 3.
    #[must_use]
    pub fn stars(&self) -> String {
        let filled = usize::from(self.rating.get());
        let empty = usize::from(Rating::MAX).saturating_sub(filled);
        format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
    }
}

/// A validated review ready to insert.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub store_id: StoreId,
    pub author_id: UserId,
    pub text: String,
    pub rating: Rating,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stars() {
        let review = Review {
            id: ReviewId::new(1),
            store_id: StoreId::new(1),
            author: ReviewAuthor {
                id: UserId::new(1),
                name: "Wes".to_owned(),
                email: Email::parse("wes@example.com").unwrap(),
            },
            text: "Fine".to_owned(),
            rating: Rating::new(3).unwrap(),
            created: Utc::now(),
        };
        assert_eq!(review.stars(), "★★★☆☆");
    }
}
