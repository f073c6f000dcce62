//! Review ratings and the "top stores" ranking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stores need at least this many reviews to be ranked.
pub const MIN_REVIEWS_FOR_RANKING: usize = 2;

/// Size of the top stores list.
pub const TOP_STORES_LIMIT: usize = 5;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    #[error("rating must be between {min} and {max}, got {got}")]
    OutOfRange { min: u8, max: u8, got: i64 },
}

/// A star rating from 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] outside 1..=5.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                got: value,
            })
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> Self {
        r.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Average rating of one store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary<K> {
    pub key: K,
    pub average: f64,
    pub count: usize,
}

/// Rank stores by mean rating.
///
/// `reviews` is the flattened store-review join as `(store key, rating)`
/// pairs; stores without reviews simply contribute no pairs. Stores with
/// fewer than `min_reviews` reviews are dropped, the rest are sorted by
/// average descending with ties broken by key ascending, then truncated to
/// `limit`.
pub fn rank_by_average<K, I>(reviews: I, min_reviews: usize, limit: usize) -> Vec<RatingSummary<K>>
where
    K: Ord + Copy,
    I: IntoIterator<Item = (K, Rating)>,
{
    let mut totals: BTreeMap<K, (u64, usize)> = BTreeMap::new();
    for (key, rating) in reviews {
        let entry = totals.entry(key).or_insert((0, 0));
        entry.0 += u64::from(rating.get());
        entry.1 += 1;
    }

    let mut ranked: Vec<RatingSummary<K>> = totals
        .into_iter()
        .filter(|(_, (_, n))| *n >= min_reviews)
        .map(|(key, (sum, n))| RatingSummary {
            key,
            average: mean(sum, n),
            count: n,
        })
        .collect();

    ranked.sort_by(|a, b| b.average.total_cmp(&a.average).then(a.key.cmp(&b.key)));
    ranked.truncate(limit);
    ranked
}

#[allow(clippy::cast_precision_loss)] // review counts stay far below 2^52
fn mean(sum: u64, n: usize) -> f64 {
    sum as f64 / n as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn r(v: i64) -> Rating {
        Rating::new(v).unwrap()
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-3).is_err());
        assert_eq!(Rating::new(5).unwrap().get(), 5);
        assert!(serde_json::from_str::<Rating>("9").is_err());
        assert_eq!(serde_json::from_str::<Rating>("4").unwrap(), r(4));
    }

    #[test]
    fn test_single_review_store_is_excluded() {
        let reviews = vec![(1, r(5)), (2, r(3)), (2, r(5))];
        let ranked = rank_by_average(reviews, MIN_REVIEWS_FOR_RANKING, TOP_STORES_LIMIT);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].key, 2);
        assert!((ranked[0].average - 4.0).abs() < f64::EPSILON);
        assert_eq!(ranked[0].count, 2);
    }

    #[test]
    fn test_results_capped_and_sorted() {
        let mut reviews = Vec::new();
        for store in 1..=8 {
            let score = if store % 2 == 0 { 5 } else { 2 };
            reviews.push((store, r(score)));
            reviews.push((store, r(4)));
        }

        let ranked = rank_by_average(reviews, MIN_REVIEWS_FOR_RANKING, TOP_STORES_LIMIT);
        assert_eq!(ranked.len(), TOP_STORES_LIMIT);
        assert!(ranked.windows(2).all(|w| w[0].average >= w[1].average));
        // Ties at 4.5 resolve by key ascending
        let keys: Vec<i32> = ranked.iter().map(|s| s.key).collect();
        assert_eq!(keys, vec![2, 4, 6, 8, 1]);
    }

    #[test]
    fn test_no_reviews_no_results() {
        let ranked = rank_by_average(Vec::<(i32, Rating)>::new(), 2, 5);
        assert!(ranked.is_empty());
    }
}
