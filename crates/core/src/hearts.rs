//! A user's set of favorite ("hearted") stores.

use serde::{Deserialize, Serialize};

use crate::types::StoreId;

/// Hearted store ids, without duplicates, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hearts(Vec<StoreId>);

impl Hearts {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Remove `store` if present, otherwise add it.
    ///
    /// Returns `true` when the store is hearted afterwards.
    pub fn toggle(&mut self, store: StoreId) -> bool {
        if let Some(pos) = self.0.iter().position(|s| *s == store) {
            self.0.remove(pos);
            false
        } else {
            self.0.push(store);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, store: StoreId) -> bool {
        self.0.contains(&store)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = StoreId> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[StoreId] {
        &self.0
    }
}

impl FromIterator<StoreId> for Hearts {
    fn from_iter<I: IntoIterator<Item = StoreId>>(iter: I) -> Self {
        let mut hearts = Self::new();
        for id in iter {
            if !hearts.contains(id) {
                hearts.0.push(id);
            }
        }
        hearts
    }
}

impl From<Hearts> for Vec<StoreId> {
    fn from(h: Hearts) -> Self {
        h.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_toggle_restores_state() {
        let mut hearts: Hearts = [StoreId::new(1), StoreId::new(2)].into_iter().collect();
        let before = hearts.clone();

        assert!(hearts.toggle(StoreId::new(3)));
        assert!(hearts.contains(StoreId::new(3)));
        assert!(!hearts.toggle(StoreId::new(3)));
        assert_eq!(hearts, before);
    }

    #[test]
    fn test_toggle_existing_removes() {
        let mut hearts: Hearts = [StoreId::new(7)].into_iter().collect();
        assert!(!hearts.toggle(StoreId::new(7)));
        assert!(hearts.is_empty());
    }

    #[test]
    fn test_collect_drops_duplicates() {
        let hearts: Hearts = [1, 2, 1, 3, 2].into_iter().map(StoreId::new).collect();
        assert_eq!(hearts.len(), 3);
        assert_eq!(
            hearts.iter().map(|s| s.as_i32()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_serializes_as_array() {
        let hearts: Hearts = [StoreId::new(4), StoreId::new(9)].into_iter().collect();
        assert_eq!(serde_json::to_string(&hearts).unwrap_or_default(), "[4,9]");
    }
}
