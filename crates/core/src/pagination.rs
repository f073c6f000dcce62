//! Page arithmetic for the store listing.

use serde::Serialize;

/// Stores shown per listing page.
pub const STORES_PER_PAGE: u64 = 6;

/// A resolved listing page.
///
/// Requests past the last page are clamped to it and flagged, so the view
/// can tell the user where they ended up instead of rendering nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    /// 1-based page number actually served.
    pub number: u64,
    /// Total number of pages, at least 1.
    pub pages: u64,
    pub per_page: u64,
    pub total: u64,
    /// The requested page was past the end.
    pub clamped: bool,
}

impl Page {
    /// Resolve a requested page against a collection of `total` items.
    ///
    /// Page 0 counts as page 1. A zero `per_page` is treated as 1.
    #[must_use]
    pub fn resolve(requested: u64, total: u64, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let pages = total.div_ceil(per_page).max(1);
        let requested = requested.max(1);
        let clamped = total > 0 && requested > pages;

        Self {
            number: requested.min(pages),
            pages,
            per_page,
            total,
            clamped,
        }
    }

    /// Number of items to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.per_page
    }

    #[must_use]
    pub const fn previous(&self) -> Option<u64> {
        if self.number > 1 { Some(self.number - 1) } else { None }
    }

    #[must_use]
    pub const fn next(&self) -> Option<u64> {
        if self.number < self.pages { Some(self.number + 1) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_past_end_clamps_to_last() {
        // 15 stores at 6 per page is 3 pages
        let page = Page::resolve(99, 15, STORES_PER_PAGE);
        assert_eq!(page.number, 3);
        assert_eq!(page.pages, 3);
        assert!(page.clamped);
        assert_eq!(page.offset(), 12);
        assert_eq!(page.next(), None);
        assert_eq!(page.previous(), Some(2));
    }

    #[test]
    fn test_page_zero_is_first() {
        let page = Page::resolve(0, 15, STORES_PER_PAGE);
        assert_eq!(page.number, 1);
        assert!(!page.clamped);
        assert_eq!(page.offset(), 0);
        assert_eq!(page.previous(), None);
        assert_eq!(page.next(), Some(2));
    }

    #[test]
    fn test_empty_collection_has_one_unclamped_page() {
        let page = Page::resolve(4, 0, STORES_PER_PAGE);
        assert_eq!(page.number, 1);
        assert_eq!(page.pages, 1);
        assert!(!page.clamped);
    }

    #[test]
    fn test_exact_multiple() {
        let page = Page::resolve(2, 12, STORES_PER_PAGE);
        assert_eq!(page.pages, 2);
        assert_eq!(page.number, 2);
        assert_eq!(page.offset(), 6);
        assert!(!page.clamped);
    }
}
