//! Pagination types and utilities for database queries.
//!
//! Every list in the portal shows [`DEFAULT_PAGE_SIZE`] items per page. Page
//! numbers are 1-based, garbage input means page 1, and pages past the end are
//! clamped to the last page once the total is known.

use serde::{Deserialize, Serialize};

/// Number of items per page on every list.
pub const DEFAULT_PAGE_SIZE: u32 = 3;

/// Maximum allowed items per page.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination options for database queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed).
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Creates a new Pagination, clamping `page` to at least 1 and `per_page`
    /// to `[1, MAX_PAGE_SIZE]`.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Creates a Pagination for the given page with the default page size.
    pub fn page(page: u32) -> Self {
        Self::new(page, DEFAULT_PAGE_SIZE)
    }

    /// Parses a raw `?page=` value. Missing, empty or unparsable values mean page 1.
    pub fn from_param(raw: Option<&str>) -> Self {
        let page = raw
            .map(str::trim)
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(1);
        Self::page(page)
    }

    /// Calculate SQL offset based on page and per_page.
    pub fn offset(&self) -> u32 {
        (self.page.saturating_sub(1)) * self.per_page
    }

    /// Get limit (per_page).
    pub fn limit(&self) -> u32 {
        self.per_page
    }

    /// Calculate total pages from a total item count. An empty list has one page.
    pub fn total_pages(&self, total_items: u64) -> u32 {
        if total_items == 0 {
            return 1;
        }
        total_items.div_ceil(self.per_page as u64) as u32
    }

    /// Returns a copy whose page does not exceed the last page for `total_items`.
    pub fn clamped(&self, total_items: u64) -> Self {
        Self {
            page: self.page.min(self.total_pages(total_items)),
            per_page: self.per_page,
        }
    }
}

/// A paginated result containing items and pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    /// The items on the current page.
    pub items: Vec<T>,
    /// Total number of items matching the query (across all pages).
    pub total: u64,
    /// Current page number (1-indexed).
    pub page: u32,
    /// Number of items per page.
    pub per_page: u32,
    /// Total number of pages.
    pub total_pages: u32,
}

impl<T> PaginatedResult<T> {
    /// Creates a new PaginatedResult.
    pub fn new(items: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            per_page: pagination.per_page,
            total_pages: pagination.total_pages(total),
        }
    }

    /// Returns true if there are no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items on the current page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there is a next page.
    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }

    /// Returns true if there is a previous page.
    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    /// Next page number, if any.
    pub fn next_page(&self) -> Option<u32> {
        self.has_next_page().then(|| self.page + 1)
    }

    /// Previous page number, if any.
    pub fn previous_page(&self) -> Option<u32> {
        self.has_previous_page().then(|| self.page - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_default() {
        let p = Pagination::default();
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 3);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 3);
    }

    #[test]
    fn test_pagination_offset() {
        let p = Pagination::page(3);
        assert_eq!(p.offset(), 6);
    }

    #[test]
    fn test_pagination_clamps_values() {
        assert_eq!(Pagination::new(0, 3).page, 1);
        assert_eq!(Pagination::new(1, 500).per_page, MAX_PAGE_SIZE);
        assert_eq!(Pagination::new(1, 0).per_page, 1);
    }

    #[test]
    fn test_from_param_falls_back_to_first_page() {
        assert_eq!(Pagination::from_param(None).page, 1);
        assert_eq!(Pagination::from_param(Some("")).page, 1);
        assert_eq!(Pagination::from_param(Some("abc")).page, 1);
        assert_eq!(Pagination::from_param(Some("-2")).page, 1);
        assert_eq!(Pagination::from_param(Some("0")).page, 1);
        assert_eq!(Pagination::from_param(Some(" 2 ")).page, 2);
    }

    #[test]
    fn test_total_pages() {
        let p = Pagination::default();
        assert_eq!(p.total_pages(0), 1);
        assert_eq!(p.total_pages(3), 1);
        assert_eq!(p.total_pages(4), 2);
        assert_eq!(p.total_pages(9), 3);
        assert_eq!(p.total_pages(10), 4);
    }

    #[test]
    fn test_clamped_to_last_page() {
        let p = Pagination::page(99);
        assert_eq!(p.clamped(7).page, 3);
        assert_eq!(p.clamped(0).page, 1);
        assert_eq!(Pagination::page(2).clamped(7).page, 2);
    }

    #[test]
    fn test_paginated_result_navigation() {
        let result = PaginatedResult::new(vec![4, 5, 6], 7, &Pagination::page(2));
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.next_page(), Some(3));
        assert_eq!(result.previous_page(), Some(1));

        let last = PaginatedResult::new(vec![7], 7, &Pagination::page(3));
        assert!(!last.has_next_page());
        assert_eq!(last.next_page(), None);
    }

    #[test]
    fn test_paginated_result_empty() {
        let result: PaginatedResult<i32> = PaginatedResult::new(vec![], 0, &Pagination::default());
        assert!(result.is_empty());
        assert_eq!(result.total_pages, 1);
        assert!(!result.has_next_page());
        assert!(!result.has_previous_page());
    }
}
