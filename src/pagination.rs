// Pagination Windowing
//
// Report listings are paged server-side: the store receives an offset and
// a limit, plus a separate exact count for the page indicator. Pages are
// 1-based and navigation clamps at both ends.

use serde::{Deserialize, Serialize};

/// Fixed page size of every report listing.
pub const PAGE_SIZE: usize = 8;

/// Offset/limit pair handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub offset: usize,
    pub limit: usize,
}

/// Window for a 1-based page. Page 0 is treated as page 1.
pub fn page_window(current_page: usize) -> PageWindow {
    let page = current_page.max(1);
    PageWindow {
        offset: (page - 1) * PAGE_SIZE,
        limit: PAGE_SIZE,
    }
}

/// `ceil(total_count / PAGE_SIZE)`. Zero rows means zero pages; callers
/// still may request page 1 and get an empty window back.
pub fn total_pages(total_count: usize) -> usize {
    total_count.div_ceil(PAGE_SIZE)
}

// ============================================================================
// PAGER
// ============================================================================

/// Navigation state for one listing. Changing page or resetting for a new
/// scope tells the caller to issue a fresh store query; the pager never
/// holds rows itself, so stale data cannot leak across scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    current_page: usize,
    total_count: usize,
}

impl Pager {
    pub fn new(total_count: usize) -> Self {
        Pager {
            current_page: 1,
            total_count,
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_count)
    }

    pub fn window(&self) -> PageWindow {
        page_window(self.current_page)
    }

    /// Advance one page; clamped to the last page. Returns true when the
    /// page changed and the caller must refetch.
    pub fn next(&mut self) -> bool {
        if self.current_page < self.total_pages() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    /// Go back one page; never below page 1.
    pub fn previous(&mut self) -> bool {
        if self.current_page > 1 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// New scope (different facilitator/zone/country filter): back to page
    /// 1 with the fresh count, discarding the old position entirely.
    pub fn reset(&mut self, total_count: usize) {
        self.current_page = 1;
        self.total_count = total_count;
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_offsets() {
        assert_eq!(page_window(1), PageWindow { offset: 0, limit: 8 });
        assert_eq!(page_window(2), PageWindow { offset: 8, limit: 8 });
        assert_eq!(page_window(5), PageWindow { offset: 32, limit: 8 });
        // Page 0 clamps to page 1
        assert_eq!(page_window(0), PageWindow { offset: 0, limit: 8 });
    }

    #[test]
    fn test_total_pages_ceil() {
        assert_eq!(total_pages(0), 0);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(8), 1);
        assert_eq!(total_pages(9), 2);
        assert_eq!(total_pages(16), 2);
        assert_eq!(total_pages(17), 3);
    }

    #[test]
    fn test_empty_listing_page_one_is_valid() {
        let pager = Pager::new(0);
        assert_eq!(pager.current_page(), 1);
        assert_eq!(pager.total_pages(), 0);
        assert_eq!(pager.window(), PageWindow { offset: 0, limit: 8 });
    }

    #[test]
    fn test_navigation_clamps() {
        let mut pager = Pager::new(20); // 3 pages

        assert!(!pager.previous());
        assert_eq!(pager.current_page(), 1);

        assert!(pager.next());
        assert!(pager.next());
        assert_eq!(pager.current_page(), 3);

        assert!(!pager.next());
        assert_eq!(pager.current_page(), 3);

        assert!(pager.previous());
        assert_eq!(pager.current_page(), 2);
    }

    #[test]
    fn test_reset_returns_to_page_one() {
        let mut pager = Pager::new(100);
        pager.next();
        pager.next();
        assert_eq!(pager.current_page(), 3);

        pager.reset(5);
        assert_eq!(pager.current_page(), 1);
        assert_eq!(pager.total_pages(), 1);
    }
}
