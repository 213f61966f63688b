//! Page slicing over the id-ordered employee list.
//!
//! Pages are 1-based. Nothing here checks the page against the total: a page
//! past the end simply maps to an offset with no rows behind it.

/// Number of pages needed for `total_count` rows, `ceil(total / page_size)`.
///
/// A zero page size yields zero pages.
pub fn count_pages(total_count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_count.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Row offset of a 1-based page. Page 0 is clamped to offset 0.
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(page_size)
}

/// Everything a caller needs to fetch and render one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub offset: u64,
    pub limit: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageWindow {
    /// Compute the window for `page` given the total row count.
    pub fn new(page: u32, page_size: u32, total_count: u64) -> Self {
        let total_pages = count_pages(total_count, page_size);
        Self {
            page,
            page_size,
            total_pages,
            offset: page_offset(page, page_size),
            limit: page_size,
            has_prev: page > 1,
            has_next: page < total_pages,
        }
    }

    /// Page number behind the "previous" button, if shown.
    pub fn prev_page(&self) -> Option<u32> {
        self.has_prev.then(|| self.page - 1)
    }

    /// Page number behind the "next" button, if shown.
    pub fn next_page(&self) -> Option<u32> {
        self.has_next.then(|| self.page + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn count_pages_rounds_up() {
        assert_eq!(count_pages(0, 5), 0);
        assert_eq!(count_pages(1, 5), 1);
        assert_eq!(count_pages(5, 5), 1);
        assert_eq!(count_pages(6, 5), 2);
        assert_eq!(count_pages(11, 5), 3);
    }

    #[test]
    fn zero_page_size_has_no_pages() {
        assert_eq!(count_pages(10, 0), 0);
        let w = PageWindow::new(1, 0, 10);
        assert_eq!(w.total_pages, 0);
        assert!(!w.has_next);
    }

    #[test]
    fn offsets_are_one_based() {
        assert_eq!(page_offset(1, 5), 0);
        assert_eq!(page_offset(2, 5), 5);
        assert_eq!(page_offset(3, 5), 10);
    }

    #[test]
    fn page_zero_clamps_to_first_offset() {
        assert_eq!(page_offset(0, 5), 0);
        let w = PageWindow::new(0, 5, 12);
        assert!(!w.has_prev);
        assert!(w.has_next);
    }

    #[test]
    fn first_middle_last_navigation() {
        let first = PageWindow::new(1, 5, 12);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.prev_page(), None);
        assert_eq!(first.next_page(), Some(2));

        let middle = PageWindow::new(2, 5, 12);
        assert_eq!(middle.prev_page(), Some(1));
        assert_eq!(middle.next_page(), Some(3));

        let last = PageWindow::new(3, 5, 12);
        assert_eq!(last.prev_page(), Some(2));
        assert_eq!(last.next_page(), None);
    }

    #[test]
    fn past_the_end_is_not_an_error() {
        let w = PageWindow::new(9, 5, 12);
        assert_eq!(w.offset, 40);
        assert!(w.has_prev);
        assert!(!w.has_next);
    }

    #[test]
    fn empty_directory_single_page_has_no_navigation() {
        let w = PageWindow::new(1, 5, 0);
        assert_eq!(w.total_pages, 0);
        assert!(!w.has_prev);
        assert!(!w.has_next);
    }

    proptest! {
        #[test]
        fn windows_tile_the_whole_collection(total in 0u64..500, size in 1u32..40) {
            let pages = count_pages(total, size);
            prop_assert_eq!(u64::from(pages), total.div_ceil(u64::from(size)));

            let mut covered = 0u64;
            for page in 1..=pages {
                let w = PageWindow::new(page, size, total);
                prop_assert_eq!(w.offset, covered);
                let rows = (total - w.offset).min(u64::from(w.limit));
                prop_assert!(rows <= u64::from(size));
                prop_assert!(rows > 0);
                covered += rows;
            }
            prop_assert_eq!(covered, total);
        }

        #[test]
        fn navigation_flags_follow_bounds(page in 0u32..60, total in 0u64..500, size in 1u32..40) {
            let w = PageWindow::new(page, size, total);
            prop_assert_eq!(w.has_prev, page > 1);
            prop_assert_eq!(w.has_next, page < w.total_pages);
        }
    }
}
