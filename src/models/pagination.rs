//! Pagination types

use serde::{Deserialize, Serialize};

/// Page request for list queries (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Build params from a raw `?page=` query value.
    ///
    /// A missing or non-integer value selects the first page. Any integer
    /// outside `1..=u32::MAX` is out of range and becomes `u32::MAX`, which
    /// [`ListParams::clamped_to`] turns into the last page.
    pub fn from_query(page: Option<&str>, per_page: u32) -> Self {
        let page = match page.map(|raw| raw.trim().parse::<i64>()) {
            None | Some(Err(_)) => 1,
            Some(Ok(n)) => u32::try_from(n).ok().filter(|p| *p >= 1).unwrap_or(u32::MAX),
        };
        Self::new(page, per_page)
    }

    /// Row offset for the current page
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    /// The same request moved onto a page that exists for `total` items.
    ///
    /// A page past the end becomes the last page; an empty result has one
    /// (empty) page.
    pub fn clamped_to(&self, total: i64) -> Self {
        let last = total_pages(total, self.per_page).max(1);
        Self {
            page: self.page.clamp(1, last),
            per_page: self.per_page,
        }
    }
}

fn total_pages(total: i64, per_page: u32) -> u32 {
    if per_page == 0 || total <= 0 {
        return 0;
    }
    let per_page = per_page as i64;
    ((total + per_page - 1) / per_page) as u32
}

/// One page of results plus the total across all pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn total_pages(&self) -> u32 {
        total_pages(self.total, self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn next_page(&self) -> Option<u32> {
        self.has_next().then(|| self.page + 1)
    }

    pub fn prev_page(&self) -> Option<u32> {
        self.has_prev().then(|| self.page - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Navigation data for the `pagination.html` template
    pub fn page_info(&self) -> PageInfo {
        PageInfo {
            number: self.page,
            num_pages: self.total_pages().max(1),
            has_next: self.has_next(),
            has_previous: self.has_prev(),
            next_page_number: self.next_page(),
            previous_page_number: self.prev_page(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub number: u32,
    pub num_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u32>,
    pub previous_page_number: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_query_non_integer_gives_first_page() {
        assert_eq!(ListParams::from_query(Some("abc"), 3).page, 1);
        assert_eq!(ListParams::from_query(Some(""), 3).page, 1);
        assert_eq!(ListParams::from_query(Some("1.5"), 3).page, 1);
        assert_eq!(ListParams::from_query(None, 3).page, 1);
        assert_eq!(ListParams::from_query(Some("4"), 3).page, 4);
    }

    #[test]
    fn test_from_query_out_of_range_integer_gives_last_page() {
        for raw in ["0", "-1", "-2", "99", "4294967296", "99999999999"] {
            let params = ListParams::from_query(Some(raw), 3).clamped_to(5);
            assert_eq!(params.page, 2, "page={}", raw);
        }
        assert_eq!(ListParams::from_query(Some("0"), 3).clamped_to(0).page, 1);
    }

    #[test]
    fn test_clamped_to_last_page() {
        let params = ListParams::new(9, 3);
        assert_eq!(params.clamped_to(7).page, 3);
        assert_eq!(params.clamped_to(0).page, 1);
        assert_eq!(ListParams::new(2, 3).clamped_to(7).page, 2);
    }

    #[test]
    fn test_offset_and_limit() {
        let params = ListParams::new(3, 10);
        assert_eq!(params.offset(), 20);
        assert_eq!(params.limit(), 10);
    }

    #[test]
    fn test_paged_result_navigation() {
        let result = PagedResult::new(vec![1, 2, 3], 7, &ListParams::new(2, 3));
        assert_eq!(result.total_pages(), 3);
        assert_eq!(result.next_page(), Some(3));
        assert_eq!(result.prev_page(), Some(1));

        let info = result.page_info();
        assert_eq!(info.number, 2);
        assert_eq!(info.num_pages, 3);
        assert!(info.has_next && info.has_previous);
    }

    #[test]
    fn test_empty_result_is_one_page() {
        let result: PagedResult<i32> = PagedResult::new(vec![], 0, &ListParams::new(1, 3));
        let info = result.page_info();
        assert_eq!(info.number, 1);
        assert_eq!(info.num_pages, 1);
        assert!(!info.has_next);
        assert!(!info.has_previous);
    }

    proptest! {
        #[test]
        fn clamped_page_is_always_valid(page in 1u32..1000, per_page in 1u32..50, total in 0i64..5000) {
            let clamped = ListParams::new(page, per_page).clamped_to(total);
            let result: PagedResult<()> = PagedResult::new(vec![], total, &clamped);
            prop_assert!(clamped.page >= 1);
            prop_assert!(clamped.page <= result.total_pages().max(1));
            prop_assert!(clamped.offset() <= total.max(0));
        }

        #[test]
        fn pages_cover_all_items(total in 0i64..5000, per_page in 1u32..50) {
            let result: PagedResult<()> = PagedResult::new(vec![], total, &ListParams::new(1, per_page));
            let pages = result.total_pages() as i64;
            prop_assert!(pages * per_page as i64 >= total);
            prop_assert!((pages - 1).max(0) * (per_page as i64) < total.max(1));
        }
    }
}
