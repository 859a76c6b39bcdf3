use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("Page not found")]
    OutOfRange,
}

/// Splits `count` items into pages of `per_page`.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: u64,
    per_page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: u32,
    pub num_pages: u32,
    pub count: u64,
    #[serde(skip)]
    pub offset: u64,
    #[serde(skip)]
    pub limit: u32,
}

impl Paginator {
    pub fn new(count: u64, per_page: u32) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    /// Number of pages; an empty collection still has one (empty) page.
    pub fn num_pages(&self) -> u32 {
        let per_page = u64::from(self.per_page);
        let pages = self.count.div_ceil(per_page).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn page(&self, number: u32) -> Result<Page, PageError> {
        let num_pages = self.num_pages();
        if number < 1 || number > num_pages {
            return Err(PageError::OutOfRange);
        }
        Ok(Page {
            number,
            num_pages,
            count: self.count,
            offset: u64::from(number - 1) * u64::from(self.per_page),
            limit: self.per_page,
        })
    }
}

impl Page {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page(&self) -> Option<u32> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn previous_page(&self) -> Option<u32> {
        self.has_previous().then(|| self.number - 1)
    }
}

/// `?page=` values that are missing or not a number fall back to page 1.
/// Numbers that parse but are out of range are left for `Paginator::page`
/// to reject.
pub fn parse_page_param(raw: Option<&str>) -> u32 {
    match raw.map(str::trim) {
        None | Some("") => 1,
        Some(s) => match s.parse::<i64>() {
            Ok(n) if n < 1 => 0,
            Ok(n) => u32::try_from(n).unwrap_or(u32::MAX),
            Err(_) => 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_is_ceiling_of_items_over_size() {
        assert_eq!(Paginator::new(1, 10).num_pages(), 1);
        assert_eq!(Paginator::new(10, 10).num_pages(), 1);
        assert_eq!(Paginator::new(11, 10).num_pages(), 2);
        assert_eq!(Paginator::new(25, 10).num_pages(), 3);
        assert_eq!(Paginator::new(100, 10).num_pages(), 10);
    }

    #[test]
    fn empty_collection_has_one_empty_page() {
        let paginator = Paginator::new(0, 10);
        assert_eq!(paginator.num_pages(), 1);
        let page = paginator.page(1).unwrap();
        assert_eq!(page.offset, 0);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn out_of_range_pages_are_rejected() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.page(0), Err(PageError::OutOfRange));
        assert_eq!(paginator.page(4), Err(PageError::OutOfRange));
        assert!(paginator.page(3).is_ok());
    }

    #[test]
    fn middle_page_links_both_ways() {
        let page = Paginator::new(25, 10).page(2).unwrap();
        assert_eq!(page.offset, 10);
        assert_eq!(page.limit, 10);
        assert_eq!(page.next_page(), Some(3));
        assert_eq!(page.previous_page(), Some(1));
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Paginator::new(25, 10).page(3).unwrap();
        assert_eq!(page.next_page(), None);
        assert_eq!(page.previous_page(), Some(2));
    }

    #[test]
    fn page_param_parsing() {
        assert_eq!(parse_page_param(None), 1);
        assert_eq!(parse_page_param(Some("")), 1);
        assert_eq!(parse_page_param(Some("abc")), 1);
        assert_eq!(parse_page_param(Some("3")), 3);
        assert_eq!(parse_page_param(Some("0")), 0);
        assert_eq!(parse_page_param(Some("-2")), 0);
    }
}
