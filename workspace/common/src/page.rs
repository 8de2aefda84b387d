use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One page of a paginated list.
///
/// `next` and `previous` are page numbers (1-based), `null` at the ends.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Page<T> {
    /// Total number of items across all pages
    pub count: u64,
    pub next: Option<u64>,
    pub previous: Option<u64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: u64, page: u64, page_size: u64) -> Self {
        let pages = if page_size == 0 { 0 } else { count.div_ceil(page_size) };
        Self {
            count,
            next: (page < pages).then_some(page + 1),
            previous: (page > 1).then(|| page - 1),
            results,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_links() {
        let first = Page::new(vec![1, 2], 5, 1, 2);
        assert_eq!(first.next, Some(2));
        assert_eq!(first.previous, None);

        let middle = Page::new(vec![3, 4], 5, 2, 2);
        assert_eq!(middle.next, Some(3));
        assert_eq!(middle.previous, Some(1));

        let last = Page::new(vec![5], 5, 3, 2);
        assert_eq!(last.next, None);
        assert_eq!(last.previous, Some(2));
    }

    #[test]
    fn test_empty_page() {
        let page: Page<i32> = Page::new(vec![], 0, 1, 10);
        assert_eq!(page.count, 0);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
    }

    #[test]
    fn test_map_keeps_links() {
        let page = Page::new(vec![1, 2], 4, 1, 2).map(|n| n * 10);
        assert_eq!(page.results, vec![10, 20]);
        assert_eq!(page.next, Some(2));
    }
}
