// ============================
// crates/client-lib/src/pagination.rs
// ============================
//! Client-side pagination over an already-fetched list.

/// Page size of the public diet listing
pub const PUBLIC_PAGE_SIZE: usize = 6;

/// One page of a list. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1 && self.page <= self.total_pages
    }
}

/// Cut page `page` out of `items`. An out-of-range page (including 0) is empty.
pub fn paginate<T>(items: Vec<T>, page: usize, size: usize) -> Page<T> {
    let total_items = items.len();
    if size == 0 {
        return Page {
            items: Vec::new(),
            page,
            total_pages: 0,
            total_items,
        };
    }

    let total_pages = total_items.div_ceil(size);
    let items = if page == 0 || page > total_pages {
        Vec::new()
    } else {
        items.into_iter().skip((page - 1) * size).take(size).collect()
    };

    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_of_six() {
        let items: Vec<u32> = (1..=14).collect();

        let first = paginate(items.clone(), 1, PUBLIC_PAGE_SIZE);
        assert_eq!(first.items, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next());
        assert!(!first.has_previous());

        let last = paginate(items, 3, PUBLIC_PAGE_SIZE);
        assert_eq!(last.items, vec![13, 14]);
        assert!(!last.has_next());
        assert!(last.has_previous());
    }

    #[test]
    fn test_out_of_range_is_empty() {
        let items: Vec<u32> = (1..=6).collect();
        assert_eq!(paginate(items.clone(), 1, 6).total_pages, 1);
        assert!(paginate(items.clone(), 2, 6).items.is_empty());
        assert!(paginate(items, 0, 6).items.is_empty());

        let empty = paginate(Vec::<u32>::new(), 1, 6);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.items.is_empty());
    }
}
