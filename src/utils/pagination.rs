const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// Page request, 1-based. Out-of-range values are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_num: i64,
    pub page_size: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_num: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page_num: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page_num: page_num.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page_num - 1) * self.page_size
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

/// One page of rows plus the total row count for the same filter
#[derive(Debug)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let page = Pagination::new(None, None);
        assert_eq!(page, Pagination::default());
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 10);
    }

    #[test]
    fn offset_from_page_number() {
        let page = Pagination::new(Some(3), Some(20));
        assert_eq!(page.offset(), 40);
        assert_eq!(page.limit(), 20);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let page = Pagination::new(Some(0), Some(0));
        assert_eq!(page.page_num, 1);
        assert_eq!(page.page_size, 1);

        let page = Pagination::new(Some(-5), Some(10_000));
        assert_eq!(page.page_num, 1);
        assert_eq!(page.page_size, MAX_PAGE_SIZE);
    }
}
