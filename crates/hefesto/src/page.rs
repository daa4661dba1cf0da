use serde::Serialize;

/// One page of results together with the total row count of the unpaged query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Offset the page starts at.
    pub page: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, page: u64, total: u64) -> Self {
        Self {
            data,
            page,
            total,
        }
    }

    /// Number of pages of the current page's size needed to hold `total`; 0 for an empty page.
    pub fn total_pages(&self) -> u64 {
        if self.data.is_empty() {
            return 0;
        }
        let size = self.data.len() as u64;
        self.total.div_ceil(size)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn map<R>(self, f: impl FnMut(T) -> R) -> Page<R> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            total: self.total,
        }
    }
}
