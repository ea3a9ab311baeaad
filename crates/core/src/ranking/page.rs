/// Most items a ranking pass keeps; three pages of three.
pub const MAX_RANKED: usize = 9;
pub const MAX_PAGE_SIZE: i64 = 3;
pub const MAX_PAGE: i64 = 3;
pub const DEFAULT_PAGE_SIZE: i64 = 3;
pub const DEFAULT_PAGE: i64 = 1;

/// Page window, always clamped into range rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::clamped(None, None)
    }
}

impl PageRequest {
    pub fn clamped(page_size: Option<i64>, page: Option<i64>) -> Self {
        Self {
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE) as usize,
            page: page.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE) as usize,
        }
    }

    /// Out-of-range windows yield an empty slice.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.page - 1) * self.page_size;
        if start >= items.len() {
            return &[];
        }
        let end = (start + self.page_size).min(items.len());
        &items[start..end]
    }
}
