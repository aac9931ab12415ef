//! Offset pagination arithmetic for product listings.

use serde::{Deserialize, Serialize};

/// A requested page number, always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest(u32);

impl PageRequest {
    /// The first page.
    pub const FIRST: Self = Self(1);

    /// Coerce a raw `?page=` value. Missing, non-numeric or zero input yields page 1.
    #[must_use]
    pub fn from_query(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<u32>().ok())
            .map_or(Self::FIRST, Self::new)
    }

    /// Page `n`, clamped to at least 1.
    #[must_use]
    pub const fn new(n: u32) -> Self {
        if n == 0 { Self::FIRST } else { Self(n) }
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::FIRST
    }
}

/// Pagination metadata for one page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page_size: u32,
    pub current_page: u32,
    /// `ceil(total / page_size)`; 0 when the listing is empty.
    pub last_page: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Pagination {
    /// Compute metadata for `page` over `total` items.
    ///
    /// A `page_size` of zero is treated as 1.
    #[must_use]
    pub fn new(page: PageRequest, page_size: u32, total: u64) -> Self {
        let page_size = page_size.max(1);
        let current_page = page.get();
        let size = u64::from(page_size);

        Self {
            total,
            page_size,
            current_page,
            last_page: total.div_ceil(size),
            has_next: u64::from(current_page) * size < total,
            has_previous: current_page > 1,
        }
    }

    /// Number of items to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.current_page - 1) * u64::from(self.page_size)
    }

    /// Maximum number of items on this page.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.page_size as u64
    }

    /// Number of items this page holds: `min(P, max(0, N - offset))`.
    #[must_use]
    pub fn expected_len(&self) -> u64 {
        self.total.saturating_sub(self.offset()).min(self.limit())
    }

    #[must_use]
    pub const fn next_page(&self) -> u32 {
        self.current_page.saturating_add(1)
    }

    #[must_use]
    pub const fn previous_page(&self) -> u32 {
        self.current_page.saturating_sub(1)
    }

    /// Whether a separate "first page" link is worth rendering, i.e. the
    /// previous-page link does not already point at page 1.
    #[must_use]
    pub const fn shows_first_link(&self) -> bool {
        self.current_page != 1 && self.previous_page() != 1
    }

    /// Whether a separate "last page" link is worth rendering.
    #[must_use]
    pub const fn shows_last_link(&self) -> bool {
        self.last_page != self.current_page as u64 && self.next_page() as u64 != self.last_page
    }
}
