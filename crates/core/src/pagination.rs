//! `?page=&limit=` handling shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 5;
    pub const MAX_LIMIT: u32 = 100;

    /// Build a page request, clamping `page` to at least 1 and `limit` to
    /// `1..=MAX_LIMIT`.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Same request with its bounds enforced.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::new(self.page, self.limit)
    }

    /// SQL `LIMIT`.
    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(self.normalized().limit)
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub fn offset(self) -> i64 {
        let normalized = self.normalized();
        i64::from(normalized.page - 1) * i64::from(normalized.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(page, Pagination { page: 1, limit: 5 });
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 5);
    }

    #[test]
    fn test_offset() {
        assert_eq!(Pagination::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_clamping() {
        let page = Pagination { page: 0, limit: 500 };
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 100);

        assert_eq!(Pagination::new(2, 0).limit(), 1);
    }
}
