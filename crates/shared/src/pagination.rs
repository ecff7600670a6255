//! Page/limit pagination helpers.

use serde::{Deserialize, Serialize};

/// Default page size when the caller does not provide one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound for any page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters normalised from query input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Builds a request, clamping page to at least 1 and limit to 1..=MAX_PAGE_SIZE.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Self { page, limit }
    }

    /// Row offset for SQL `OFFSET`.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    /// Limit as the SQL bind type.
    pub fn limit_i64(&self) -> i64 {
        self.limit as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination metadata returned alongside list results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total_count: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(request: PageRequest, total_count: i64) -> Self {
        let limit = request.limit.max(1) as i64;
        let total_pages = (total_count + limit - 1) / limit;
        Self {
            page: request.page,
            limit: request.limit,
            total_count,
            total_pages,
        }
    }
}

/// A page of items with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total_count: i64) -> Self {
        Self {
            data,
            meta: PageMeta::new(request, total_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let req = PageRequest::new(None, None);
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_page_request_clamps() {
        let req = PageRequest::new(Some(0), Some(10_000));
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, MAX_PAGE_SIZE);

        let req = PageRequest::new(Some(3), Some(0));
        assert_eq!(req.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(req.offset(), 20);
    }

    #[test]
    fn test_page_meta_total_pages() {
        let req = PageRequest::new(Some(1), Some(10));
        assert_eq!(PageMeta::new(req, 0).total_pages, 0);
        assert_eq!(PageMeta::new(req, 10).total_pages, 1);
        assert_eq!(PageMeta::new(req, 11).total_pages, 2);
    }

    #[test]
    fn test_paginated_serializes_camel_case() {
        let page = Paginated::new(vec![1, 2], PageRequest::new(Some(2), Some(2)), 5);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["meta"]["totalCount"], 5);
        assert_eq!(json["meta"]["totalPages"], 3);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
    }
}
