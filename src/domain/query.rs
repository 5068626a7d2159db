//! Paging and sorting for list endpoints

use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown sort field: {0}")]
    UnknownSortField(String),
    #[error("sort order must be 'asc' or 'desc', got {0}")]
    UnknownDirection(String),
}

/// 1-based page request, clamped to sane bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn page(&self) -> u32 { self.page }
    pub fn per_page(&self) -> u32 { self.per_page }
    pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.per_page) }

    pub fn into_page<T>(self, data: Vec<T>, total: u64) -> Page<T> {
        Page { data, total, page: self.page, per_page: self.per_page, pages: total.div_ceil(u64::from(self.per_page)) }
    }
}

impl Default for PageRequest {
    fn default() -> Self { Self::new(None, None) }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub pages: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection { Asc, #[default] Desc }

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self { Self::Asc => "ASC", Self::Desc => "DESC" }
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(QueryError::UnknownDirection(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: FromStr<Err = QueryError> + Default> Sort<F> {
    /// Parse `sort`/`order` query parameters; missing values fall back to
    /// the field default, descending.
    pub fn parse(field: Option<&str>, direction: Option<&str>) -> Result<Self, QueryError> {
        Ok(Self {
            field: field.map(str::parse).transpose()?.unwrap_or_default(),
            direction: direction.map(str::parse).transpose()?.unwrap_or_default(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderSortField { #[default] CreatedAt, TotalAmount, Status, PaymentStatus }

impl OrderSortField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::TotalAmount => "total_amount",
            Self::Status => "status",
            Self::PaymentStatus => "payment_status",
        }
    }
}

impl FromStr for OrderSortField {
    type Err = QueryError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" | "createdAt" => Ok(Self::CreatedAt),
            "total_amount" | "totalAmount" => Ok(Self::TotalAmount),
            "status" => Ok(Self::Status),
            "payment_status" | "paymentStatus" => Ok(Self::PaymentStatus),
            other => Err(QueryError::UnknownSortField(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProductSortField { #[default] CreatedAt, Price, Name, Stock }

impl ProductSortField {
    pub fn column(&self) -> &'static str {
        match self { Self::CreatedAt => "created_at", Self::Price => "price", Self::Name => "name", Self::Stock => "stock" }
    }
}

impl FromStr for ProductSortField {
    type Err = QueryError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" | "createdAt" => Ok(Self::CreatedAt),
            "price" => Ok(Self::Price),
            "name" => Ok(Self::Name),
            "stock" => Ok(Self::Stock),
            other => Err(QueryError::UnknownSortField(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, 1, DEFAULT_PER_PAGE)]
    #[case(Some(0), Some(0), 1, 1)]
    #[case(Some(3), Some(500), 3, MAX_PER_PAGE)]
    fn test_page_request_bounds(#[case] page: Option<u32>, #[case] per_page: Option<u32>, #[case] want_page: u32, #[case] want_per_page: u32) {
        let req = PageRequest::new(page, per_page);
        assert_eq!(req.page(), want_page);
        assert_eq!(req.per_page(), want_per_page);
    }

    #[test]
    fn test_page_metadata() {
        let page = PageRequest::new(Some(2), Some(10)).into_page(vec![1, 2, 3], 23);
        assert_eq!(page.pages, 3);
        assert_eq!(PageRequest::new(Some(2), Some(10)).offset(), 10);
        assert_eq!(PageRequest::default().into_page(Vec::<u8>::new(), 0).pages, 0);
    }

    #[test]
    fn test_sort_parse() {
        let sort: Sort<OrderSortField> = Sort::parse(Some("totalAmount"), Some("ASC")).unwrap();
        assert_eq!(sort.field, OrderSortField::TotalAmount);
        assert_eq!(sort.direction, SortDirection::Asc);

        let sort: Sort<ProductSortField> = Sort::parse(None, None).unwrap();
        assert_eq!(sort, Sort { field: ProductSortField::CreatedAt, direction: SortDirection::Desc });

        assert!(Sort::<OrderSortField>::parse(Some("password"), None).is_err());
        assert!(Sort::<OrderSortField>::parse(None, Some("sideways")).is_err());
    }
}
