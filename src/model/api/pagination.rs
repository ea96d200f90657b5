use rocket::FromForm;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;

/// Query parameters selecting one page of a listing. Pages are 1-indexed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromForm)]
pub struct PaginationRequest {
    page_num: Option<u32>,
    page_size: Option<u32>,
}

impl PaginationRequest {
    pub fn new(page_num: u32, page_size: u32) -> Self {
        Self {
            page_num: Some(page_num),
            page_size: Some(page_size),
        }
    }

    /// Did the caller ask for a page at all?
    pub fn is_requested(&self) -> bool {
        self.page_num.is_some() || self.page_size.is_some()
    }

    pub fn page_num(&self) -> u32 {
        self.page_num.unwrap_or(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Reject zero pages and oversized pages.
    pub fn validate(self) -> Result<Self> {
        if self.page_num() == 0 {
            return Err(Error::validation("page_num starts at 1"));
        }
        if self.page_size() == 0 || self.page_size() > MAX_PAGE_SIZE {
            return Err(Error::validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(self)
    }

    /// Number of items before this page.
    pub fn skip(&self) -> u64 {
        u64::from(self.page_num().saturating_sub(1)) * u64::from(self.page_size())
    }

    /// Describe this page within a listing of `total` items.
    pub fn to_result(&self, total: u64) -> PaginationResult {
        PaginationResult {
            page_num: self.page_num(),
            page_size: self.page_size(),
            total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResult {
    pub page_num: u32,
    pub page_size: u32,
    pub total: u64,
}
