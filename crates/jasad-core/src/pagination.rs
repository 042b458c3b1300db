// ABOUTME: Page-number pagination shared by list endpoints
// ABOUTME: Parses page and page_size query values and computes the metadata envelope
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use serde::{Deserialize, Serialize};

use crate::errors::FieldError;

/// Page size used when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Largest page number a client may request
pub const MAX_PAGE: u32 = 10_000_000;

/// Requested page, one-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number, starting at 1
    pub page: u32,
    /// Items per page
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Parse raw `page` / `page_size` query values, appending a field error
    /// for each value that is not an integer in range
    ///
    /// Absent or empty values take their defaults.
    pub fn parse(page: Option<&str>, page_size: Option<&str>, errors: &mut Vec<FieldError>) -> Self {
        let defaults = Self::default();
        Self {
            page: parse_bounded(errors, "page", page, defaults.page, MAX_PAGE),
            page_size: parse_bounded(errors, "page_size", page_size, defaults.page_size, MAX_PAGE_SIZE),
        }
    }

    /// SQL `LIMIT`
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// SQL `OFFSET`
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

fn parse_bounded(
    errors: &mut Vec<FieldError>,
    field: &str,
    raw: Option<&str>,
    default: u32,
    max: u32,
) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return default;
    };

    match raw.parse::<u32>() {
        Ok(value) if (1..=max).contains(&value) => value,
        Ok(_) => {
            errors.push(FieldError::new(field, format!("must be between 1 and {max}")));
            default
        }
        Err(_) => {
            errors.push(FieldError::new(field, "must be an integer value"));
            default
        }
    }
}

/// Position of a page within the full result set
///
/// All fields are zero when the filter matched nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Page that was returned
    pub current_page: u32,
    /// Items per page
    pub page_size: u32,
    /// Always 1 for a non-empty result
    pub first_page: u32,
    /// Last page holding any item
    pub last_page: u64,
    /// Items matching the filter across all pages
    pub total_records: u64,
}

impl PageMetadata {
    /// Metadata for `request` over `total_records` matches
    #[must_use]
    pub fn new(total_records: u64, request: PageRequest) -> Self {
        if total_records == 0 {
            return Self::default();
        }
        Self {
            current_page: request.page,
            page_size: request.page_size,
            first_page: 1,
            last_page: total_records.div_ceil(u64::from(request.page_size.max(1))),
            total_records,
        }
    }
}
