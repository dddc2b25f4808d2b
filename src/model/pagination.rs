//! Page number to offset/limit conversion shared by every listing and search

use super::error::{LibraryError, LibraryResult};

/// Number of items on every listing and search page, for all resource kinds
pub const PAGE_SIZE: u32 = 5;

/// A requested page, parsed from the `page` query parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: u32,
}

impl PageRequest {
    /// Parse the raw `page` parameter.
    ///
    /// Absent means page 1. Anything else is read as a leading integer, so
    /// `"3abc"` is page 3 and `"abc"` is page 0. Zero and negative pages are
    /// kept as-is and produce a negative offset.
    pub fn from_param(raw: Option<&str>) -> Self {
        let page = match raw {
            None => 1,
            Some(raw) => parse_leading_int(raw),
        };
        Self { page, page_size: PAGE_SIZE }
    }

    /// Offset of the first item. Pages too large to address are reported
    /// the same way the remote client reports an invalid offset.
    pub fn offset(&self) -> LibraryResult<i64> {
        to_offset(self.page, self.page_size)
            .ok_or_else(|| LibraryError::Api(format!("invalid offset for page: {}", self.page)))
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

/// `(page - 1) * page_size`, or `None` when that does not fit an `i64`
pub fn to_offset(page: i64, page_size: u32) -> Option<i64> {
    page.checked_sub(1)?.checked_mul(i64::from(page_size))
}

pub fn to_page_count(total: u32, page_size: u32) -> u32 {
    total.div_ceil(page_size)
}

fn parse_leading_int(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let value = digits
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .fold(0i64, |acc, c| {
            acc.saturating_mul(10)
                .saturating_add(i64::from(c as u8 - b'0'))
        });

    if negative { -value } else { value }
}
