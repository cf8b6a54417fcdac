//! List filtering and pagination shared by every list endpoint.

use serde::Deserialize;
use std::str::FromStr;

use crate::{
    error::{AppError, Result},
    models::{
        PaperCategory, PaperStatus, Pagination, RegistrationCategory, RegistrationStatus,
    },
    triage::SubjectBucket,
};

pub const ADMIN_PAGE_SIZE: i64 = 10;
pub const PUBLIC_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// How malformed enumeration filters are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Admin listings: an unknown value drops the filter.
    Lenient,
    /// Public listings: an unknown value is a 400.
    Strict,
}

/// ListParams
///
/// Raw query string for every list endpoint. Everything arrives as text so that a
/// non-numeric `page` degrades to the default instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page number.
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring match across the entity's text fields.
    pub search: Option<String>,
    /// Exact match on the corresponding author's email (papers only).
    pub author_email: Option<String>,
    /// Contact subject bucket (contact messages only).
    pub subject: Option<String>,
}

/// A resolved page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn from_params(params: &ListParams, default_per_page: i64) -> Self {
        let page = parse_positive(params.page.as_deref()).unwrap_or(1);
        let per_page = parse_positive(params.per_page.as_deref())
            .unwrap_or(default_per_page)
            .min(MAX_PAGE_SIZE);
        Self { page, per_page }
    }

    /// Clamps the requested page into `1..=max(pages, 1)` for the given total and
    /// returns the page metadata together with the row offset to read from.
    pub fn resolve(&self, total: i64) -> (Pagination, i64) {
        let per_page = self.per_page.max(1);
        let pages = if total == 0 { 0 } else { (total + per_page - 1) / per_page };
        let page = self.page.clamp(1, pages.max(1));
        let pagination = Pagination {
            page,
            per_page,
            total,
            pages,
            has_next: page < pages,
            has_prev: page > 1,
        };
        (pagination, (page - 1) * per_page)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).filter(|v| *v >= 1)
}

/// Returns `None` for absent or empty values.
fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parses an enumeration filter according to `mode`.
pub fn parse_enum_filter<T: FromStr>(
    raw: &Option<String>,
    mode: FilterMode,
    what: &str,
) -> Result<Option<T>> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };
    match (value.parse::<T>(), mode) {
        (Ok(parsed), _) => Ok(Some(parsed)),
        (Err(_), FilterMode::Lenient) => Ok(None),
        (Err(_), FilterMode::Strict) => Err(AppError::Validation(format!("Invalid {what} filter"))),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationFilter {
    pub status: Option<RegistrationStatus>,
    pub category: Option<RegistrationCategory>,
    pub search: Option<String>,
}

impl RegistrationFilter {
    pub fn from_params(params: &ListParams, mode: FilterMode) -> Result<Self> {
        Ok(Self {
            status: parse_enum_filter(&params.status, mode, "status")?,
            category: parse_enum_filter(&params.category, mode, "category")?,
            search: present(&params.search).map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperFilter {
    pub status: Option<PaperStatus>,
    pub category: Option<PaperCategory>,
    pub search: Option<String>,
    pub author_email: Option<String>,
}

impl PaperFilter {
    pub fn from_params(params: &ListParams, mode: FilterMode) -> Result<Self> {
        Ok(Self {
            status: parse_enum_filter(&params.status, mode, "status")?,
            category: parse_enum_filter(&params.category, mode, "category")?,
            search: present(&params.search).map(str::to_string),
            author_email: present(&params.author_email).map(str::to_string),
        })
    }
}

/// Message status stays free text: an unknown status simply matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageFilter {
    pub status: Option<String>,
    pub search: Option<String>,
    pub subject: Option<SubjectBucket>,
}

impl MessageFilter {
    pub fn from_params(params: &ListParams) -> Self {
        Self {
            status: present(&params.status).map(str::to_string),
            search: present(&params.search).map(str::to_string),
            // Unknown buckets are ignored.
            subject: present(&params.subject).and_then(|s| s.parse().ok()),
        }
    }
}

/// One page of rows plus its metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
