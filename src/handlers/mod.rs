//! HTTP handlers, one module per resource.
//!
//! Every admin handler follows the same shape: extract the `Principal`, ask it to
//! `authorize` the operation (which yields the ownership scope), build the query
//! from the request, call the repository under that scope and shape the reply.

use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    scope::{PageRequest, SearchTerm},
};

pub mod account;
pub mod dishes;
pub mod restaurants;
pub mod stats;
pub mod upload;
pub mod users;

/// ListParams
///
/// Query parameters accepted by the list endpoints. `page`/`limit` are clamped,
/// blank `search` is ignored. `restaurantId` (alias `parentId`) only applies to
/// the dish listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page number (default 1).
    pub page: Option<i64>,
    /// Page size (default 10, max 100).
    pub limit: Option<i64>,
    /// Case-insensitive substring search.
    pub search: Option<String>,
    /// Restrict dishes to one restaurant.
    #[serde(alias = "parentId")]
    pub restaurant_id: Option<Uuid>,
}

impl ListParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn search_term(&self) -> Option<SearchTerm> {
        SearchTerm::parse(self.search.as_deref())
    }
}

/// Returns the trimmed value when it is present and non-blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Fails with a single 400 naming every missing field, in declaration order.
pub(crate) fn require_fields(missing: &[(&str, bool)]) -> ApiResult<()> {
    let names: Vec<&str> = missing
        .iter()
        .filter(|(_, is_missing)| *is_missing)
        .map(|(name, _)| *name)
        .collect();
    if names.is_empty() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Missing required fields: {}",
            names.join(", ")
        )))
    }
}

/// Rejects a supplied-but-blank value for a field that must stay non-empty.
pub(crate) fn reject_blank(field: &str, value: Option<&str>) -> ApiResult<()> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ApiError::BadRequest(format!(
            "{} must not be empty",
            field
        ))),
        _ => Ok(()),
    }
}
