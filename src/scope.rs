//! Query scoping for the admin surface.
//!
//! Every list/get/update/delete on restaurants and dishes is resolved through a
//! value built here: the ownership constraint derived from the principal, the
//! caller's search text and pagination. The repository renders these values to
//! SQL; nothing in this module touches the database.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{auth::Principal, models::Role};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// OwnershipScope
///
/// The row-level predicate enforcing restaurant ownership. Dishes are scoped
/// through their parent restaurant's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipScope {
    Unrestricted,
    OwnedBy(Uuid),
}

impl OwnershipScope {
    pub fn for_principal(principal: &Principal) -> Self {
        match principal.role {
            Role::Admin => OwnershipScope::Unrestricted,
            // Plain users never reach a scoped query (the capability table stops
            // them first), but if they did they would own nothing.
            Role::RestaurantOwner | Role::User => OwnershipScope::OwnedBy(principal.id),
        }
    }

    /// The owner id the query must be constrained to, if any.
    pub fn owner(&self) -> Option<Uuid> {
        match self {
            OwnershipScope::Unrestricted => None,
            OwnershipScope::OwnedBy(id) => Some(*id),
        }
    }

    /// Whether a restaurant with the given owner falls inside this scope.
    /// Platform-managed restaurants (no owner) are visible to admins only.
    pub fn admits(&self, restaurant_owner: Option<Uuid>) -> bool {
        match self {
            OwnershipScope::Unrestricted => true,
            OwnershipScope::OwnedBy(id) => restaurant_owner == Some(*id),
        }
    }
}

/// SearchTerm
///
/// A non-blank, trimmed free-text needle matched case-insensitively as a substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm(String);

impl SearchTerm {
    /// Blank or absent input means "no search".
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let trimmed = raw?.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(SearchTerm(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `ILIKE` pattern with `%`, `_` and `\` escaped so they match literally.
    pub fn like_pattern(&self) -> String {
        let mut escaped = String::with_capacity(self.0.len() + 2);
        escaped.push('%');
        for c in self.0.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        escaped
    }

    /// True when any of the given fields contains the term, ignoring case.
    pub fn matches_any(&self, fields: &[Option<&str>]) -> bool {
        let needle = self.0.to_lowercase();
        fields
            .iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// PageRequest
///
/// Normalized pagination input: `page >= 1`, `1 <= limit <= MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Pagination
///
/// Metadata returned alongside every list: `pages = ceil(total / limit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let total = total.max(0);
        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages: (total + request.limit - 1) / request.limit,
        }
    }
}

/// Everything a restaurant listing is filtered by.
#[derive(Debug, Clone)]
pub struct RestaurantQuery {
    pub scope: OwnershipScope,
    pub search: Option<SearchTerm>,
    pub page: PageRequest,
}

/// DishQuery
///
/// Everything a dish listing is filtered by. An explicit `restaurant_id` is
/// intersected with the ownership scope, never substituted for it.
#[derive(Debug, Clone)]
pub struct DishQuery {
    pub scope: OwnershipScope,
    pub restaurant_id: Option<Uuid>,
    pub search: Option<SearchTerm>,
    pub page: PageRequest,
}
