use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::scope::Pagination;

// --- Closed Enumerations ---

/// Raised when a stored or submitted string does not name a known variant.
#[derive(Debug, Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Role
///
/// The closed set of roles a principal can hold. Persisted as text in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    Admin,
    RestaurantOwner,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::RestaurantOwner => "restaurant_owner",
            Role::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "restaurant_owner" => Some(Role::RestaurantOwner),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value).ok_or(UnknownVariant { kind: "role", value })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PriceRange {
    Low,
    #[default]
    Medium,
    High,
}

impl PriceRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceRange::Low => "low",
            PriceRange::Medium => "medium",
            PriceRange::High => "high",
        }
    }
}

impl TryFrom<String> for PriceRange {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "low" => Ok(PriceRange::Low),
            "medium" => Ok(PriceRange::Medium),
            "high" => Ok(PriceRange::High),
            _ => Err(UnknownVariant {
                kind: "price range",
                value,
            }),
        }
    }
}

/// Channel an OTP code is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum OtpKind {
    Email,
    Phone,
}

impl OtpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpKind::Email => "email",
            OtpKind::Phone => "phone",
        }
    }
}

// --- Core Schemas (Mapped to Database) ---

/// User
///
/// A row of the `users` table without its credential. This is what the session
/// resolves to and what the user-management endpoints return.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub onboarding_completed: bool,
    pub subscription_tier: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// A user together with the stored Argon2 hash. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Insert payload for a freshly registered account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub password_hash: String,
    pub phone_verified: bool,
    pub onboarding_completed: bool,
    pub subscription_tier: String,
}

/// Restaurant
///
/// A restaurant with its cuisines inlined and its owner's display details joined in.
/// `owner_id = None` marks a platform-managed restaurant.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Restaurant {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    #[sqlx(try_from = "String")]
    pub price_range: PriceRange,
    pub is_active: bool,
    pub cuisines: Vec<String>,
    pub dish_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Single-restaurant view: the restaurant plus its dishes, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RestaurantDetail {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub dishes: Vec<Dish>,
}

/// Dish
///
/// A dish with its ordered ingredient and dietary-tag collections inlined.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Dish {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub restaurant_name: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: f64,
    pub cuisine: Option<String>,
    pub is_active: bool,
    pub is_available: bool,
    pub ingredients: Vec<String>,
    pub dietary_tags: Vec<String>,
    pub allergens: Vec<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// CreateRestaurantRequest
///
/// Every field is optional on the wire so that missing required fields can be
/// reported together instead of failing on the first one.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateRestaurantRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    /// Honoured for admins only; owners always own what they create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    #[serde(alias = "cuisineTypes", skip_serializing_if = "Option::is_none")]
    pub cuisines: Option<Vec<String>>,
}

/// UpdateRestaurantRequest
///
/// Partial update: absent fields are left untouched. `cuisines`, when present,
/// replaces the whole collection. The optional text fields and `owner_id`
/// distinguish "absent" from an explicit `null`, which clears the column.
/// `owner_id` is only applied for admins.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateRestaurantRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub website: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    #[schema(value_type = Option<Uuid>)]
    pub owner_id: Option<Option<Uuid>>,
    #[serde(alias = "cuisineTypes", skip_serializing_if = "Option::is_none")]
    pub cuisines: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateDishRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergens: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_tags: Option<Vec<String>>,
}

/// UpdateDishRequest
///
/// Partial update for a dish. `ingredients` and `dietary_tags`, when present,
/// replace the stored collections in caller order. An explicit `null` clears
/// `description`, `image` or `cuisine`, and empties `allergens`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateDishRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub image: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub cuisine: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    #[schema(value_type = Option<Vec<String>>)]
    pub allergens: Option<Option<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_tags: Option<Vec<String>>,
}

/// Validated restaurant insert, produced by the create handler.
#[derive(Debug, Clone, Default)]
pub struct NewRestaurant {
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub price_range: PriceRange,
    pub cuisines: Vec<String>,
}

/// Validated dish insert, produced by the create handler.
#[derive(Debug, Clone, Default)]
pub struct NewDish {
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: f64,
    pub cuisine: Option<String>,
    pub is_active: bool,
    pub is_available: bool,
    pub allergens: Vec<String>,
    pub ingredients: Vec<String>,
    pub dietary_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateUserRoleRequest {
    pub user_id: Option<Uuid>,
    /// Kept as free text so an unknown role is a 400 with a clear message.
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    /// `customer` (default) or `restaurant_owner`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct VerifyRequest {
    pub identifier: String,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: OtpKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ResendRequest {
    pub identifier: String,
    #[serde(rename = "type")]
    pub kind: OtpKind,
}

// --- Response Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RestaurantList {
    pub items: Vec<Restaurant>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DishList {
    pub items: Vec<Dish>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

/// Response of the OTP-issuing endpoints. The code is only echoed in local mode.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OtpIssuedResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub development_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterResponse {
    pub user: User,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}

// --- Dashboard Schemas ---

/// DashboardStats
///
/// Counters for the console landing page. Restaurant and dish counts honour the
/// caller's ownership scope; `total_users` is platform-wide.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardStats {
    pub total_restaurants: i64,
    pub total_dishes: i64,
    pub total_users: i64,
    pub active_restaurants: i64,
    pub recent_activity: Vec<ActivityItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ActivityItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub action: String,
    pub description: String,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

/// A restaurant reduced to what the activity feed needs.
#[derive(Debug, Clone, FromRow)]
pub struct RecentRestaurant {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<RecentRestaurant> for ActivityItem {
    fn from(r: RecentRestaurant) -> Self {
        ActivityItem {
            id: r.id,
            kind: "restaurant".to_string(),
            action: "created".to_string(),
            description: format!("New restaurant \"{}\" was added", r.name),
            timestamp: r.created_at,
        }
    }
}

/// Platform-wide counters (admin only).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_restaurants: i64,
    pub total_dishes: i64,
    /// Users whose record changed in the last 7 days.
    pub active_users: i64,
    pub new_users_today: i64,
}

/// Deserializes a present field (including an explicit `null`) as `Some(..)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
