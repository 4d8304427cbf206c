use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use uuid::Uuid;

use super::{ListParams, non_blank, reject_blank, require_fields};
use crate::{
    AppState,
    auth::{Operation, Principal},
    error::{ApiError, ApiResult, ErrorBody},
    models::{
        CreateRestaurantRequest, MessageResponse, NewRestaurant, Restaurant, RestaurantDetail,
        RestaurantList, UpdateRestaurantRequest,
    },
    scope::{OwnershipScope, Pagination, RestaurantQuery},
};

/// list_restaurants
///
/// [Admin, Owner] Paginated restaurant listing, newest first. Owners only ever
/// see restaurants they own.
#[utoipa::path(
    get,
    path = "/admin/restaurants",
    tag = "restaurants",
    params(ListParams),
    responses(
        (status = 200, description = "Restaurants in scope", body = RestaurantList),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 403, description = "Role not allowed", body = ErrorBody)
    )
)]
pub async fn list_restaurants(
    principal: Principal,
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<RestaurantList>> {
    let scope = principal.authorize(Operation::ListRestaurants)?;
    let Query(params) = params?;

    let query = RestaurantQuery {
        scope,
        search: params.search_term(),
        page: params.page_request(),
    };
    let (items, total) = state.repo.list_restaurants(&query).await?;

    Ok(Json(RestaurantList {
        items,
        pagination: Pagination::new(query.page, total),
    }))
}

/// get_restaurant
///
/// [Admin, Owner] A single restaurant with its dishes. Restaurants outside the
/// caller's scope are reported as missing.
#[utoipa::path(
    get,
    path = "/admin/restaurants/{id}",
    tag = "restaurants",
    params(("id" = Uuid, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Found", body = RestaurantDetail),
        (status = 404, description = "Missing or not yours", body = ErrorBody)
    )
)]
pub async fn get_restaurant(
    principal: Principal,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<RestaurantDetail>> {
    let scope = principal.authorize(Operation::GetRestaurant)?;
    let Path(id) = id?;

    let restaurant = state
        .repo
        .find_restaurant(id, scope)
        .await?
        .ok_or_else(|| ApiError::not_found("Restaurant"))?;
    let dishes = state.repo.list_restaurant_dishes(id).await?;

    Ok(Json(RestaurantDetail { restaurant, dishes }))
}

/// create_restaurant
///
/// [Admin, Owner] Creates a restaurant. An owner always becomes the owner of what
/// they create; an admin may assign `ownerId` or leave the restaurant
/// platform-managed.
#[utoipa::path(
    post,
    path = "/admin/restaurants",
    tag = "restaurants",
    request_body = CreateRestaurantRequest,
    responses(
        (status = 201, description = "Created", body = Restaurant),
        (status = 400, description = "Missing or invalid fields", body = ErrorBody)
    )
)]
pub async fn create_restaurant(
    principal: Principal,
    State(state): State<AppState>,
    payload: Result<Json<CreateRestaurantRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Restaurant>)> {
    principal.authorize(Operation::CreateRestaurant)?;
    let Json(payload) = payload?;

    let name = non_blank(payload.name.as_deref());
    let address = non_blank(payload.address.as_deref());
    require_fields(&[
        ("name", name.is_none()),
        ("address", address.is_none()),
        ("lat", payload.lat.is_none()),
        ("lng", payload.lng.is_none()),
    ])?;
    let (Some(name), Some(address), Some(lat), Some(lng)) =
        (name, address, payload.lat, payload.lng)
    else {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    };
    validate_coordinates(Some(lat), Some(lng))?;

    let owner_id = if principal.is_admin() {
        if let Some(owner) = payload.owner_id {
            ensure_user_exists(&state, owner).await?;
        }
        payload.owner_id
    } else {
        Some(principal.id)
    };

    let id = state
        .repo
        .create_restaurant(NewRestaurant {
            owner_id,
            name,
            description: payload.description,
            address,
            lat,
            lng,
            phone: payload.phone,
            website: payload.website,
            email: payload.email,
            price_range: payload.price_range.unwrap_or_default(),
            cuisines: payload.cuisines.unwrap_or_default(),
        })
        .await?;

    tracing::info!(restaurant_id = %id, user_id = %principal.id, "restaurant created");

    let restaurant = refetch(&state, id, OwnershipScope::Unrestricted).await?;
    Ok((StatusCode::CREATED, Json(restaurant)))
}

/// update_restaurant
///
/// [Admin, Owner] Partial update, served for both PUT and PATCH. Only supplied
/// fields change; `cuisines` replaces the whole collection. `ownerId` is honoured
/// for admins only.
#[utoipa::path(
    patch,
    path = "/admin/restaurants/{id}",
    tag = "restaurants",
    params(("id" = Uuid, Path, description = "Restaurant ID")),
    request_body = UpdateRestaurantRequest,
    responses(
        (status = 200, description = "Updated", body = Restaurant),
        (status = 400, description = "Invalid fields", body = ErrorBody),
        (status = 404, description = "Missing or not yours", body = ErrorBody)
    )
)]
pub async fn update_restaurant(
    principal: Principal,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateRestaurantRequest>, JsonRejection>,
) -> ApiResult<Json<Restaurant>> {
    let scope = principal.authorize(Operation::UpdateRestaurant)?;
    let Path(id) = id?;
    let Json(mut payload) = payload?;

    reject_blank("name", payload.name.as_deref())?;
    reject_blank("address", payload.address.as_deref())?;
    validate_coordinates(payload.lat, payload.lng)?;

    if !principal.is_admin() {
        payload.owner_id = None;
    } else if let Some(Some(owner)) = payload.owner_id {
        ensure_user_exists(&state, owner).await?;
    }

    if !state.repo.update_restaurant(id, scope, payload).await? {
        return Err(ApiError::not_found("Restaurant"));
    }

    tracing::info!(restaurant_id = %id, user_id = %principal.id, "restaurant updated");

    Ok(Json(refetch(&state, id, scope).await?))
}

/// delete_restaurant
///
/// [Admin, Owner] Deletes a restaurant together with its dishes and cuisines.
#[utoipa::path(
    delete,
    path = "/admin/restaurants/{id}",
    tag = "restaurants",
    params(("id" = Uuid, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Missing or not yours", body = ErrorBody)
    )
)]
pub async fn delete_restaurant(
    principal: Principal,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let scope = principal.authorize(Operation::DeleteRestaurant)?;
    let Path(id) = id?;

    if !state.repo.delete_restaurant(id, scope).await? {
        return Err(ApiError::not_found("Restaurant"));
    }

    tracing::info!(restaurant_id = %id, user_id = %principal.id, "restaurant deleted");

    Ok(Json(MessageResponse {
        message: "Restaurant deleted successfully".to_string(),
    }))
}

async fn refetch(state: &AppState, id: Uuid, scope: OwnershipScope) -> ApiResult<Restaurant> {
    state
        .repo
        .find_restaurant(id, scope)
        .await?
        .ok_or_else(|| ApiError::not_found("Restaurant"))
}

async fn ensure_user_exists(state: &AppState, user_id: Uuid) -> ApiResult<()> {
    match state.repo.get_user(user_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::BadRequest("Owner not found".to_string())),
    }
}

fn validate_coordinates(lat: Option<f64>, lng: Option<f64>) -> ApiResult<()> {
    if lat.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
        return Err(ApiError::BadRequest(
            "lat must be between -90 and 90".to_string(),
        ));
    }
    if lng.is_some_and(|lng| !(-180.0..=180.0).contains(&lng)) {
        return Err(ApiError::BadRequest(
            "lng must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}
