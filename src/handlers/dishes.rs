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
    models::{CreateDishRequest, Dish, DishList, MessageResponse, NewDish, UpdateDishRequest},
    scope::{DishQuery, OwnershipScope, Pagination},
};

/// list_dishes
///
/// [Admin, Owner] Paginated dish listing, newest first. `restaurantId` narrows
/// the listing to one restaurant; for owners it is intersected with their own
/// restaurants, so naming someone else's restaurant yields an empty page.
#[utoipa::path(
    get,
    path = "/admin/dishes",
    tag = "dishes",
    params(ListParams),
    responses(
        (status = 200, description = "Dishes in scope", body = DishList),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 403, description = "Role not allowed", body = ErrorBody)
    )
)]
pub async fn list_dishes(
    principal: Principal,
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<DishList>> {
    let scope = principal.authorize(Operation::ListDishes)?;
    let Query(params) = params?;

    let query = DishQuery {
        scope,
        restaurant_id: params.restaurant_id,
        search: params.search_term(),
        page: params.page_request(),
    };
    let (items, total) = state.repo.list_dishes(&query).await?;

    Ok(Json(DishList {
        items,
        pagination: Pagination::new(query.page, total),
    }))
}

/// get_dish
///
/// [Admin, Owner] A single dish with its collections and restaurant name,
/// resolved through the caller's scope.
#[utoipa::path(
    get,
    path = "/admin/dishes/{id}",
    tag = "dishes",
    params(("id" = Uuid, Path, description = "Dish ID")),
    responses(
        (status = 200, description = "Found", body = Dish),
        (status = 404, description = "Missing or not yours", body = ErrorBody)
    )
)]
pub async fn get_dish(
    principal: Principal,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Dish>> {
    let scope = principal.authorize(Operation::GetDish)?;
    let Path(id) = id?;

    let dish = state
        .repo
        .find_dish(id, scope)
        .await?
        .ok_or_else(|| ApiError::not_found("Dish"))?;
    Ok(Json(dish))
}

/// create_dish
///
/// [Admin, Owner] Creates a dish on a restaurant the caller may manage. The
/// target restaurant is resolved through the caller's scope first.
#[utoipa::path(
    post,
    path = "/admin/dishes",
    tag = "dishes",
    request_body = CreateDishRequest,
    responses(
        (status = 201, description = "Created", body = Dish),
        (status = 400, description = "Missing or invalid fields", body = ErrorBody),
        (status = 404, description = "Restaurant missing or not yours", body = ErrorBody)
    )
)]
pub async fn create_dish(
    principal: Principal,
    State(state): State<AppState>,
    payload: Result<Json<CreateDishRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Dish>)> {
    let scope = principal.authorize(Operation::CreateDish)?;
    let Json(payload) = payload?;

    let name = non_blank(payload.name.as_deref());
    require_fields(&[
        ("name", name.is_none()),
        ("price", payload.price.is_none()),
        ("restaurantId", payload.restaurant_id.is_none()),
    ])?;
    let (Some(name), Some(price), Some(restaurant_id)) =
        (name, payload.price, payload.restaurant_id)
    else {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    };
    validate_price(Some(price))?;

    if state
        .repo
        .find_restaurant(restaurant_id, scope)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound(
            "Restaurant not found or access denied".to_string(),
        ));
    }

    let id = state
        .repo
        .create_dish(NewDish {
            restaurant_id,
            name,
            description: payload.description,
            image: payload.image,
            price,
            cuisine: payload.cuisine,
            is_active: payload.is_active.unwrap_or(true),
            is_available: payload.is_available.unwrap_or(true),
            allergens: payload.allergens.unwrap_or_default(),
            ingredients: payload.ingredients.unwrap_or_default(),
            dietary_tags: payload.dietary_tags.unwrap_or_default(),
        })
        .await?;

    tracing::info!(dish_id = %id, %restaurant_id, user_id = %principal.id, "dish created");

    let dish = refetch(&state, id, OwnershipScope::Unrestricted).await?;
    Ok((StatusCode::CREATED, Json(dish)))
}

/// update_dish
///
/// [Admin, Owner] Partial update, served for both PUT and PATCH. `ingredients`
/// and `dietaryTags`, when supplied, replace the stored collections.
#[utoipa::path(
    patch,
    path = "/admin/dishes/{id}",
    tag = "dishes",
    params(("id" = Uuid, Path, description = "Dish ID")),
    request_body = UpdateDishRequest,
    responses(
        (status = 200, description = "Updated", body = Dish),
        (status = 400, description = "Invalid fields", body = ErrorBody),
        (status = 404, description = "Missing or not yours", body = ErrorBody)
    )
)]
pub async fn update_dish(
    principal: Principal,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateDishRequest>, JsonRejection>,
) -> ApiResult<Json<Dish>> {
    let scope = principal.authorize(Operation::UpdateDish)?;
    let Path(id) = id?;
    let Json(payload) = payload?;

    reject_blank("name", payload.name.as_deref())?;
    validate_price(payload.price)?;

    if !state.repo.update_dish(id, scope, payload).await? {
        return Err(ApiError::not_found("Dish"));
    }

    tracing::info!(dish_id = %id, user_id = %principal.id, "dish updated");

    Ok(Json(refetch(&state, id, scope).await?))
}

/// delete_dish
///
/// [Admin, Owner] Deletes a dish the caller may manage, with its ingredients and
/// dietary tags. Foreign or missing dishes are a 404.
#[utoipa::path(
    delete,
    path = "/admin/dishes/{id}",
    tag = "dishes",
    params(("id" = Uuid, Path, description = "Dish ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Missing or not yours", body = ErrorBody)
    )
)]
pub async fn delete_dish(
    principal: Principal,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let scope = principal.authorize(Operation::DeleteDish)?;
    let Path(id) = id?;

    if !state.repo.delete_dish(id, scope).await? {
        return Err(ApiError::not_found("Dish"));
    }

    tracing::info!(dish_id = %id, user_id = %principal.id, "dish deleted");

    Ok(Json(MessageResponse {
        message: "Dish deleted successfully".to_string(),
    }))
}

async fn refetch(state: &AppState, id: Uuid, scope: OwnershipScope) -> ApiResult<Dish> {
    state
        .repo
        .find_dish(id, scope)
        .await?
        .ok_or_else(|| ApiError::not_found("Dish"))
}

fn validate_price(price: Option<f64>) -> ApiResult<()> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => Err(ApiError::BadRequest(
            "price must be a non-negative number".to_string(),
        )),
        _ => Ok(()),
    }
}
