use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    AppState,
    auth::{Operation, Principal},
    error::{ApiError, ApiResult, ErrorBody},
    models::{Role, UpdateUserRoleRequest, User},
};

const USER_LIST_LIMIT: i64 = 50;

/// list_users
///
/// [Admin] The 50 most recently registered users.
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "users",
    responses(
        (status = 200, description = "Most recent users", body = [User]),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
pub async fn list_users(
    principal: Principal,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<User>>> {
    principal.authorize(Operation::ManageUsers)?;
    Ok(Json(state.repo.list_users(USER_LIST_LIMIT).await?))
}

/// update_user_role
///
/// [Admin] Changes a user's role. The role must be one of the known roles.
#[utoipa::path(
    patch,
    path = "/admin/users",
    tag = "users",
    request_body = UpdateUserRoleRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Missing fields or unknown role", body = ErrorBody),
        (status = 403, description = "Admins only", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    )
)]
pub async fn update_user_role(
    principal: Principal,
    State(state): State<AppState>,
    payload: Result<Json<UpdateUserRoleRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    principal.authorize(Operation::ManageUsers)?;
    let Json(payload) = payload?;

    let (Some(user_id), Some(role)) = (payload.user_id, payload.role) else {
        return Err(ApiError::BadRequest(
            "User ID and role are required".to_string(),
        ));
    };
    let role = Role::parse(role.trim()).ok_or_else(|| ApiError::BadRequest("Invalid role".to_string()))?;

    let user = state
        .repo
        .set_user_role(user_id, role)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    tracing::info!(%user_id, role = role.as_str(), admin_id = %principal.id, "user role changed");

    Ok(Json(user))
}
