use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::{Operation, Principal},
    error::{ApiResult, ErrorBody},
    models::{DashboardStats, PlatformStats},
};

/// dashboard_stats
///
/// [Admin, Owner] Landing-page counters. For owners, restaurant and dish counts
/// and the activity feed cover their own restaurants only.
#[utoipa::path(
    get,
    path = "/admin/dashboard/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Scoped counters", body = DashboardStats),
        (status = 403, description = "Role not allowed", body = ErrorBody)
    )
)]
pub async fn dashboard_stats(
    principal: Principal,
    State(state): State<AppState>,
) -> ApiResult<Json<DashboardStats>> {
    let scope = principal.authorize(Operation::ViewDashboard)?;
    Ok(Json(state.repo.dashboard_stats(scope).await?))
}

/// [Admin] Platform-wide counters.
#[utoipa::path(
    get,
    path = "/admin/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Platform counters", body = PlatformStats),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
pub async fn platform_stats(
    principal: Principal,
    State(state): State<AppState>,
) -> ApiResult<Json<PlatformStats>> {
    principal.authorize(Operation::ViewPlatformStats)?;
    Ok(Json(state.repo.platform_stats().await?))
}
