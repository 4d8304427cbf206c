use crate::{
    AppState,
    handlers::{dishes, restaurants, stats, upload, users},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

// Multipart framing overhead on top of the largest accepted image.
const UPLOAD_BODY_LIMIT: usize = upload::MAX_UPLOAD_BYTES + 1024 * 1024;

/// Admin Router Module
///
/// The console surface shared by admins and restaurant owners. Each handler
/// authorizes its operation against the capability table and runs every query
/// under the caller's ownership scope, so owners only ever reach their own
/// restaurants and dishes. User management and platform stats are admin-only.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Restaurants ---
        // GET /admin/restaurants?page&limit&search
        // POST /admin/restaurants
        .route(
            "/restaurants",
            get(restaurants::list_restaurants).post(restaurants::create_restaurant),
        )
        // GET/PUT/PATCH/DELETE /admin/restaurants/{id}
        // PUT and PATCH are both partial updates.
        .route(
            "/restaurants/{id}",
            get(restaurants::get_restaurant)
                .put(restaurants::update_restaurant)
                .patch(restaurants::update_restaurant)
                .delete(restaurants::delete_restaurant),
        )
        // --- Dishes ---
        // GET /admin/dishes?page&limit&search&restaurantId
        // POST /admin/dishes
        .route(
            "/dishes",
            get(dishes::list_dishes).post(dishes::create_dish),
        )
        .route(
            "/dishes/{id}",
            get(dishes::get_dish)
                .put(dishes::update_dish)
                .patch(dishes::update_dish)
                .delete(dishes::delete_dish),
        )
        // --- Users (admin only) ---
        // GET lists the 50 newest accounts, PATCH changes a role.
        .route(
            "/users",
            get(users::list_users).patch(users::update_user_role),
        )
        // --- Stats ---
        // GET /admin/stats (admin only, platform-wide)
        .route("/stats", get(stats::platform_stats))
        // GET /admin/dashboard/stats (scoped to the caller's restaurants)
        .route("/dashboard/stats", get(stats::dashboard_stats))
        // --- Media ---
        // POST /admin/upload (multipart `file`)
        .route(
            "/upload",
            post(upload::upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}
