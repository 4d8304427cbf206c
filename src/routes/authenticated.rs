use crate::{AppState, handlers::account};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes open to any signed-in user regardless of role. The router is wrapped
/// in the auth middleware in `create_router`, so a missing or invalid session is
/// rejected with 401 before a handler runs.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The caller's own profile.
        .route("/me", get(account::get_me))
}
