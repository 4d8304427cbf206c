use crate::{AppState, handlers::account};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: the health probe and the account
/// lifecycle (registration, login, code verification and resend).
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register
        // Creates an account and issues an email verification code.
        .route("/auth/register", post(account::register))
        // POST /auth/login
        // Exchanges credentials for a bearer token.
        .route("/auth/login", post(account::login))
        // POST /auth/verify
        .route("/auth/verify", post(account::verify))
        // POST /auth/resend
        // Invalidates outstanding codes and issues a fresh one.
        .route("/auth/resend", post(account::resend))
}
