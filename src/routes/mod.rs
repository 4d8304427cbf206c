//! Router modules, split by who may call them.
//!
//! The split is coarse: every handler still resolves its own `Principal` and
//! checks the capability table, so a route registered in the wrong module can
//! widen nothing.

/// Anonymous routes: health check and the account flows.
pub mod public;

/// Routes for any signed-in user, guarded by the auth middleware.
pub mod authenticated;

/// The admin console and restaurant-owner dashboard, nested under `/admin`.
pub mod admin;
