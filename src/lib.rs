use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod moderation;
pub mod repository;
pub mod scope;
pub mod storage;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::Principal;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use moderation::{AllowAllModerator, HttpModerator, ModeratorState};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document aggregated from every `#[utoipa::path]` handler and
/// `ToSchema` model. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::restaurants::list_restaurants, handlers::restaurants::get_restaurant,
        handlers::restaurants::create_restaurant, handlers::restaurants::update_restaurant,
        handlers::restaurants::delete_restaurant,
        handlers::dishes::list_dishes, handlers::dishes::get_dish, handlers::dishes::create_dish,
        handlers::dishes::update_dish, handlers::dishes::delete_dish,
        handlers::users::list_users, handlers::users::update_user_role,
        handlers::stats::dashboard_stats, handlers::stats::platform_stats,
        handlers::upload::upload_image,
        handlers::account::register, handlers::account::login, handlers::account::verify,
        handlers::account::resend, handlers::account::get_me
    ),
    components(
        schemas(
            models::Role, models::PriceRange, models::OtpKind, models::User,
            models::Restaurant, models::RestaurantDetail, models::Dish,
            models::CreateRestaurantRequest, models::UpdateRestaurantRequest,
            models::CreateDishRequest, models::UpdateDishRequest, models::UpdateUserRoleRequest,
            models::RegisterRequest, models::LoginRequest, models::VerifyRequest,
            models::ResendRequest, models::RestaurantList, models::DishList,
            models::MessageResponse, models::OtpIssuedResponse, models::RegisterResponse,
            models::LoginResponse, models::UploadResponse, models::DashboardStats,
            models::ActivityItem, models::PlatformStats, scope::Pagination, error::ErrorBody,
            handlers::upload::ModerationRejection,
        )
    ),
    tags(
        (name = "restaurants", description = "Restaurant management (admin, owner)"),
        (name = "dishes", description = "Dish management (admin, owner)"),
        (name = "users", description = "User role management (admin)"),
        (name = "stats", description = "Dashboard counters"),
        (name = "upload", description = "Moderated image upload"),
        (name = "account", description = "Registration, login and verification")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single immutable container of shared services, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Object storage for uploaded images.
    pub storage: StorageState,
    /// Image moderation classifier.
    pub moderator: ModeratorState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for ModeratorState {
    fn from_ref(app_state: &AppState) -> ModeratorState {
        app_state.moderator.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless a `Principal` can be resolved. Used on the
/// authenticated router; admin handlers resolve the principal themselves.
async fn auth_middleware(_principal: Principal, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles every route, the Swagger UI and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Outermost: tag the request, then trace it, then echo the id back.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span carrying method, uri and `x-request-id`, so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
