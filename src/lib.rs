use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::{IntoResponse, Response},
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

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod membership;
pub mod models;
pub mod password;
pub mod repository;
pub mod session;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::{Admission, CurrentUser, admit_admin};
use error::ApiError;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use session::{InMemorySessionStore, SessionState};

/// ApiDoc
///
/// This struct auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application. It aggregates all API paths and data schemas decorated with the
/// `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    // List all public handler functions here for documentation generation.
    paths(
        handlers::sign_up, handlers::log_in, handlers::log_out, handlers::get_me,
        handlers::list_notes, handlers::create_note, handlers::get_note,
        handlers::update_note, handlers::delete_note,
        handlers::list_users, handlers::create_user, handlers::get_user_detail,
        handlers::update_user,
        handlers::list_roles, handlers::create_role, handlers::get_role_detail,
        handlers::update_role, handlers::delete_role, handlers::remove_role_member,
        handlers::list_departments, handlers::create_department,
        handlers::get_department_detail, handlers::update_department,
        handlers::delete_department, handlers::remove_department_member
    ),
    // List all models (schemas) used in the request/response bodies.
    components(
        schemas(
            models::Note, models::Role, models::Department, models::UserResponse,
            models::UserProfile, models::UserDetail, models::RoleDetail,
            models::DepartmentDetail, models::LoginResponse, models::SignUpRequest,
            models::LoginRequest, models::CreateNoteRequest, models::UpdateNoteRequest,
            models::CreateUserRequest, models::UpdateUserRequest,
            models::CreateRoleRequest, models::UpdateRoleRequest,
            models::CreateDepartmentRequest, models::UpdateDepartmentRequest,
            error::ErrorBody,
        )
    ),
    tags(
        (name = "notedesk", description = "Notes and organization management API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**. This is the single, thread-safe,
/// and immutable container holding all essential application services and
/// configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Session Layer: Maps opaque bearer tokens to signed-in users with idle expiry.
    pub sessions: SessionState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow extractors and handlers to selectively pull
// components from the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the `authenticated_routes`.
///
/// *Mechanism*: It attempts to extract `CurrentUser` from the request. Since
/// `CurrentUser` implements `FromRequestParts`, if authentication (session
/// resolution, DB lookup) fails, the extractor rejects the request with a 401
/// before the handler runs. On success the request proceeds unchanged.
async fn auth_middleware(_user: CurrentUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// admin_middleware
///
/// Enforces both gates for the admin routes: the `CurrentUser` extractor
/// authenticates (401 on failure), then the `admit_admin` guard decides
/// admission. A `Denied` admission short-circuits with a 403 "insufficient
/// permission" response; the handler executes exactly once on `Allowed`.
async fn admin_middleware(user: CurrentUser, request: Request, next: Next) -> Response {
    match admit_admin(&user) {
        Admission::Allowed => next.run(request).await,
        Admission::Denied { reason } => {
            tracing::warn!("admin access denied for '{}': {}", user.username, reason);
            ApiError::InsufficientPermission.into_response()
        }
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: Protected by the authentication gate.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Admin Routes: merged at the root (the paths are /users, /roles,
        // /departments) behind both gates. The admin layer authenticates and
        // authorizes, so the handlers never re-check the role.
        .merge(
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), admin_middleware)),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in a tracing
                // span, using `trace_span_logger` to include the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: returns the x-request-id header to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper function used by `TraceLayer` to customize tracing span creation.
/// It extracts the `x-request-id` header (if present) and includes it in the
/// structured logging metadata alongside the HTTP method and URI, so every log
/// line for a single request is correlated by a unique ID.
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
