use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
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

// Core application services and components.
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Domain rules, kept free of HTTP and SQL.
pub mod lifecycle;
pub mod query;
pub mod reports;
pub mod triage;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{RepositoryState, SqliteRepository};
pub use storage::{LocalFileStorage, MockStorageService, StorageState};

/// ApiDoc
///
/// OpenAPI document for every route, generated from the `#[utoipa::path]` and
/// `ToSchema` annotations. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::registration::create_registration, handlers::registration::get_registration,
        handlers::registration::update_registration, handlers::registration::delete_registration,
        handlers::registration::list_registrations, handlers::registration::get_fees,
        handlers::registration::get_registration_stats,
        handlers::papers::submit_paper, handlers::papers::get_paper, handlers::papers::list_papers,
        handlers::papers::review_paper, handlers::papers::delete_paper,
        handlers::papers::download_paper, handlers::papers::get_categories,
        handlers::papers::get_paper_stats,
        handlers::contact::create_message, handlers::contact::get_message,
        handlers::contact::list_messages, handlers::contact::respond_to_message,
        handlers::contact::update_message_status, handlers::contact::delete_message,
        handlers::contact::get_subjects, handlers::contact::get_contact_stats,
        handlers::admin::admin_login, handlers::admin::refresh_token,
        handlers::admin::get_dashboard, handlers::admin::get_summary_report,
        handlers::admin::export_registrations, handlers::admin::export_papers,
        handlers::admin::send_bulk_email, handlers::admin::get_settings,
        handlers::admin::update_settings, handlers::admin::admin_list_registrations,
        handlers::admin::admin_update_registration, handlers::admin::admin_list_papers,
        handlers::admin::admin_update_paper, handlers::admin::admin_list_messages,
        handlers::admin::admin_update_message, handlers::admin::list_admin_users,
        handlers::admin::create_admin_user, handlers::admin::update_admin_user,
        handlers::admin::delete_admin_user
    ),
    components(
        schemas(
            models::Registration, models::PaperSubmission, models::ContactMessage,
            models::ConferenceSetting, models::AdminUser, models::Pagination, models::ApiMessage,
            models::RegistrationCategory, models::RegistrationStatus, models::PaperCategory,
            models::PaperStatus, models::MessageStatus, models::AdminRole,
            models::CreateRegistrationRequest, models::UpdateRegistrationRequest,
            models::AdminUpdateRegistrationRequest, models::ReviewPaperRequest,
            models::CreateContactRequest, models::UpdateMessageRequest,
            models::RespondMessageRequest, models::MessageStatusRequest, models::LoginRequest,
            models::AdminProfile, models::LoginResponse, models::RefreshResponse,
            models::CreateAdminRequest, models::UpdateAdminRequest, models::BulkEmailRequest,
            models::BulkEmailResult, models::Fee, models::CategoryOption, models::SubjectOption,
            reports::DashboardStats, reports::RegistrationStats, reports::PaperStats,
            reports::ContactStats, reports::SummaryReport,
        )
    ),
    tags(
        (name = "registration", description = "Attendee registration"),
        (name = "papers", description = "Paper submission and review"),
        (name = "contact", description = "Contact form and inbox"),
        (name = "admin", description = "Back office")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container for the services shared by every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence, behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Paper upload store.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Lets handlers and extractors pull single components out of AppState.

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

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated router. Running the `AuthUser` extractor is the whole
/// check: a missing, expired or refresh-kind token is rejected with 401 before the
/// handler is reached.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routers under `/api`, applies the body limit and the observability
/// layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");
    let body_limit = state.config.max_upload_bytes;

    // 2. API Router Assembly
    let api = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin handlers authenticate through their own `AuthUser` argument.
        .nest("/admin", admin::admin_routes());

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        // Caps JSON and multipart bodies alike.
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID per incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echoes x-request-id on the response.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the `http_request` span for `TraceLayer`, carrying method, URI and the
/// `x-request-id` so every log line of one request can be correlated.
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
