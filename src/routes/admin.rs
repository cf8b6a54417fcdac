use crate::{AppState, handlers::admin};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// The back office, nested under `/admin`.
///
/// Access Control:
/// `login` and `refresh` are the only routes without an access token (`refresh` takes a
/// refresh token through the `RefreshIdentity` extractor instead). Every other handler
/// takes an `AuthUser`, so a missing or invalid token is rejected with 401 before the
/// handler body runs. Account management and settings writes then check for the exact
/// `admin` role and answer 403 otherwise.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Session ---
        .route("/login", post(admin::admin_login))
        .route("/refresh", post(admin::refresh_token))
        // --- Oversight ---
        .route("/dashboard", get(admin::get_dashboard))
        .route("/reports/summary", get(admin::get_summary_report))
        .route("/export/registrations", get(admin::export_registrations))
        .route("/export/papers", get(admin::export_papers))
        // POST /admin/bulk-email
        // Placeholder: counts recipients, delivers nothing.
        .route("/bulk-email", post(admin::send_bulk_email))
        // GET is open to any role; POST requires `admin`.
        .route(
            "/settings",
            get(admin::get_settings).post(admin::update_settings),
        )
        // --- Records ---
        .route("/registrations", get(admin::admin_list_registrations))
        .route("/registrations/{id}", put(admin::admin_update_registration))
        .route("/papers", get(admin::admin_list_papers))
        .route("/papers/{id}", put(admin::admin_update_paper))
        .route("/messages", get(admin::admin_list_messages))
        .route("/messages/{id}", put(admin::admin_update_message))
        // --- Accounts (admin role only) ---
        .route(
            "/users",
            get(admin::list_admin_users).post(admin::create_admin_user),
        )
        .route(
            "/users/{id}",
            put(admin::update_admin_user).delete(admin::delete_admin_user),
        )
}
