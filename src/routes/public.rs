use crate::{
    AppState,
    handlers::{contact, papers, registration},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token. This covers everything a prospective attendee or
/// author touches: submitting forms, looking up their own records by external id,
/// and the aggregate statistics shown on the conference site.
///
/// Note: `PUT /registration/{id}` and `GET /papers/{id}/download` are reachable without
/// a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers and uptime monitors.
        .route("/health", get(|| async { "ok" }))
        // --- Registration ---
        // POST /registration
        // Creates a registration; the fee is fixed from the category at this point.
        .route("/registration", post(registration::create_registration))
        .route("/registration/fees", get(registration::get_fees))
        .route("/registration/stats", get(registration::get_registration_stats))
        // GET/PUT /registration/{id}
        // DELETE on the same path lives in the authenticated router.
        .route(
            "/registration/{id}",
            get(registration::get_registration).put(registration::update_registration),
        )
        // GET /registrations?status=&category=&page=&per_page=
        // Unknown enum filter values are a 400 here.
        .route("/registrations", get(registration::list_registrations))
        // --- Papers ---
        // POST /papers/submit (multipart/form-data)
        .route("/papers/submit", post(papers::submit_paper))
        .route("/papers/categories", get(papers::get_categories))
        .route("/papers/stats", get(papers::get_paper_stats))
        .route("/papers", get(papers::list_papers))
        .route("/papers/{id}", get(papers::get_paper))
        .route("/papers/{id}/download", get(papers::download_paper))
        // --- Contact ---
        .route("/contact", post(contact::create_message))
        .route("/contact/subjects", get(contact::get_subjects))
        .route("/contact/stats", get(contact::get_contact_stats))
        .route("/contact/{id}", get(contact::get_message))
}
