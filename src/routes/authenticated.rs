use crate::{
    AppState,
    handlers::{contact, papers, registration},
};
use axum::{
    Router,
    routing::{delete, get, put},
};

/// Authenticated Router Module
///
/// Destructive and reviewer-facing operations on the public resources. The router is
/// wrapped in the `auth_middleware` route layer by `create_router`, so every handler
/// here only runs for a request carrying a valid access token.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/registration/{id}", delete(registration::delete_registration))
        // PUT /papers/{id}/review
        // Status, comments and a 0-10 score; all validated before any write.
        .route("/papers/{id}/review", put(papers::review_paper))
        // DELETE /papers/{id}
        // Removes the row, then the stored upload.
        .route("/papers/{id}", delete(papers::delete_paper))
        // GET /contact/messages?status=&subject=
        .route("/contact/messages", get(contact::list_messages))
        .route("/contact/{id}/respond", put(contact::respond_to_message))
        .route("/contact/{id}/status", put(contact::update_message_status))
        .route("/contact/{id}", delete(contact::delete_message))
}
