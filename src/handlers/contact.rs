use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{
    AppState,
    error::{ApiJson, AppError, Result},
    lifecycle,
    models::{
        ApiMessage, ApiResponse, ContactMessage, CreateContactRequest, MessageChanges,
        MessageStatusRequest, RespondMessageRequest, SubjectOption,
    },
    query::{ListParams, MessageFilter, PUBLIC_PAGE_SIZE, PageRequest},
    reports::{self, ContactStats},
    triage,
};

fn not_found() -> AppError {
    AppError::not_found("Message not found")
}

/// Applies `changes` to a message, mapping a vanished row to 404.
async fn apply(state: &AppState, id: &str, changes: MessageChanges) -> Result<ContactMessage> {
    state
        .repo
        .update_message(id, changes, Utc::now())
        .await?
        .ok_or_else(not_found)
}

/// create_message
///
/// [Public Route] Stores a contact-form inquiry with status `new`.
#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = CreateContactRequest,
    responses(
        (status = 201, description = "Message received", body = ContactMessage),
        (status = 400, description = "Missing field or invalid email")
    ),
    tag = "contact"
)]
pub async fn create_message(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateContactRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ContactMessage>>)> {
    let new = lifecycle::prepare_contact(&payload)?;
    let message = state.repo.create_message(new, Utc::now()).await?;
    tracing::info!(message_id = %message.message_id, "contact message received");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Your message has been sent successfully. We will respond within 24 hours.",
            message,
        )),
    ))
}

/// get_message
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/contact/{id}",
    params(("id" = String, Path, description = "Message ID, e.g. ICHR2026-MSG-1A2B3C4D")),
    responses(
        (status = 200, description = "Found", body = ContactMessage),
        (status = 404, description = "Not Found")
    ),
    tag = "contact"
)]
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ContactMessage>>> {
    let message = state.repo.get_message(&id).await?.ok_or_else(not_found)?;
    Ok(Json(ApiResponse::ok(message)))
}

/// list_messages
///
/// [Authenticated Route] Paginated inbox. `status` is matched verbatim and `subject`
/// narrows to a keyword bucket; an unknown bucket is ignored.
#[utoipa::path(
    get,
    path = "/api/contact/messages",
    params(ListParams),
    responses((status = 200, description = "One page of messages", body = [ContactMessage])),
    tag = "contact"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<ContactMessage>>>> {
    let filter = MessageFilter::from_params(&params);
    let page = PageRequest::from_params(&params, PUBLIC_PAGE_SIZE);
    let result = state.repo.list_messages(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(result.items, result.pagination)))
}

/// respond_to_message
///
/// [Authenticated Route] Records a reply and marks the message `responded`,
/// whatever its previous status.
#[utoipa::path(
    put,
    path = "/api/contact/{id}/respond",
    params(("id" = String, Path, description = "Message ID")),
    request_body = RespondMessageRequest,
    responses(
        (status = 200, description = "Response recorded", body = ContactMessage),
        (status = 400, description = "Response or responder missing"),
        (status = 404, description = "Not Found")
    ),
    tag = "contact"
)]
pub async fn respond_to_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<RespondMessageRequest>,
) -> Result<Json<ApiResponse<ContactMessage>>> {
    state.repo.get_message(&id).await?.ok_or_else(not_found)?;
    let changes = triage::respond(&payload, Utc::now())?;
    let message = apply(&state, &id, changes).await?;
    Ok(Json(ApiResponse::with_message(
        "Response added successfully",
        message,
    )))
}

/// update_message_status
///
/// [Authenticated Route]
#[utoipa::path(
    put,
    path = "/api/contact/{id}/status",
    params(("id" = String, Path, description = "Message ID")),
    request_body = MessageStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ContactMessage),
        (status = 400, description = "Missing or invalid status"),
        (status = 404, description = "Not Found")
    ),
    tag = "contact"
)]
pub async fn update_message_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<MessageStatusRequest>,
) -> Result<Json<ApiResponse<ContactMessage>>> {
    state.repo.get_message(&id).await?.ok_or_else(not_found)?;
    let changes = triage::set_status(payload.status.as_deref())?;
    let message = apply(&state, &id, changes).await?;
    Ok(Json(ApiResponse::with_message(
        "Message status updated successfully",
        message,
    )))
}

/// delete_message
///
/// [Authenticated Route]
#[utoipa::path(
    delete,
    path = "/api/contact/{id}",
    params(("id" = String, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Deleted", body = ApiMessage),
        (status = 404, description = "Not Found")
    ),
    tag = "contact"
)]
pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiMessage>> {
    if !state.repo.delete_message(&id).await? {
        return Err(not_found());
    }
    Ok(Json(ApiMessage::new("Contact message deleted successfully")))
}

/// get_subjects
///
/// [Public Route] The subject buckets offered by the contact form.
#[utoipa::path(
    get,
    path = "/api/contact/subjects",
    responses((status = 200, description = "Subject buckets", body = [SubjectOption])),
    tag = "contact"
)]
pub async fn get_subjects() -> Json<ApiResponse<Vec<SubjectOption>>> {
    Json(ApiResponse::ok(triage::subject_options()))
}

/// get_contact_stats
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/contact/stats",
    responses((status = 200, description = "Message statistics", body = ContactStats)),
    tag = "contact"
)]
pub async fn get_contact_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ContactStats>>> {
    let stats = reports::load_contact_stats(state.repo.as_ref(), Utc::now()).await?;
    Ok(Json(ApiResponse::ok(stats)))
}
