use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::require_admin;
use crate::{
    AppState,
    auth::{self, AuthUser, RefreshIdentity},
    error::{ApiJson, AppError, Result},
    lifecycle::{self, require},
    models::{
        AdminChanges, AdminUpdateRegistrationRequest, AdminUser, ApiMessage, ApiResponse,
        BulkEmailRequest, BulkEmailResult, ContactMessage, CreateAdminRequest, LoginRequest,
        LoginResponse, PaperSubmission, RefreshResponse, Registration, RegistrationStatus,
        ReviewPaperRequest, UpdateAdminRequest, UpdateMessageRequest,
    },
    query::{
        ADMIN_PAGE_SIZE, FilterMode, ListParams, MessageFilter, PageRequest, PaperFilter,
        RegistrationFilter,
    },
    reports::{self, DashboardStats, SummaryParams, SummaryReport},
    triage,
};

// --- Session ---

/// admin_login
///
/// [Public Route] Exchanges a username and password for an access/refresh token pair.
/// Unknown users and wrong passwords both answer 401 `Invalid credentials`.
#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials or disabled account")
    ),
    tag = "admin"
)]
pub async fn admin_login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    let (Some(username), Some(password)) = (
        payload.username.as_deref().filter(|u| !u.is_empty()),
        payload.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("Username and password are required"));
    };

    let session = auth::authenticate(&state.repo, &state.config, username, password).await?;
    Ok(Json(ApiResponse::with_message("Login successful", session)))
}

/// refresh_token
///
/// [Public Route] Requires a refresh token as the bearer credential, never an access token.
#[utoipa::path(
    post,
    path = "/api/admin/refresh",
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Missing, expired or wrong kind of token; account disabled"),
        (status = 404, description = "Account no longer exists")
    ),
    tag = "admin"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    identity: RefreshIdentity,
) -> Result<Json<ApiResponse<RefreshResponse>>> {
    let refreshed = auth::refresh(&state.repo, &state.config, &identity).await?;
    Ok(Json(ApiResponse::ok(refreshed)))
}

// --- Dashboard & Reports ---

/// get_dashboard
///
/// [Admin Route] Headline counts, 7-day activity, category breakdowns and the
/// six-point registration trend.
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses((status = 200, description = "Dashboard statistics", body = DashboardStats)),
    tag = "admin"
)]
pub async fn get_dashboard(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardStats>>> {
    let stats = reports::load_dashboard(state.repo.as_ref(), Utc::now()).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// get_summary_report
///
/// [Admin Route] Counts and revenue for rows created inside `[start_date, end_date]`.
/// Defaults to the trailing 30 days.
#[utoipa::path(
    get,
    path = "/api/admin/reports/summary",
    params(SummaryParams),
    responses(
        (status = 200, description = "Summary report", body = SummaryReport),
        (status = 400, description = "Unparseable date")
    ),
    tag = "admin"
)]
pub async fn get_summary_report(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<ApiResponse<SummaryReport>>> {
    let period = reports::report_period(&params, Utc::now())?;
    let report = reports::load_summary(state.repo.as_ref(), period).await?;
    Ok(Json(ApiResponse::ok(report)))
}

fn csv_attachment(file_name: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={file_name}"),
            ),
        ],
        body,
    )
        .into_response()
}

/// export_registrations
///
/// [Admin Route] Every registration as CSV, oldest first.
#[utoipa::path(
    get,
    path = "/api/admin/export/registrations",
    responses((status = 200, description = "registrations.csv", content_type = "text/csv", body = String)),
    tag = "admin"
)]
pub async fn export_registrations(_auth: AuthUser, State(state): State<AppState>) -> Result<Response> {
    let rows = state.repo.all_registrations().await?;
    let body = reports::export_registrations_csv(&rows)?;
    Ok(csv_attachment("registrations.csv", body))
}

/// export_papers
///
/// [Admin Route] Every paper submission as CSV, oldest first.
#[utoipa::path(
    get,
    path = "/api/admin/export/papers",
    responses((status = 200, description = "papers.csv", content_type = "text/csv", body = String)),
    tag = "admin"
)]
pub async fn export_papers(_auth: AuthUser, State(state): State<AppState>) -> Result<Response> {
    let rows = state.repo.all_papers().await?;
    let body = reports::export_papers_csv(&rows)?;
    Ok(csv_attachment("papers.csv", body))
}

/// send_bulk_email
///
/// [Admin Route] Counts the registrants a mailing would reach. Nothing is sent.
/// `recipient_type` is `confirmed`, `pending`, or anything else for all registrants.
#[utoipa::path(
    post,
    path = "/api/admin/bulk-email",
    request_body = BulkEmailRequest,
    responses(
        (status = 200, description = "Recipients counted", body = BulkEmailResult),
        (status = 400, description = "Subject or message missing")
    ),
    tag = "admin"
)]
pub async fn send_bulk_email(
    _auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<BulkEmailRequest>,
) -> Result<Json<ApiResponse<BulkEmailResult>>> {
    let (Some(subject), Some(_message)) = (
        payload.subject.as_deref().filter(|s| !s.is_empty()),
        payload.message.as_deref().filter(|m| !m.is_empty()),
    ) else {
        return Err(AppError::validation("Subject and message are required"));
    };

    let recipient_type = payload.recipient_type.as_deref().unwrap_or("all");
    let status = match recipient_type {
        "confirmed" => Some(RegistrationStatus::Confirmed),
        "pending" => Some(RegistrationStatus::Pending),
        _ => None,
    };
    let count = state.repo.count_registrations(status).await?;
    tracing::info!(recipient_type, count, "bulk email queued");

    Ok(Json(ApiResponse::with_message(
        format!("Bulk email queued for {count} recipients"),
        BulkEmailResult {
            recipient_count: count as usize,
            subject: subject.to_string(),
            recipient_type: recipient_type.to_string(),
        },
    )))
}

// --- Settings ---

/// get_settings
///
/// [Admin Route] All conference settings as a flat `{key: value}` map.
#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses((status = 200, description = "Settings map", body = BTreeMap<String, String>)),
    tag = "admin"
)]
pub async fn get_settings(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<BTreeMap<String, String>>>> {
    let settings = state
        .repo
        .list_settings()
        .await?
        .into_iter()
        .map(|s| (s.key, s.value))
        .collect();
    Ok(Json(ApiResponse::ok(settings)))
}

/// update_settings
///
/// [Admin Route] Upserts every pair in the body in one transaction. Requires the
/// `admin` role. Non-string values are stored in their JSON text form.
#[utoipa::path(
    post,
    path = "/api/admin/settings",
    request_body = BTreeMap<String, String>,
    responses(
        (status = 200, description = "Settings saved", body = ApiMessage),
        (status = 403, description = "Not an admin")
    ),
    tag = "admin"
)]
pub async fn update_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Map<String, Value>>,
) -> Result<Json<ApiMessage>> {
    require_admin(&auth)?;
    let entries = payload
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect();
    state.repo.upsert_settings(entries, Utc::now()).await?;
    Ok(Json(ApiMessage::new("Settings updated successfully")))
}

// --- Registrations, Papers & Messages ---

/// admin_list_registrations
///
/// [Admin Route] Paginated, newest first. Unknown filter values are dropped rather than
/// rejected; `search` matches name, email and affiliation.
#[utoipa::path(
    get,
    path = "/api/admin/registrations",
    params(ListParams),
    responses((status = 200, description = "One page of registrations", body = [Registration])),
    tag = "admin"
)]
pub async fn admin_list_registrations(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<Registration>>>> {
    let filter = RegistrationFilter::from_params(&params, FilterMode::Lenient)?;
    let page = PageRequest::from_params(&params, ADMIN_PAGE_SIZE);
    let result = state.repo.list_registrations(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(result.items, result.pagination)))
}

/// admin_update_registration
///
/// [Admin Route] Status, payment and personal details. The category is not editable.
#[utoipa::path(
    put,
    path = "/api/admin/registrations/{id}",
    params(("id" = String, Path, description = "Registration ID")),
    request_body = AdminUpdateRegistrationRequest,
    responses(
        (status = 200, description = "Updated", body = Registration),
        (status = 400, description = "Invalid status or amount"),
        (status = 404, description = "Not Found")
    ),
    tag = "admin"
)]
pub async fn admin_update_registration(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<AdminUpdateRegistrationRequest>,
) -> Result<Json<ApiResponse<Registration>>> {
    let changes = lifecycle::admin_registration_changes(&payload)?;
    let registration = state
        .repo
        .update_registration(&id, changes, Utc::now())
        .await?
        .ok_or_else(|| AppError::not_found("Registration not found"))?;
    Ok(Json(ApiResponse::with_message(
        "Registration updated successfully",
        registration,
    )))
}

/// admin_list_papers
///
/// [Admin Route] Paginated, newest first; `search` matches title, authors and the
/// corresponding author's email.
#[utoipa::path(
    get,
    path = "/api/admin/papers",
    params(ListParams),
    responses((status = 200, description = "One page of submissions", body = [PaperSubmission])),
    tag = "admin"
)]
pub async fn admin_list_papers(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<PaperSubmission>>>> {
    let filter = PaperFilter::from_params(&params, FilterMode::Lenient)?;
    let page = PageRequest::from_params(&params, ADMIN_PAGE_SIZE);
    let result = state.repo.list_papers(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(result.items, result.pagination)))
}

/// admin_update_paper
///
/// [Admin Route] Like the review route, plus an overridable `review_deadline`.
#[utoipa::path(
    put,
    path = "/api/admin/papers/{id}",
    params(("id" = String, Path, description = "Submission ID")),
    request_body = ReviewPaperRequest,
    responses(
        (status = 200, description = "Updated", body = PaperSubmission),
        (status = 400, description = "Invalid status, score or deadline"),
        (status = 404, description = "Not Found")
    ),
    tag = "admin"
)]
pub async fn admin_update_paper(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ReviewPaperRequest>,
) -> Result<Json<ApiResponse<PaperSubmission>>> {
    let changes = lifecycle::paper_changes(&payload, true)?;
    let paper = state
        .repo
        .update_paper(&id, changes, Utc::now())
        .await?
        .ok_or_else(|| AppError::not_found("Paper submission not found"))?;
    Ok(Json(ApiResponse::with_message(
        "Paper submission updated successfully",
        paper,
    )))
}

/// admin_list_messages
///
/// [Admin Route] Paginated inbox; `search` matches name, email and subject.
#[utoipa::path(
    get,
    path = "/api/admin/messages",
    params(ListParams),
    responses((status = 200, description = "One page of messages", body = [ContactMessage])),
    tag = "admin"
)]
pub async fn admin_list_messages(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<ContactMessage>>>> {
    let filter = MessageFilter::from_params(&params);
    let page = PageRequest::from_params(&params, ADMIN_PAGE_SIZE);
    let result = state.repo.list_messages(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(result.items, result.pagination)))
}

/// admin_update_message
///
/// [Admin Route] Sets the status and/or records a response. The responder is the
/// token's username; a response on a `new` message promotes it to `responded`.
#[utoipa::path(
    put,
    path = "/api/admin/messages/{id}",
    params(("id" = String, Path, description = "Message ID")),
    request_body = UpdateMessageRequest,
    responses(
        (status = 200, description = "Updated", body = ContactMessage),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Not Found")
    ),
    tag = "admin"
)]
pub async fn admin_update_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateMessageRequest>,
) -> Result<Json<ApiResponse<ContactMessage>>> {
    let not_found = || AppError::not_found("Message not found");
    let current = state.repo.get_message(&id).await?.ok_or_else(not_found)?;

    let now = Utc::now();
    let changes = triage::admin_update(&current, &payload, &auth.username, now)?;
    let message = state
        .repo
        .update_message(&id, changes, now)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(ApiResponse::with_message(
        "Contact message updated successfully",
        message,
    )))
}

// --- Admin Accounts ---

fn user_not_found() -> AppError {
    AppError::not_found("User not found")
}

/// list_admin_users
///
/// [Admin Route] Requires the `admin` role. Password hashes are never serialized.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "Admin accounts", body = [AdminUser]),
        (status = 403, description = "Not an admin")
    ),
    tag = "admin"
)]
pub async fn list_admin_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AdminUser>>>> {
    require_admin(&auth)?;
    Ok(Json(ApiResponse::ok(state.repo.list_admins().await?)))
}

/// create_admin_user
///
/// [Admin Route] Requires the `admin` role. Username and email must both be unused.
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateAdminRequest,
    responses(
        (status = 201, description = "Account created", body = AdminUser),
        (status = 400, description = "Missing field, duplicate identity or invalid role"),
        (status = 403, description = "Not an admin")
    ),
    tag = "admin"
)]
pub async fn create_admin_user(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateAdminRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AdminUser>>)> {
    require_admin(&auth)?;
    let username = require(&payload.username, "username")?;
    let email = require(&payload.email, "email")?;
    let password = require(&payload.password, "password")?;
    let role = require(&payload.role, "role")?;

    if state
        .repo
        .admin_identity_taken(Some(username), Some(email), None)
        .await?
    {
        return Err(AppError::validation("Username or email already exists"));
    }
    let role = lifecycle::parse_admin_role(role)?;

    let password_hash = auth::hash_password(password)?;
    let user = state
        .repo
        .create_admin(
            username,
            email,
            &password_hash,
            role.as_str(),
            Utc::now(),
        )
        .await?;
    tracing::info!(admin_id = user.id, created_by = auth.id, "admin account created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Admin user created successfully", user)),
    ))
}

/// update_admin_user
///
/// [Admin Route] Requires the `admin` role. An empty password leaves the hash as is.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "Admin account id")),
    request_body = UpdateAdminRequest,
    responses(
        (status = 200, description = "Account updated", body = AdminUser),
        (status = 400, description = "Duplicate identity or invalid role"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    ),
    tag = "admin"
)]
pub async fn update_admin_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<UpdateAdminRequest>,
) -> Result<Json<ApiResponse<AdminUser>>> {
    require_admin(&auth)?;
    state.repo.get_admin(id).await?.ok_or_else(user_not_found)?;

    if let Some(username) = payload.username.as_deref() {
        if state
            .repo
            .admin_identity_taken(Some(username), None, Some(id))
            .await?
        {
            return Err(AppError::validation("Username already exists"));
        }
    }
    if let Some(email) = payload.email.as_deref() {
        if state
            .repo
            .admin_identity_taken(None, Some(email), Some(id))
            .await?
        {
            return Err(AppError::validation("Email already exists"));
        }
    }

    let changes = AdminChanges {
        username: payload.username.clone(),
        email: payload.email.clone(),
        password_hash: payload
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(auth::hash_password)
            .transpose()?,
        role: payload
            .role
            .as_deref()
            .map(lifecycle::parse_admin_role)
            .transpose()?
            .map(|r| r.as_str().to_string()),
        is_active: payload.is_active,
    };

    let user = state
        .repo
        .update_admin(id, changes)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(ApiResponse::with_message("User updated successfully", user)))
}

/// delete_admin_user
///
/// [Admin Route] Requires the `admin` role. An admin cannot delete their own account.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "Admin account id")),
    responses(
        (status = 200, description = "Account deleted", body = ApiMessage),
        (status = 400, description = "Attempt to delete own account"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    ),
    tag = "admin"
)]
pub async fn delete_admin_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiMessage>> {
    require_admin(&auth)?;
    state.repo.get_admin(id).await?.ok_or_else(user_not_found)?;
    if id == auth.id {
        return Err(AppError::validation("Cannot delete your own account"));
    }
    if !state.repo.delete_admin(id).await? {
        return Err(user_not_found());
    }
    tracing::info!(admin_id = id, deleted_by = auth.id, "admin account deleted");
    Ok(Json(ApiMessage::new("User deleted successfully")))
}
