use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use std::collections::BTreeMap;

use crate::{
    AppState,
    error::{ApiJson, AppError, Result},
    lifecycle,
    models::{
        ApiMessage, ApiResponse, CreateRegistrationRequest, Fee, FeeTable, Registration,
        UpdateRegistrationRequest,
    },
    query::{FilterMode, ListParams, PUBLIC_PAGE_SIZE, PageRequest, RegistrationFilter},
    reports::{self, RegistrationStats},
};

fn not_found() -> AppError {
    AppError::not_found("Registration not found")
}

/// create_registration
///
/// [Public Route] Registers an attendee. The payment amount is fixed from the category's
/// local fee at this point and is never recomputed.
#[utoipa::path(
    post,
    path = "/api/registration",
    request_body = CreateRegistrationRequest,
    responses(
        (status = 201, description = "Registration submitted", body = Registration),
        (status = 400, description = "Missing field or invalid category")
    ),
    tag = "registration"
)]
pub async fn create_registration(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateRegistrationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Registration>>)> {
    let new = lifecycle::prepare_registration(&payload)?;
    let registration = state.repo.create_registration(new, Utc::now()).await?;
    tracing::info!(registration_id = %registration.registration_id, "registration created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Registration submitted successfully",
            registration,
        )),
    ))
}

/// get_registration
///
/// [Public Route] Fetches a registration by its external id.
#[utoipa::path(
    get,
    path = "/api/registration/{id}",
    params(("id" = String, Path, description = "Registration ID, e.g. ICHR2026-REG-1A2B3C4D")),
    responses(
        (status = 200, description = "Found", body = Registration),
        (status = 404, description = "Not Found")
    ),
    tag = "registration"
)]
pub async fn get_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Registration>>> {
    let registration = state.repo.get_registration(&id).await?.ok_or_else(not_found)?;
    Ok(Json(ApiResponse::ok(registration)))
}

/// update_registration
///
/// [Public Route] Updates status and payment bookkeeping. This route carries no token check.
#[utoipa::path(
    put,
    path = "/api/registration/{id}",
    params(("id" = String, Path, description = "Registration ID")),
    request_body = UpdateRegistrationRequest,
    responses(
        (status = 200, description = "Updated", body = Registration),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Not Found")
    ),
    tag = "registration"
)]
pub async fn update_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateRegistrationRequest>,
) -> Result<Json<ApiResponse<Registration>>> {
    let changes = lifecycle::registration_changes(&payload)?;
    let registration = state
        .repo
        .update_registration(&id, changes, Utc::now())
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(ApiResponse::with_message(
        "Registration updated successfully",
        registration,
    )))
}

/// delete_registration
///
/// [Authenticated Route] Removes a registration permanently.
#[utoipa::path(
    delete,
    path = "/api/registration/{id}",
    params(("id" = String, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Deleted", body = ApiMessage),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Not Found")
    ),
    tag = "registration"
)]
pub async fn delete_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiMessage>> {
    if !state.repo.delete_registration(&id).await? {
        return Err(not_found());
    }
    tracing::info!(registration_id = %id, "registration deleted");
    Ok(Json(ApiMessage::new("Registration deleted successfully")))
}

/// list_registrations
///
/// [Public Route] Paginated listing, newest first. Unknown `status` or `category`
/// values are rejected with 400.
#[utoipa::path(
    get,
    path = "/api/registrations",
    params(ListParams),
    responses(
        (status = 200, description = "One page of registrations", body = [Registration]),
        (status = 400, description = "Invalid filter")
    ),
    tag = "registration"
)]
pub async fn list_registrations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<Registration>>>> {
    let filter = RegistrationFilter::from_params(&params, FilterMode::Strict)?;
    let page = PageRequest::from_params(&params, PUBLIC_PAGE_SIZE);
    let result = state.repo.list_registrations(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(result.items, result.pagination)))
}

/// get_fees
///
/// [Public Route] The fee table, keyed by category.
#[utoipa::path(
    get,
    path = "/api/registration/fees",
    responses((status = 200, description = "Fees per category", body = BTreeMap<String, Fee>)),
    tag = "registration"
)]
pub async fn get_fees() -> Json<ApiResponse<FeeTable>> {
    Json(ApiResponse::ok(lifecycle::fee_table()))
}

/// get_registration_stats
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/registration/stats",
    responses((status = 200, description = "Registration statistics", body = RegistrationStats)),
    tag = "registration"
)]
pub async fn get_registration_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RegistrationStats>>> {
    let stats = reports::load_registration_stats(state.repo.as_ref(), Utc::now()).await?;
    Ok(Json(ApiResponse::ok(stats)))
}
