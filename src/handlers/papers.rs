use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Multipart, Path, Query, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tokio_util::io::ReaderStream;

use crate::{
    AppState,
    error::{ApiJson, AppError, Result},
    lifecycle::{self, require},
    models::{
        ApiMessage, ApiResponse, CategoryOption, NewPaperSubmission, PaperCategory,
        PaperSubmission, ReviewPaperRequest,
    },
    query::{FilterMode, ListParams, PUBLIC_PAGE_SIZE, PageRequest, PaperFilter},
    reports::{self, PaperStats},
};

fn not_found() -> AppError {
    AppError::not_found("Paper submission not found")
}

/// Raw multipart submission. Text parts are collected by name; the `file` part keeps
/// the client-supplied name alongside its bytes.
#[derive(Default)]
struct SubmissionForm {
    title: Option<String>,
    abstract_text: Option<String>,
    keywords: Option<String>,
    category: Option<String>,
    authors: Option<String>,
    email: Option<String>,
    affiliation: Option<String>,
    phone: Option<String>,
    file: Option<(String, Bytes)>,
}

impl SubmissionForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = SubmissionForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.file = Some((file_name, bytes));
                continue;
            }
            let slot = match name.as_str() {
                "title" => &mut form.title,
                "abstract" => &mut form.abstract_text,
                "keywords" => &mut form.keywords,
                "category" => &mut form.category,
                "authors" => &mut form.authors,
                "email" => &mut form.email,
                "affiliation" => &mut form.affiliation,
                "phone" => &mut form.phone,
                _ => continue,
            };
            *slot = Some(field.text().await?);
        }
        Ok(form)
    }
}

/// submit_paper
///
/// [Public Route] Accepts a multipart submission: eight text fields plus one `file` part.
///
/// The file checks run first, then the text fields in form order, then the category.
/// Nothing is written until every check has passed. The stored file is written before
/// the row; a failed insert leaves the file behind.
#[utoipa::path(
    post,
    path = "/api/papers/submit",
    request_body(content_type = "multipart/form-data", description = "title, abstract, keywords, category, authors, email, affiliation, phone, file"),
    responses(
        (status = 201, description = "Paper submitted", body = PaperSubmission),
        (status = 400, description = "Missing file, disallowed extension, missing field or invalid category"),
        (status = 500, description = "Storage failure")
    ),
    tag = "papers"
)]
pub async fn submit_paper(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PaperSubmission>>)> {
    let multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;
    let form = SubmissionForm::read(multipart).await?;

    let (original_name, bytes) = form
        .file
        .ok_or_else(|| AppError::validation("No file uploaded"))?;
    if original_name.is_empty() {
        return Err(AppError::validation("No file selected"));
    }
    if !lifecycle::allowed_file(&original_name) {
        return Err(AppError::validation(
            "Invalid file type. Only PDF, DOC, and DOCX files are allowed",
        ));
    }

    let title = require(&form.title, "title")?;
    let abstract_text = require(&form.abstract_text, "abstract")?;
    let keywords = require(&form.keywords, "keywords")?;
    let category = require(&form.category, "category")?;
    let authors = require(&form.authors, "authors")?;
    let email = require(&form.email, "email")?;
    let affiliation = require(&form.affiliation, "affiliation")?;
    let phone = require(&form.phone, "phone")?;
    let category = lifecycle::parse_paper_category(category)?;

    let now = Utc::now();
    let submission_id = lifecycle::generate_external_id(lifecycle::SUBMISSION_PREFIX);
    let stored_name = lifecycle::stored_file_name(&submission_id, &original_name, now);
    let stored = state.storage.save(&stored_name, &bytes).await?;

    let new = NewPaperSubmission {
        submission_id,
        title: title.to_string(),
        abstract_text: abstract_text.to_string(),
        keywords: keywords.to_string(),
        category,
        authors: authors.to_string(),
        corresponding_author_email: email.to_string(),
        affiliation: affiliation.to_string(),
        phone: phone.to_string(),
        file_type: lifecycle::file_type_of(&stored_name),
        file_name: stored_name,
        file_path: stored.path,
        file_size: stored.size,
        review_deadline: lifecycle::review_deadline_from(now),
    };
    let paper = state.repo.create_paper(new, now).await?;
    tracing::info!(submission_id = %paper.submission_id, size = paper.file_size, "paper submitted");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Paper submitted successfully", paper)),
    ))
}

/// get_paper
///
/// [Public Route] Fetches a submission by its external id.
#[utoipa::path(
    get,
    path = "/api/papers/{id}",
    params(("id" = String, Path, description = "Submission ID, e.g. ICHR2026-SUB-1A2B3C4D")),
    responses(
        (status = 200, description = "Found", body = PaperSubmission),
        (status = 404, description = "Not Found")
    ),
    tag = "papers"
)]
pub async fn get_paper(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PaperSubmission>>> {
    let paper = state.repo.get_paper(&id).await?.ok_or_else(not_found)?;
    Ok(Json(ApiResponse::ok(paper)))
}

/// list_papers
///
/// [Public Route] Paginated listing, newest first. Unknown `status` or `category`
/// values are rejected with 400; `author_email` is an exact match.
#[utoipa::path(
    get,
    path = "/api/papers",
    params(ListParams),
    responses(
        (status = 200, description = "One page of submissions", body = [PaperSubmission]),
        (status = 400, description = "Invalid filter")
    ),
    tag = "papers"
)]
pub async fn list_papers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<PaperSubmission>>>> {
    let filter = PaperFilter::from_params(&params, FilterMode::Strict)?;
    let page = PageRequest::from_params(&params, PUBLIC_PAGE_SIZE);
    let result = state.repo.list_papers(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(result.items, result.pagination)))
}

/// review_paper
///
/// [Authenticated Route] Records a review. All fields are validated before anything is
/// written, so an out-of-range score leaves the status untouched as well.
#[utoipa::path(
    put,
    path = "/api/papers/{id}/review",
    params(("id" = String, Path, description = "Submission ID")),
    request_body = ReviewPaperRequest,
    responses(
        (status = 200, description = "Review recorded", body = PaperSubmission),
        (status = 400, description = "Invalid status or score"),
        (status = 404, description = "Not Found")
    ),
    tag = "papers"
)]
pub async fn review_paper(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ReviewPaperRequest>,
) -> Result<Json<ApiResponse<PaperSubmission>>> {
    let changes = lifecycle::paper_changes(&payload, false)?;
    let paper = state
        .repo
        .update_paper(&id, changes, Utc::now())
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(ApiResponse::with_message(
        "Paper review updated successfully",
        paper,
    )))
}

/// delete_paper
///
/// [Authenticated Route] Deletes the row, then the stored file. A file that cannot be
/// removed is logged and otherwise ignored.
#[utoipa::path(
    delete,
    path = "/api/papers/{id}",
    params(("id" = String, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Deleted", body = ApiMessage),
        (status = 404, description = "Not Found")
    ),
    tag = "papers"
)]
pub async fn delete_paper(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiMessage>> {
    let paper = state.repo.delete_paper(&id).await?.ok_or_else(not_found)?;

    if let Some(path) = paper.file_path.as_deref() {
        if let Err(e) = state.storage.delete(path).await {
            tracing::warn!(submission_id = %id, "failed to remove stored file {}: {}", path, e);
        }
    }

    tracing::info!(submission_id = %id, "paper submission deleted");
    Ok(Json(ApiMessage::new("Paper submission deleted successfully")))
}

/// download_paper
///
/// [Public Route] Streams the stored file as an attachment named
/// `{submission_id}_{file_name}`.
#[utoipa::path(
    get,
    path = "/api/papers/{id}/download",
    params(("id" = String, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "The uploaded file", content_type = "application/octet-stream"),
        (status = 404, description = "Submission or file not found")
    ),
    tag = "papers"
)]
pub async fn download_paper(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let paper = state.repo.get_paper(&id).await?.ok_or_else(not_found)?;
    let missing_file = || AppError::not_found("Paper file not found");

    let path = paper.file_path.as_deref().ok_or_else(missing_file)?;
    let reader = state.storage.open(path).await?.ok_or_else(missing_file)?;

    let file_name = paper.file_name.unwrap_or_default();
    let content_type = mime_guess::from_path(&file_name)
        .first_or_octet_stream()
        .to_string();
    let disposition = format!(
        "attachment; filename=\"{}_{}\"",
        paper.submission_id, file_name
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(reader)),
    )
        .into_response())
}

/// get_categories
///
/// [Public Route] `[{id, name}]` for every paper category.
#[utoipa::path(
    get,
    path = "/api/papers/categories",
    responses((status = 200, description = "Paper categories", body = [CategoryOption])),
    tag = "papers"
)]
pub async fn get_categories() -> Json<ApiResponse<Vec<CategoryOption>>> {
    let categories = PaperCategory::ALL
        .iter()
        .map(|c| CategoryOption {
            id: c.as_str().to_string(),
            name: c.label().to_string(),
        })
        .collect();
    Json(ApiResponse::ok(categories))
}

/// get_paper_stats
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/papers/stats",
    responses((status = 200, description = "Submission statistics", body = PaperStats)),
    tag = "papers"
)]
pub async fn get_paper_stats(State(state): State<AppState>) -> Result<Json<ApiResponse<PaperStats>>> {
    let stats = reports::load_paper_stats(state.repo.as_ref(), Utc::now()).await?;
    Ok(Json(ApiResponse::ok(stats)))
}
