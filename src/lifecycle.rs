//! Entity lifecycle rules: identifiers, fees, required fields, status parsing,
//! review scores, and upload naming.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        AdminRole, AdminUpdateRegistrationRequest, CreateContactRequest, CreateRegistrationRequest, Fee,
        FeeTable, MessageStatus, NewContactMessage, NewRegistration, PaperCategory, PaperChanges,
        PaperStatus, RegistrationCategory, RegistrationChanges, RegistrationStatus,
        ReviewPaperRequest, UpdateRegistrationRequest,
    },
};

pub const REGISTRATION_PREFIX: &str = "ICHR2026-REG";
pub const SUBMISSION_PREFIX: &str = "ICHR2026-SUB";
pub const MESSAGE_PREFIX: &str = "ICHR2026-MSG";

/// Currency every fee is charged in.
pub const LOCAL_CURRENCY: &str = "LKR";

pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

/// Days a reviewer has from submission until the review deadline.
pub const REVIEW_WINDOW_DAYS: i64 = 30;

pub const MAX_REVIEW_SCORE: f64 = 10.0;

/// `{PREFIX}-{8 uppercase hex}` from a fresh v4 UUID. Uniqueness is probabilistic;
/// the unique index on the external id column rejects the rare collision.
pub fn generate_external_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", hex[..8].to_uppercase())
}

pub fn fee_for(category: RegistrationCategory) -> Fee {
    match category {
        RegistrationCategory::Presenting => Fee { local: 5000.0, global: 65.0 },
        RegistrationCategory::NonPresenting => Fee { local: 4000.0, global: 60.0 },
        RegistrationCategory::Spectator => Fee { local: 3000.0, global: 50.0 },
        RegistrationCategory::Student => Fee { local: 0.0, global: 0.0 },
    }
}

pub fn fee_table() -> FeeTable {
    RegistrationCategory::ALL
        .iter()
        .map(|c| (c.as_str().to_string(), fee_for(*c)))
        .collect()
}

/// Returns a required text field, or `Missing required field: {name}` when it is
/// absent or empty.
pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("Missing required field: {name}"))),
    }
}

/// Empty strings count as "not provided" for optional free text.
fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}

// --- Registration ---

/// Validates a registration form and fixes its fee. The fee is read from the table
/// exactly once, here; later category or table changes never touch stored rows.
pub fn prepare_registration(req: &CreateRegistrationRequest) -> Result<NewRegistration> {
    let full_name = require(&req.full_name, "fullName")?;
    let email = require(&req.email, "email")?;
    let phone = require(&req.phone, "phone")?;
    let affiliation = require(&req.affiliation, "affiliation")?;
    let country = require(&req.country, "country")?;
    let category_raw = require(&req.category, "category")?;

    let category: RegistrationCategory = category_raw
        .parse()
        .map_err(|_| AppError::validation("Invalid registration category"))?;

    Ok(NewRegistration {
        registration_id: generate_external_id(REGISTRATION_PREFIX),
        full_name: full_name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        affiliation: affiliation.to_string(),
        country: country.to_string(),
        category,
        paper_title: non_empty(&req.paper_title),
        special_requirements: non_empty(&req.special_requirements),
        payment_amount: fee_for(category).local,
        payment_currency: LOCAL_CURRENCY.to_string(),
    })
}

pub fn parse_registration_status(raw: &str) -> Result<RegistrationStatus> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("Invalid status: {raw}")))
}

/// Public registration update: status and payment bookkeeping only.
pub fn registration_changes(req: &UpdateRegistrationRequest) -> Result<RegistrationChanges> {
    Ok(RegistrationChanges {
        status: req.status.as_deref().map(parse_registration_status).transpose()?,
        payment_status: req.payment_status.clone(),
        payment_reference: req.payment_reference.clone(),
        special_requirements: req.special_requirements.clone(),
        ..Default::default()
    })
}

/// Admin registration update. Personal fields and the amount may change; the category may not.
pub fn admin_registration_changes(
    req: &AdminUpdateRegistrationRequest,
) -> Result<RegistrationChanges> {
    if let Some(amount) = req.payment_amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AppError::validation("Payment amount must be a non-negative number"));
        }
    }
    Ok(RegistrationChanges {
        status: req.status.as_deref().map(parse_registration_status).transpose()?,
        payment_status: req.payment_status.clone(),
        payment_amount: req.payment_amount,
        payment_reference: req.payment_reference.clone(),
        full_name: req.full_name.clone(),
        email: req.email.clone(),
        phone: req.phone.clone(),
        affiliation: req.affiliation.clone(),
        country: req.country.clone(),
        special_requirements: req.special_requirements.clone(),
    })
}

// --- Papers ---

/// Case-insensitive extension check on the name the client supplied.
pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Reduces a client-supplied filename to a safe basename.
///
/// Directory components are dropped, whitespace becomes `_`, anything outside
/// `[A-Za-z0-9._-]` is removed, and leading/trailing `.`/`_` are trimmed.
pub fn secure_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                Some(c)
            } else {
                None
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `{submissionId}_{YYYYmmdd_HHMMSS}_{sanitized}`.
pub fn stored_file_name(submission_id: &str, original: &str, at: DateTime<Utc>) -> String {
    format!(
        "{submission_id}_{}_{}",
        at.format("%Y%m%d_%H%M%S"),
        secure_filename(original)
    )
}

/// Lowercased extension of the stored name; empty if it has none.
pub fn file_type_of(stored_name: &str) -> String {
    stored_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn review_deadline_from(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::days(REVIEW_WINDOW_DAYS)
}

pub fn parse_paper_category(raw: &str) -> Result<PaperCategory> {
    raw.parse()
        .map_err(|_| AppError::validation("Invalid paper category"))
}

pub fn parse_paper_status(raw: &str) -> Result<PaperStatus> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("Invalid status: {raw}")))
}

/// Accepts a JSON number within `[0, 10]`. Anything else, `null` included, is rejected.
pub fn validate_review_score(raw: &Value) -> Result<f64> {
    let invalid = || AppError::validation("Review score must be a number between 0 and 10");
    match raw {
        Value::Number(n) => {
            let score = n.as_f64().ok_or_else(invalid)?;
            if (0.0..=MAX_REVIEW_SCORE).contains(&score) {
                Ok(score)
            } else {
                Err(invalid())
            }
        }
        _ => Err(invalid()),
    }
}

/// Validates every field of a review update before anything is written, so an
/// invalid score never lets a valid status through.
pub fn paper_changes(req: &ReviewPaperRequest, allow_deadline: bool) -> Result<PaperChanges> {
    let status = req.status.as_deref().map(parse_paper_status).transpose()?;
    let review_score = req
        .review_score
        .as_ref()
        .map(validate_review_score)
        .transpose()?;
    let review_deadline = match req.review_deadline.as_deref() {
        Some(raw) if allow_deadline && !raw.is_empty() => Some(
            parse_timestamp(raw)
                .ok_or_else(|| AppError::Validation(format!("Invalid review deadline: {raw}")))?,
        ),
        _ => None,
    };
    Ok(PaperChanges {
        status,
        reviewer_comments: req.reviewer_comments.clone(),
        review_score,
        review_deadline,
    })
}

// --- Contact ---

pub fn prepare_contact(req: &CreateContactRequest) -> Result<NewContactMessage> {
    let name = require(&req.name, "name")?;
    let email = require(&req.email, "email")?;
    let subject = require(&req.subject, "subject")?;
    let message = require(&req.message, "message")?;

    if !email.contains('@') || !email.contains('.') {
        return Err(AppError::validation("Invalid email format"));
    }

    Ok(NewContactMessage {
        message_id: generate_external_id(MESSAGE_PREFIX),
        name: name.to_string(),
        email: email.to_string(),
        subject: subject.to_string(),
        message: message.to_string(),
    })
}

pub fn parse_message_status(raw: &str) -> Result<MessageStatus> {
    raw.parse().map_err(|_| {
        AppError::validation("Invalid status. Must be one of: new, read, responded, closed")
    })
}

// --- Admin Accounts ---

pub fn parse_admin_role(raw: &str) -> Result<AdminRole> {
    raw.parse().map_err(|_| {
        AppError::validation("Invalid role. Must be one of: admin, reviewer, organizer")
    })
}

// --- Timestamps ---

/// Parses an ISO-8601 timestamp: RFC 3339, a naive date-time (`T` or space separated,
/// taken as UTC), or a bare date at midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
