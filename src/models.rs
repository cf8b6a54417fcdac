use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::{collections::BTreeMap, fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Enumerations ---

/// Generates `as_str`, `ALL`, `Display` and `FromStr` for a closed string enumeration.
/// The string form is the one stored in the database and exchanged over JSON.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {}: {other}", stringify!($name))),
                }
            }
        }
    };
}

/// Attendance category chosen at registration. Determines the fee and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum RegistrationCategory {
    Presenting,
    NonPresenting,
    Spectator,
    Student,
}

string_enum!(RegistrationCategory {
    Presenting => "presenting",
    NonPresenting => "non-presenting",
    Spectator => "spectator",
    Student => "student",
});

/// Registration status. Any value may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Paid,
}

string_enum!(RegistrationStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Paid => "paid",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum PaperCategory {
    Research,
    Review,
    CaseStudy,
    Position,
}

string_enum!(PaperCategory {
    Research => "research",
    Review => "review",
    CaseStudy => "case-study",
    Position => "position",
});

impl PaperCategory {
    /// Human readable name, e.g. "Case Study".
    pub fn label(&self) -> &'static str {
        match self {
            PaperCategory::Research => "Research",
            PaperCategory::Review => "Review",
            PaperCategory::CaseStudy => "Case Study",
            PaperCategory::Position => "Position",
        }
    }
}

/// Review status of a paper submission. Any value may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaperStatus {
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
    RevisionRequired,
}

string_enum!(PaperStatus {
    Submitted => "submitted",
    UnderReview => "under_review",
    Accepted => "accepted",
    Rejected => "rejected",
    RevisionRequired => "revision_required",
});

/// Workflow state of a contact message. Persisted as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    New,
    Read,
    Responded,
    Closed,
}

string_enum!(MessageStatus {
    New => "new",
    Read => "read",
    Responded => "responded",
    Closed => "closed",
});

/// Administrator roles. Only `admin` may manage accounts and settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Admin,
    Reviewer,
    Organizer,
}

string_enum!(AdminRole {
    Admin => "admin",
    Reviewer => "reviewer",
    Organizer => "organizer",
});

// --- Core Application Schemas (Mapped to Database) ---

/// Registration
///
/// A conference attendee record from the `registrations` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Registration {
    pub id: i64,
    // External identifier, `ICHR2026-REG-XXXXXXXX`.
    pub registration_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub affiliation: String,
    pub country: String,
    pub category: RegistrationCategory,
    pub paper_title: Option<String>,
    pub special_requirements: Option<String>,
    pub status: RegistrationStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    // Fixed from the fee table at creation, in the local currency.
    pub payment_amount: Option<f64>,
    pub payment_currency: Option<String>,
    // Free text; "paid" is the only value the revenue figure counts.
    pub payment_status: Option<String>,
    pub payment_reference: Option<String>,
}

/// PaperSubmission
///
/// A submitted paper and its review state from the `paper_submissions` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct PaperSubmission {
    pub id: i64,
    // External identifier, `ICHR2026-SUB-XXXXXXXX`.
    pub submission_id: String,
    pub title: String,

    /// Maps SQL column "abstract" to Rust field "abstract_text".
    /// `abstract` is a reserved keyword in Rust.
    #[sqlx(rename = "abstract")]
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    pub keywords: String,
    pub category: PaperCategory,
    pub authors: String,
    pub corresponding_author_email: String,
    pub affiliation: String,
    pub phone: String,

    // Stored upload. Name and path are written once, at submission.
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,

    pub status: PaperStatus,
    pub reviewer_comments: Option<String>,
    pub review_score: Option<f64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub review_deadline: Option<DateTime<Utc>>,
}

/// ContactMessage
///
/// An inquiry sent through the public contact form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct ContactMessage {
    pub id: i64,
    pub message_id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub response: Option<String>,
    pub responded_by: Option<String>,
    #[ts(type = "string | null")]
    pub responded_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ConferenceSetting
///
/// One key/value row of the `conference_settings` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct ConferenceSetting {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// AdminUser
///
/// An administrator account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    #[ts(type = "string | null")]
    pub last_login: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Response Envelopes ---

/// Pagination
///
/// Page metadata attached to every list response. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// ApiResponse
///
/// The success envelope: `{success: true, data, [message], [pagination]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
            pagination: None,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
            pagination: None,
        }
    }

    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            success: true,
            message: None,
            data,
            pagination: Some(pagination),
        }
    }
}

/// ApiMessage
///
/// Success envelope for operations that return no entity (deletes, queued jobs).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// CreateRegistrationRequest
///
/// Input for `POST /registration`. Field names follow the registration form (camelCase).
/// Every field is optional at the type level so that a missing field yields a
/// `Missing required field: X` validation error rather than a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegistrationRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub affiliation: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub paper_title: Option<String>,
    pub special_requirements: Option<String>,
}

/// UpdateRegistrationRequest
///
/// Input for the public `PUT /registration/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateRegistrationRequest {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub payment_reference: Option<String>,
    pub special_requirements: Option<String>,
}

/// AdminUpdateRegistrationRequest
///
/// Input for `PUT /admin/registrations/{id}`. There is no category field:
/// it is fixed once the fee has been computed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminUpdateRegistrationRequest {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub payment_amount: Option<f64>,
    pub payment_reference: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub affiliation: Option<String>,
    pub country: Option<String>,
    pub special_requirements: Option<String>,
}

/// Validated registration changes, ready for the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationChanges {
    pub status: Option<RegistrationStatus>,
    pub payment_status: Option<String>,
    pub payment_amount: Option<f64>,
    pub payment_reference: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub affiliation: Option<String>,
    pub country: Option<String>,
    pub special_requirements: Option<String>,
}

/// Fields for a new registration after validation and fee lookup.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub registration_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub affiliation: String,
    pub country: String,
    pub category: RegistrationCategory,
    pub paper_title: Option<String>,
    pub special_requirements: Option<String>,
    pub payment_amount: f64,
    pub payment_currency: String,
}

/// ReviewPaperRequest
///
/// Input for `PUT /papers/{id}/review` and `PUT /admin/papers/{id}`.
/// `review_score` is kept as raw JSON so that non-numeric values can be rejected
/// with a domain message instead of a deserialization error. A missing key is `None`;
/// an explicit `null` arrives as `Some(Value::Null)`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ReviewPaperRequest {
    pub status: Option<String>,
    pub reviewer_comments: Option<String>,
    #[serde(default, deserialize_with = "present_json")]
    #[schema(value_type = Option<f64>)]
    pub review_score: Option<serde_json::Value>,
    /// ISO-8601 timestamp. Honoured on the admin route only.
    pub review_deadline: Option<String>,
}

fn present_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error> {
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Validated paper review changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperChanges {
    pub status: Option<PaperStatus>,
    pub reviewer_comments: Option<String>,
    pub review_score: Option<f64>,
    pub review_deadline: Option<DateTime<Utc>>,
}

/// Fields for a new paper submission, including the stored file metadata.
#[derive(Debug, Clone)]
pub struct NewPaperSubmission {
    pub submission_id: String,
    pub title: String,
    pub abstract_text: String,
    pub keywords: String,
    pub category: PaperCategory,
    pub authors: String,
    pub corresponding_author_email: String,
    pub affiliation: String,
    pub phone: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_type: String,
    pub review_deadline: DateTime<Utc>,
}

/// CreateContactRequest
///
/// Input for `POST /contact`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewContactMessage {
    pub message_id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// UpdateMessageRequest
///
/// Input for `PUT /admin/messages/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMessageRequest {
    pub status: Option<String>,
    pub response: Option<String>,
}

/// RespondMessageRequest
///
/// Input for `PUT /contact/{id}/respond`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RespondMessageRequest {
    pub response: Option<String>,
    pub responded_by: Option<String>,
}

/// MessageStatusRequest
///
/// Input for `PUT /contact/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageStatusRequest {
    pub status: Option<String>,
}

/// Message fields to write. Each `Some` overwrites the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageChanges {
    pub status: Option<String>,
    pub response: Option<String>,
    pub responded_by: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// The account summary returned alongside a fresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<&AdminUser> for AdminProfile {
    fn from(user: &AdminUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AdminProfile,
}

/// RefreshResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// CreateAdminRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateAdminRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// UpdateAdminRequest
///
/// Partial update of an admin account. An empty password leaves the hash untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAdminRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// Validated admin account changes. `password_hash` is already hashed.
#[derive(Debug, Clone, Default)]
pub struct AdminChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// BulkEmailRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BulkEmailRequest {
    pub subject: Option<String>,
    pub message: Option<String>,
    pub recipient_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BulkEmailResult {
    pub recipient_count: usize,
    pub subject: String,
    pub recipient_type: String,
}

// --- Lookup Tables ---

/// Fee for one registration category, in local (LKR) and international (USD) terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Fee {
    pub local: f64,
    pub global: f64,
}

pub type FeeTable = BTreeMap<String, Fee>;

/// `{id, name}` pair for the paper category picker.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CategoryOption {
    pub id: String,
    pub name: String,
}

/// `{value, label}` pair for the contact subject picker.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SubjectOption {
    pub value: String,
    pub label: String,
}
