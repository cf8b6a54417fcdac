//! Contact message triage: subject buckets and the response workflow.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::{
    error::{AppError, Result},
    lifecycle::parse_message_status,
    models::{
        ContactMessage, MessageChanges, MessageStatus, RespondMessageRequest, SubjectOption,
        UpdateMessageRequest,
    },
};

/// Subject bucket used by the contact form and the message inbox filter.
/// A subject may fall into several buckets at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SubjectBucket {
    PaperSubmission,
    Registration,
    Accommodation,
    Programme,
    Sponsorship,
    General,
}

impl SubjectBucket {
    pub const ALL: [SubjectBucket; 6] = [
        SubjectBucket::PaperSubmission,
        SubjectBucket::Registration,
        SubjectBucket::Accommodation,
        SubjectBucket::Programme,
        SubjectBucket::Sponsorship,
        SubjectBucket::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectBucket::PaperSubmission => "paper-submission",
            SubjectBucket::Registration => "registration",
            SubjectBucket::Accommodation => "accommodation",
            SubjectBucket::Programme => "programme",
            SubjectBucket::Sponsorship => "sponsorship",
            SubjectBucket::General => "general",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubjectBucket::PaperSubmission => "Paper Submission",
            SubjectBucket::Registration => "Registration",
            SubjectBucket::Accommodation => "Accommodation",
            SubjectBucket::Programme => "Programme",
            SubjectBucket::Sponsorship => "Sponsorship",
            SubjectBucket::General => "General Inquiry",
        }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            SubjectBucket::PaperSubmission => &["paper", "submission", "submit"],
            SubjectBucket::Registration => &["registration", "register", "signup"],
            SubjectBucket::Accommodation => &["accommodation", "hotel", "stay"],
            SubjectBucket::Programme => &["programme", "program", "schedule"],
            SubjectBucket::Sponsorship => &["sponsor", "partnership", "support"],
            SubjectBucket::General => &["general", "inquiry", "question"],
        }
    }

    /// Case-sensitive substring match against any of the bucket's keywords.
    pub fn matches(&self, subject: &str) -> bool {
        self.keywords().iter().any(|k| subject.contains(k))
    }
}

impl FromStr for SubjectBucket {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SubjectBucket::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| format!("unknown subject bucket: {s}"))
    }
}

/// Every bucket the subject falls into, in declaration order.
pub fn classify(subject: &str) -> Vec<SubjectBucket> {
    SubjectBucket::ALL
        .into_iter()
        .filter(|b| b.matches(subject))
        .collect()
}

pub fn subject_options() -> Vec<SubjectOption> {
    SubjectBucket::ALL
        .into_iter()
        .map(|b| SubjectOption {
            value: b.as_str().to_string(),
            label: b.label().to_string(),
        })
        .collect()
}

/// Admin inbox update.
///
/// An explicit status is applied first. A `response` key then records the answer, stamps
/// the responder and time, and promotes a still-`new` message to `responded` when the
/// answer is non-empty.
pub fn admin_update(
    current: &ContactMessage,
    req: &UpdateMessageRequest,
    responder: &str,
    now: DateTime<Utc>,
) -> Result<MessageChanges> {
    let mut status = current.status.clone();
    let mut changes = MessageChanges::default();

    if let Some(raw) = req.status.as_deref() {
        let parsed = parse_message_status(raw)?;
        status = parsed.as_str().to_string();
        changes.status = Some(status.clone());
    }

    if let Some(response) = &req.response {
        if !response.is_empty() && status == MessageStatus::New.as_str() {
            changes.status = Some(MessageStatus::Responded.as_str().to_string());
        }
        changes.response = Some(response.clone());
        changes.responded_by = Some(responder.to_string());
        changes.responded_at = Some(now);
    }

    Ok(changes)
}

/// `PUT /contact/{id}/respond`: both fields required, status forced to `responded`.
pub fn respond(req: &RespondMessageRequest, now: DateTime<Utc>) -> Result<MessageChanges> {
    let response = req
        .response
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::validation("Response text is required"))?;
    let responded_by = req
        .responded_by
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::validation("Responder name is required"))?;

    Ok(MessageChanges {
        status: Some(MessageStatus::Responded.as_str().to_string()),
        response: Some(response.to_string()),
        responded_by: Some(responded_by.to_string()),
        responded_at: Some(now),
    })
}

/// `PUT /contact/{id}/status`.
pub fn set_status(raw: Option<&str>) -> Result<MessageChanges> {
    let raw = raw
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("Status is required"))?;
    let status = parse_message_status(raw)?;
    Ok(MessageChanges {
        status: Some(status.as_str().to_string()),
        ..Default::default()
    })
}
