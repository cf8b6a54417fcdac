//! Read-only reporting: dashboard, per-entity statistics, the windowed summary report,
//! and CSV exports.
//!
//! Counts and sums come from grouped queries in the repository (`*Tally`). The builders
//! here only shape them into payloads, taking the reference instant explicitly.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    error::{AppError, Result},
    lifecycle::parse_timestamp,
    models::{
        MessageStatus, PaperCategory, PaperStatus, PaperSubmission, Registration,
        RegistrationCategory, RegistrationStatus,
    },
    repository::Repository,
    triage::SubjectBucket,
};

pub type Breakdown = BTreeMap<String, i64>;

/// Activity window used by every "recent" figure.
pub const RECENT_DAYS: i64 = 7;
pub const TREND_BUCKETS: i64 = 6;
pub const TREND_BUCKET_DAYS: i64 = 30;
/// Window of the summary report when no start date is given.
pub const DEFAULT_REPORT_DAYS: i64 = 30;

/// `payment_status` value that counts towards revenue.
pub const PAID: &str = "paid";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct DashboardOverview {
    pub total_registrations: i64,
    pub pending_registrations: i64,
    pub confirmed_registrations: i64,
    pub total_papers: i64,
    pub pending_papers: i64,
    pub accepted_papers: i64,
    pub total_messages: i64,
    pub unread_messages: i64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct RecentActivity {
    pub recent_registrations: i64,
    pub recent_papers: i64,
    pub recent_messages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct DashboardBreakdowns {
    pub registration_by_category: BTreeMap<String, i64>,
    pub papers_by_category: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct TrendPoint {
    /// `YYYY-MM` of the bucket start.
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct DashboardTrends {
    pub monthly_registrations: Vec<TrendPoint>,
}

/// DashboardStats
///
/// Payload of `GET /admin/dashboard`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct DashboardStats {
    pub overview: DashboardOverview,
    pub recent_activity: RecentActivity,
    pub breakdowns: DashboardBreakdowns,
    pub trends: DashboardTrends,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct RegistrationStats {
    pub total_registrations: i64,
    pub category_breakdown: BTreeMap<String, i64>,
    pub status_breakdown: BTreeMap<String, i64>,
    pub recent_registrations: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct PaperStats {
    pub total_submissions: i64,
    pub category_breakdown: BTreeMap<String, i64>,
    pub status_breakdown: BTreeMap<String, i64>,
    pub recent_submissions: i64,
    pub pending_review: i64,
    /// Mean over scored papers, two decimals; null when nothing is scored.
    pub average_review_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct ContactStats {
    pub total_messages: i64,
    pub status_breakdown: BTreeMap<String, i64>,
    pub recent_messages: i64,
    pub unread_messages: i64,
    /// Percentage of messages in `responded`, two decimals.
    pub response_rate: f64,
    pub subject_breakdown: BTreeMap<String, i64>,
}

/// Query string of `GET /admin/reports/summary`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryParams {
    /// ISO-8601; defaults to 30 days before `end_date`'s default (now).
    #[serde(alias = "start")]
    pub start_date: Option<String>,
    /// ISO-8601; defaults to now.
    #[serde(alias = "end")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct ReportPeriod {
    #[ts(type = "string")]
    pub start_date: DateTime<Utc>,
    #[ts(type = "string")]
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct RegistrationSummary {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_category: BTreeMap<String, i64>,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct PaperSummary {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_category: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct MessageSummary {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
}

/// SummaryReport
///
/// Payload of `GET /admin/reports/summary`. Every figure only counts rows created
/// inside the inclusive period.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct SummaryReport {
    pub period: ReportPeriod,
    pub registrations: RegistrationSummary,
    pub papers: PaperSummary,
    pub messages: MessageSummary,
}

// --- Tallies ---

/// Creation-time window of an aggregate query. `start` is inclusive, `end` is inclusive
/// only when `end_inclusive` is set, and an absent bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub end_inclusive: bool,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            ..Self::default()
        }
    }

    /// `[start, end)`
    pub fn half_open(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            end_inclusive: false,
        }
    }

    /// `[period.start_date, period.end_date]`
    pub fn within(period: &ReportPeriod) -> Self {
        Self {
            start: Some(period.start_date),
            end: Some(period.end_date),
            end_inclusive: true,
        }
    }
}

/// Table an aggregate query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Registrations,
    Papers,
    Messages,
}

/// Registration counts as grouped by the database. Breakdowns only hold the keys
/// that occur.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationTally {
    pub total: i64,
    pub by_status: Breakdown,
    pub by_category: Breakdown,
    /// Sum of `payment_amount` over paid rows.
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperTally {
    pub total: i64,
    pub by_status: Breakdown,
    pub by_category: Breakdown,
    /// Mean over scored rows; `None` when nothing is scored.
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageTally {
    pub total: i64,
    pub by_status: Breakdown,
    /// Every subject bucket, including empty ones. Buckets overlap.
    pub by_subject: Breakdown,
}

// --- Helpers ---

/// Counts for every key in `keys`, in key order; keys missing from `counts` are 0 and
/// keys outside `keys` are dropped.
fn filled<'a>(keys: impl IntoIterator<Item = &'a str>, counts: &Breakdown) -> Breakdown {
    keys.into_iter()
        .map(|k| (k.to_string(), counts.get(k).copied().unwrap_or(0)))
        .collect()
}

fn registration_categories(counts: &Breakdown) -> Breakdown {
    filled(RegistrationCategory::ALL.iter().map(|c| c.as_str()), counts)
}

fn registration_statuses(counts: &Breakdown) -> Breakdown {
    filled(RegistrationStatus::ALL.iter().map(|s| s.as_str()), counts)
}

fn paper_categories(counts: &Breakdown) -> Breakdown {
    filled(PaperCategory::ALL.iter().map(|c| c.as_str()), counts)
}

fn paper_statuses(counts: &Breakdown) -> Breakdown {
    filled(PaperStatus::ALL.iter().map(|s| s.as_str()), counts)
}

fn message_statuses(counts: &Breakdown) -> Breakdown {
    filled(MessageStatus::ALL.iter().map(|s| s.as_str()), counts)
}

fn count_of(counts: &Breakdown, key: &str) -> i64 {
    counts.get(key).copied().unwrap_or(0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Six fixed 30-day windows walking backward from the first day of the current month,
/// labelled `YYYY-MM` by their start. The time of day of `now` is kept, and windows are
/// not calendar months.
pub fn trend_windows(now: DateTime<Utc>) -> Vec<(String, DateRange)> {
    let month_start = now - Duration::days(i64::from(now.day()) - 1);
    (0..TREND_BUCKETS)
        .map(|i| {
            let start = month_start - Duration::days(TREND_BUCKET_DAYS * i);
            let end = start + Duration::days(TREND_BUCKET_DAYS);
            (start.format("%Y-%m").to_string(), DateRange::half_open(start, end))
        })
        .collect()
}

// --- Aggregates ---

pub fn dashboard(
    registrations: &RegistrationTally,
    papers: &PaperTally,
    messages: &MessageTally,
    recent_activity: RecentActivity,
    monthly_registrations: Vec<TrendPoint>,
) -> DashboardStats {
    DashboardStats {
        overview: DashboardOverview {
            total_registrations: registrations.total,
            pending_registrations: count_of(&registrations.by_status, RegistrationStatus::Pending.as_str()),
            confirmed_registrations: count_of(&registrations.by_status, RegistrationStatus::Confirmed.as_str()),
            total_papers: papers.total,
            pending_papers: count_of(&papers.by_status, PaperStatus::Submitted.as_str()),
            accepted_papers: count_of(&papers.by_status, PaperStatus::Accepted.as_str()),
            total_messages: messages.total,
            unread_messages: count_of(&messages.by_status, MessageStatus::New.as_str()),
            total_revenue: registrations.revenue,
        },
        recent_activity,
        breakdowns: DashboardBreakdowns {
            registration_by_category: registration_categories(&registrations.by_category),
            papers_by_category: paper_categories(&papers.by_category),
        },
        trends: DashboardTrends { monthly_registrations },
    }
}

pub fn registration_stats(tally: &RegistrationTally, recent: i64) -> RegistrationStats {
    RegistrationStats {
        total_registrations: tally.total,
        category_breakdown: registration_categories(&tally.by_category),
        status_breakdown: registration_statuses(&tally.by_status),
        recent_registrations: recent,
    }
}

pub fn paper_stats(tally: &PaperTally, recent: i64) -> PaperStats {
    PaperStats {
        total_submissions: tally.total,
        category_breakdown: paper_categories(&tally.by_category),
        status_breakdown: paper_statuses(&tally.by_status),
        recent_submissions: recent,
        pending_review: count_of(&tally.by_status, PaperStatus::Submitted.as_str()),
        average_review_score: tally.average_score.map(round2),
    }
}

pub fn contact_stats(tally: &MessageTally, recent: i64) -> ContactStats {
    let responded = count_of(&tally.by_status, MessageStatus::Responded.as_str());
    let response_rate = if tally.total > 0 {
        round2(responded as f64 / tally.total as f64 * 100.0)
    } else {
        0.0
    };

    ContactStats {
        total_messages: tally.total,
        status_breakdown: message_statuses(&tally.by_status),
        recent_messages: recent,
        unread_messages: count_of(&tally.by_status, MessageStatus::New.as_str()),
        response_rate,
        subject_breakdown: filled(SubjectBucket::ALL.iter().map(|b| b.as_str()), &tally.by_subject),
    }
}

/// Resolves the report window. Absent bounds default to the trailing 30 days;
/// a value that is not ISO-8601 is a validation error.
pub fn report_period(params: &SummaryParams, now: DateTime<Utc>) -> Result<ReportPeriod> {
    let parse = |raw: &Option<String>, name: &str| -> Result<Option<DateTime<Utc>>> {
        match raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(v) => parse_timestamp(v)
                .map(Some)
                .ok_or_else(|| AppError::Validation(format!("Invalid {name}: {v}"))),
        }
    };
    let start_date = parse(&params.start_date, "start_date")?
        .unwrap_or_else(|| now - Duration::days(DEFAULT_REPORT_DAYS));
    let end_date = parse(&params.end_date, "end_date")?.unwrap_or(now);
    Ok(ReportPeriod { start_date, end_date })
}

/// Expects tallies already restricted to `DateRange::within(&period)`.
pub fn summary_report(
    registrations: &RegistrationTally,
    papers: &PaperTally,
    messages: &MessageTally,
    period: ReportPeriod,
) -> SummaryReport {
    SummaryReport {
        registrations: RegistrationSummary {
            total: registrations.total,
            by_status: registration_statuses(&registrations.by_status),
            by_category: registration_categories(&registrations.by_category),
            revenue: registrations.revenue,
        },
        papers: PaperSummary {
            total: papers.total,
            by_status: paper_statuses(&papers.by_status),
            by_category: paper_categories(&papers.by_category),
        },
        messages: MessageSummary {
            total: messages.total,
            by_status: message_statuses(&messages.by_status),
        },
        period,
    }
}

// --- Loaders ---
// Run the aggregate queries behind each report.

async fn recent(repo: &dyn Repository, entity: Entity, now: DateTime<Utc>) -> Result<i64> {
    repo.count_created(entity, DateRange::since(now - Duration::days(RECENT_DAYS)))
        .await
}

pub async fn load_dashboard(repo: &dyn Repository, now: DateTime<Utc>) -> Result<DashboardStats> {
    let registrations = repo.registration_tally(DateRange::all()).await?;
    let papers = repo.paper_tally(DateRange::all()).await?;
    let messages = repo.message_tally(DateRange::all()).await?;

    let recent_activity = RecentActivity {
        recent_registrations: recent(repo, Entity::Registrations, now).await?,
        recent_papers: recent(repo, Entity::Papers, now).await?,
        recent_messages: recent(repo, Entity::Messages, now).await?,
    };

    let mut trend = Vec::new();
    for (month, range) in trend_windows(now) {
        let count = repo.count_created(Entity::Registrations, range).await?;
        trend.push(TrendPoint { month, count });
    }

    Ok(dashboard(&registrations, &papers, &messages, recent_activity, trend))
}

pub async fn load_registration_stats(repo: &dyn Repository, now: DateTime<Utc>) -> Result<RegistrationStats> {
    let tally = repo.registration_tally(DateRange::all()).await?;
    Ok(registration_stats(&tally, recent(repo, Entity::Registrations, now).await?))
}

pub async fn load_paper_stats(repo: &dyn Repository, now: DateTime<Utc>) -> Result<PaperStats> {
    let tally = repo.paper_tally(DateRange::all()).await?;
    Ok(paper_stats(&tally, recent(repo, Entity::Papers, now).await?))
}

pub async fn load_contact_stats(repo: &dyn Repository, now: DateTime<Utc>) -> Result<ContactStats> {
    let tally = repo.message_tally(DateRange::all()).await?;
    Ok(contact_stats(&tally, recent(repo, Entity::Messages, now).await?))
}

pub async fn load_summary(repo: &dyn Repository, period: ReportPeriod) -> Result<SummaryReport> {
    let range = DateRange::within(&period);
    let registrations = repo.registration_tally(range).await?;
    let papers = repo.paper_tally(range).await?;
    let messages = repo.message_tally(range).await?;
    Ok(summary_report(&registrations, &papers, &messages, period))
}

// --- CSV Export ---

pub const REGISTRATION_CSV_HEADER: [&str; 12] = [
    "Registration ID",
    "Full Name",
    "Email",
    "Phone",
    "Affiliation",
    "Country",
    "Category",
    "Paper Title",
    "Status",
    "Payment Status",
    "Payment Amount",
    "Created At",
];

pub const PAPER_CSV_HEADER: [&str; 10] = [
    "Submission ID",
    "Title",
    "Authors",
    "Email",
    "Affiliation",
    "Category",
    "Status",
    "Review Score",
    "File Name",
    "Created At",
];

fn csv_timestamp(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn opt_number(v: Option<f64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Export failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("Export failed: {e}")))
}

/// One row per registration, in the order given. Absent values are empty cells.
pub fn export_registrations_csv(rows: &[Registration]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(REGISTRATION_CSV_HEADER)?;
    for r in rows {
        writer.write_record([
            r.registration_id.as_str(),
            r.full_name.as_str(),
            r.email.as_str(),
            r.phone.as_str(),
            r.affiliation.as_str(),
            r.country.as_str(),
            r.category.as_str(),
            r.paper_title.as_deref().unwrap_or(""),
            r.status.as_str(),
            r.payment_status.as_deref().unwrap_or(""),
            opt_number(r.payment_amount).as_str(),
            csv_timestamp(r.created_at).as_str(),
        ])?;
    }
    finish(writer)
}

pub fn export_papers_csv(rows: &[PaperSubmission]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(PAPER_CSV_HEADER)?;
    for p in rows {
        writer.write_record([
            p.submission_id.as_str(),
            p.title.as_str(),
            p.authors.as_str(),
            p.corresponding_author_email.as_str(),
            p.affiliation.as_str(),
            p.category.as_str(),
            p.status.as_str(),
            opt_number(p.review_score).as_str(),
            p.file_name.as_deref().unwrap_or(""),
            csv_timestamp(p.created_at).as_str(),
        ])?;
    }
    finish(writer)
}
