use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::sync::Arc;

use crate::{
    error::{AppError, Result},
    models::{
        AdminChanges, AdminUser, ConferenceSetting, ContactMessage, MessageChanges,
        NewContactMessage, NewPaperSubmission, NewRegistration, PaperChanges, PaperStatus,
        PaperSubmission, Registration, RegistrationChanges, RegistrationStatus,
    },
    query::{MessageFilter, Page, PageRequest, PaperFilter, RegistrationFilter},
    reports::{Breakdown, DateRange, Entity, MessageTally, PAID, PaperTally, RegistrationTally},
    triage::SubjectBucket,
};

/// Repository Trait
///
/// Abstract contract for all persistence operations. Handlers interact with the data
/// layer through `RepositoryState` only, so tests can run against an in-memory
/// database or a stub without touching handler code.
///
/// Lookups return `Ok(None)` for a missing row; `Err` is reserved for storage failures.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Registrations ---
    async fn create_registration(&self, new: NewRegistration, now: DateTime<Utc>) -> Result<Registration>;
    async fn get_registration(&self, registration_id: &str) -> Result<Option<Registration>>;
    async fn list_registrations(
        &self,
        filter: &RegistrationFilter,
        page: PageRequest,
    ) -> Result<Page<Registration>>;
    // Partial update: `None` fields keep their stored value.
    async fn update_registration(
        &self,
        registration_id: &str,
        changes: RegistrationChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Registration>>;
    async fn delete_registration(&self, registration_id: &str) -> Result<bool>;
    // Every row, oldest first. Feeds exports and aggregates.
    async fn all_registrations(&self) -> Result<Vec<Registration>>;
    async fn count_registrations(&self, status: Option<RegistrationStatus>) -> Result<i64>;

    // --- Paper Submissions ---
    async fn create_paper(&self, new: NewPaperSubmission, now: DateTime<Utc>) -> Result<PaperSubmission>;
    async fn get_paper(&self, submission_id: &str) -> Result<Option<PaperSubmission>>;
    async fn list_papers(&self, filter: &PaperFilter, page: PageRequest) -> Result<Page<PaperSubmission>>;
    async fn update_paper(
        &self,
        submission_id: &str,
        changes: PaperChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<PaperSubmission>>;
    // Returns the deleted row so the caller can remove its stored file.
    async fn delete_paper(&self, submission_id: &str) -> Result<Option<PaperSubmission>>;
    async fn all_papers(&self) -> Result<Vec<PaperSubmission>>;

    // --- Contact Messages ---
    async fn create_message(&self, new: NewContactMessage, now: DateTime<Utc>) -> Result<ContactMessage>;
    async fn get_message(&self, message_id: &str) -> Result<Option<ContactMessage>>;
    async fn list_messages(&self, filter: &MessageFilter, page: PageRequest) -> Result<Page<ContactMessage>>;
    async fn update_message(
        &self,
        message_id: &str,
        changes: MessageChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<ContactMessage>>;
    async fn delete_message(&self, message_id: &str) -> Result<bool>;

    // --- Aggregates ---
    /// Rows of `entity` created inside `range`.
    async fn count_created(&self, entity: Entity, range: DateRange) -> Result<i64>;
    async fn registration_tally(&self, range: DateRange) -> Result<RegistrationTally>;
    async fn paper_tally(&self, range: DateRange) -> Result<PaperTally>;
    async fn message_tally(&self, range: DateRange) -> Result<MessageTally>;

    // --- Conference Settings ---
    async fn list_settings(&self) -> Result<Vec<ConferenceSetting>>;
    /// Inserts or overwrites every pair in one transaction.
    async fn upsert_settings(&self, entries: Vec<(String, String)>, now: DateTime<Utc>) -> Result<()>;

    // --- Admin Accounts ---
    async fn get_admin(&self, id: i64) -> Result<Option<AdminUser>>;
    async fn get_admin_by_username(&self, username: &str) -> Result<Option<AdminUser>>;
    async fn list_admins(&self) -> Result<Vec<AdminUser>>;
    async fn create_admin(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<AdminUser>;
    async fn update_admin(&self, id: i64, changes: AdminChanges) -> Result<Option<AdminUser>>;
    async fn delete_admin(&self, id: i64) -> Result<bool>;
    /// The only writer of `last_login`.
    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()>;
    /// True when another account (other than `exclude_id`) already uses the username or email.
    async fn admin_identity_taken(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude_id: Option<i64>,
    ) -> Result<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// SqliteRepository
///
/// `Repository` backed by a SQLite pool.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Logs a storage failure under the operation's name before converting it.
fn db_err(op: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!("{} error: {:?}", op, e);
        AppError::from(e)
    }
}

fn like_pattern(search: &str) -> String {
    format!("%{}%", search)
}

// --- Filter builders ---
// Each pushes `AND ...` clauses after a `WHERE 1=1` already in the builder, so the same
// function serves both the count and the page query.

fn push_registration_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &RegistrationFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(category) = filter.category {
        builder.push(" AND category = ").push_bind(category);
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder.push(" AND (full_name LIKE ").push_bind(pattern.clone());
        builder.push(" OR email LIKE ").push_bind(pattern.clone());
        builder.push(" OR affiliation LIKE ").push_bind(pattern);
        builder.push(")");
    }
}

fn push_paper_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &PaperFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(category) = filter.category {
        builder.push(" AND category = ").push_bind(category);
    }
    if let Some(email) = &filter.author_email {
        builder
            .push(" AND corresponding_author_email = ")
            .push_bind(email.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder.push(" AND (title LIKE ").push_bind(pattern.clone());
        builder.push(" OR authors LIKE ").push_bind(pattern.clone());
        builder.push(" OR corresponding_author_email LIKE ").push_bind(pattern);
        builder.push(")");
    }
}

fn push_message_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &MessageFilter) {
    if let Some(status) = &filter.status {
        builder.push(" AND status = ").push_bind(status.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder.push(" AND (name LIKE ").push_bind(pattern.clone());
        builder.push(" OR email LIKE ").push_bind(pattern.clone());
        builder.push(" OR subject LIKE ").push_bind(pattern);
        builder.push(")");
    }
    if let Some(bucket) = filter.subject {
        push_subject_bucket(builder, bucket);
    }
}

fn push_subject_bucket(builder: &mut QueryBuilder<'_, Sqlite>, bucket: SubjectBucket) {
    // instr() is case-sensitive, unlike LIKE.
    builder.push(" AND (");
    for (i, keyword) in bucket.keywords().iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push("instr(subject, ").push_bind(*keyword).push(") > 0");
    }
    builder.push(")");
}

/// Timestamps are stored as RFC 3339 text in UTC, so text comparison follows time order.
fn push_range(builder: &mut QueryBuilder<'_, Sqlite>, range: DateRange) {
    if let Some(start) = range.start {
        builder.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = range.end {
        builder
            .push(if range.end_inclusive { " AND created_at <= " } else { " AND created_at < " })
            .push_bind(end);
    }
}

fn entity_table(entity: Entity) -> &'static str {
    match entity {
        Entity::Registrations => "registrations",
        Entity::Papers => "paper_submissions",
        Entity::Messages => "contact_messages",
    }
}

impl SqliteRepository {
    /// Runs the count, clamps the page, then fetches the rows for it.
    async fn paginate<T, F>(
        &self,
        op: &'static str,
        table: &str,
        page: PageRequest,
        push_filter: F,
    ) -> Result<Page<T>>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
        F: Fn(&mut QueryBuilder<'_, Sqlite>),
    {
        let mut count: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {table} WHERE 1=1"));
        push_filter(&mut count);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err(op))?;

        let (pagination, offset) = page.resolve(total);

        let mut select: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT * FROM {table} WHERE 1=1"));
        push_filter(&mut select);
        select.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        select.push_bind(pagination.per_page);
        select.push(" OFFSET ");
        select.push_bind(offset);

        let items = select
            .build_query_as::<T>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err(op))?;

        Ok(Page { items, pagination })
    }

    /// `COUNT(*)` over `table` inside `range`, narrowed further by `push_filter`.
    async fn count_in<F>(&self, op: &'static str, table: &str, range: DateRange, push_filter: F) -> Result<i64>
    where
        F: Fn(&mut QueryBuilder<'_, Sqlite>),
    {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {table} WHERE 1=1"));
        push_range(&mut builder, range);
        push_filter(&mut builder);
        builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err(op))
    }

    /// `COUNT(*) ... GROUP BY column` inside `range`, keyed by the stored value.
    async fn group_counts(
        &self,
        op: &'static str,
        table: &str,
        column: &str,
        range: DateRange,
    ) -> Result<Breakdown> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {column}, COUNT(*) FROM {table} WHERE 1=1"));
        push_range(&mut builder, range);
        builder.push(format!(" GROUP BY {column}"));
        let rows: Vec<(String, i64)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err(op))?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    // --- Registrations ---

    async fn create_registration(&self, new: NewRegistration, now: DateTime<Utc>) -> Result<Registration> {
        sqlx::query_as::<_, Registration>(
            r#"
            INSERT INTO registrations (
                registration_id, full_name, email, phone, affiliation, country, category,
                paper_title, special_requirements, status, created_at, updated_at,
                payment_amount, payment_currency, payment_status
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending')
            RETURNING *
            "#,
        )
        .bind(&new.registration_id)
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.affiliation)
        .bind(&new.country)
        .bind(new.category)
        .bind(&new.paper_title)
        .bind(&new.special_requirements)
        .bind(RegistrationStatus::Pending)
        .bind(now)
        .bind(now)
        .bind(new.payment_amount)
        .bind(&new.payment_currency)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("create_registration"))
    }

    async fn get_registration(&self, registration_id: &str) -> Result<Option<Registration>> {
        sqlx::query_as::<_, Registration>("SELECT * FROM registrations WHERE registration_id = ?")
            .bind(registration_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("get_registration"))
    }

    async fn list_registrations(
        &self,
        filter: &RegistrationFilter,
        page: PageRequest,
    ) -> Result<Page<Registration>> {
        self.paginate("list_registrations", "registrations", page, |b| {
            push_registration_filter(b, filter)
        })
        .await
    }

    async fn update_registration(
        &self,
        registration_id: &str,
        changes: RegistrationChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Registration>> {
        sqlx::query_as::<_, Registration>(
            r#"
            UPDATE registrations SET
                status = COALESCE(?, status),
                payment_status = COALESCE(?, payment_status),
                payment_amount = COALESCE(?, payment_amount),
                payment_reference = COALESCE(?, payment_reference),
                full_name = COALESCE(?, full_name),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                affiliation = COALESCE(?, affiliation),
                country = COALESCE(?, country),
                special_requirements = COALESCE(?, special_requirements),
                updated_at = ?
            WHERE registration_id = ?
            RETURNING *
            "#,
        )
        .bind(changes.status)
        .bind(changes.payment_status)
        .bind(changes.payment_amount)
        .bind(changes.payment_reference)
        .bind(changes.full_name)
        .bind(changes.email)
        .bind(changes.phone)
        .bind(changes.affiliation)
        .bind(changes.country)
        .bind(changes.special_requirements)
        .bind(now)
        .bind(registration_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("update_registration"))
    }

    async fn delete_registration(&self, registration_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM registrations WHERE registration_id = ?")
            .bind(registration_id)
            .execute(&self.pool)
            .await
            .map_err(db_err("delete_registration"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn all_registrations(&self) -> Result<Vec<Registration>> {
        sqlx::query_as::<_, Registration>("SELECT * FROM registrations ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("all_registrations"))
    }

    async fn count_registrations(&self, status: Option<RegistrationStatus>) -> Result<i64> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM registrations WHERE 1=1");
        if let Some(status) = status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("count_registrations"))
    }

    // --- Paper Submissions ---

    async fn create_paper(&self, new: NewPaperSubmission, now: DateTime<Utc>) -> Result<PaperSubmission> {
        sqlx::query_as::<_, PaperSubmission>(
            r#"
            INSERT INTO paper_submissions (
                submission_id, title, abstract, keywords, category, authors,
                corresponding_author_email, affiliation, phone,
                file_name, file_path, file_size, file_type,
                status, created_at, updated_at, review_deadline
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&new.submission_id)
        .bind(&new.title)
        .bind(&new.abstract_text)
        .bind(&new.keywords)
        .bind(new.category)
        .bind(&new.authors)
        .bind(&new.corresponding_author_email)
        .bind(&new.affiliation)
        .bind(&new.phone)
        .bind(&new.file_name)
        .bind(&new.file_path)
        .bind(new.file_size)
        .bind(&new.file_type)
        .bind(PaperStatus::Submitted)
        .bind(now)
        .bind(now)
        .bind(new.review_deadline)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("create_paper"))
    }

    async fn get_paper(&self, submission_id: &str) -> Result<Option<PaperSubmission>> {
        sqlx::query_as::<_, PaperSubmission>("SELECT * FROM paper_submissions WHERE submission_id = ?")
            .bind(submission_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("get_paper"))
    }

    async fn list_papers(&self, filter: &PaperFilter, page: PageRequest) -> Result<Page<PaperSubmission>> {
        self.paginate("list_papers", "paper_submissions", page, |b| {
            push_paper_filter(b, filter)
        })
        .await
    }

    async fn update_paper(
        &self,
        submission_id: &str,
        changes: PaperChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<PaperSubmission>> {
        sqlx::query_as::<_, PaperSubmission>(
            r#"
            UPDATE paper_submissions SET
                status = COALESCE(?, status),
                reviewer_comments = COALESCE(?, reviewer_comments),
                review_score = COALESCE(?, review_score),
                review_deadline = COALESCE(?, review_deadline),
                updated_at = ?
            WHERE submission_id = ?
            RETURNING *
            "#,
        )
        .bind(changes.status)
        .bind(changes.reviewer_comments)
        .bind(changes.review_score)
        .bind(changes.review_deadline)
        .bind(now)
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("update_paper"))
    }

    async fn delete_paper(&self, submission_id: &str) -> Result<Option<PaperSubmission>> {
        sqlx::query_as::<_, PaperSubmission>(
            "DELETE FROM paper_submissions WHERE submission_id = ? RETURNING *",
        )
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("delete_paper"))
    }

    async fn all_papers(&self) -> Result<Vec<PaperSubmission>> {
        sqlx::query_as::<_, PaperSubmission>("SELECT * FROM paper_submissions ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("all_papers"))
    }

    // --- Contact Messages ---

    async fn create_message(&self, new: NewContactMessage, now: DateTime<Utc>) -> Result<ContactMessage> {
        sqlx::query_as::<_, ContactMessage>(
            r#"
            INSERT INTO contact_messages (message_id, name, email, subject, message, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'new', ?, ?)
            RETURNING *
            "#,
        )
        .bind(&new.message_id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.subject)
        .bind(&new.message)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("create_message"))
    }

    async fn get_message(&self, message_id: &str) -> Result<Option<ContactMessage>> {
        sqlx::query_as::<_, ContactMessage>("SELECT * FROM contact_messages WHERE message_id = ?")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("get_message"))
    }

    async fn list_messages(&self, filter: &MessageFilter, page: PageRequest) -> Result<Page<ContactMessage>> {
        self.paginate("list_messages", "contact_messages", page, |b| {
            push_message_filter(b, filter)
        })
        .await
    }

    async fn update_message(
        &self,
        message_id: &str,
        changes: MessageChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<ContactMessage>> {
        sqlx::query_as::<_, ContactMessage>(
            r#"
            UPDATE contact_messages SET
                status = COALESCE(?, status),
                response = COALESCE(?, response),
                responded_by = COALESCE(?, responded_by),
                responded_at = COALESCE(?, responded_at),
                updated_at = ?
            WHERE message_id = ?
            RETURNING *
            "#,
        )
        .bind(changes.status)
        .bind(changes.response)
        .bind(changes.responded_by)
        .bind(changes.responded_at)
        .bind(now)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("update_message"))
    }

    async fn delete_message(&self, message_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE message_id = ?")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(db_err("delete_message"))?;
        Ok(result.rows_affected() > 0)
    }

    // --- Aggregates ---

    async fn count_created(&self, entity: Entity, range: DateRange) -> Result<i64> {
        self.count_in("count_created", entity_table(entity), range, |_| {})
            .await
    }

    async fn registration_tally(&self, range: DateRange) -> Result<RegistrationTally> {
        const OP: &str = "registration_tally";
        let mut totals: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*), TOTAL(CASE WHEN payment_status = ",
        );
        totals.push_bind(PAID);
        totals.push(" THEN payment_amount END) FROM registrations WHERE 1=1");
        push_range(&mut totals, range);
        let (total, revenue): (i64, f64) = totals
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err(OP))?;

        Ok(RegistrationTally {
            total,
            by_status: self.group_counts(OP, "registrations", "status", range).await?,
            by_category: self.group_counts(OP, "registrations", "category", range).await?,
            revenue,
        })
    }

    async fn paper_tally(&self, range: DateRange) -> Result<PaperTally> {
        const OP: &str = "paper_tally";
        let mut totals: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*), AVG(review_score) FROM paper_submissions WHERE 1=1");
        push_range(&mut totals, range);
        let (total, average_score): (i64, Option<f64>) = totals
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err(OP))?;

        Ok(PaperTally {
            total,
            by_status: self.group_counts(OP, "paper_submissions", "status", range).await?,
            by_category: self.group_counts(OP, "paper_submissions", "category", range).await?,
            average_score,
        })
    }

    async fn message_tally(&self, range: DateRange) -> Result<MessageTally> {
        const OP: &str = "message_tally";
        let total = self.count_in(OP, "contact_messages", range, |_| {}).await?;

        let mut by_subject = Breakdown::new();
        for bucket in SubjectBucket::ALL {
            let count = self
                .count_in(OP, "contact_messages", range, |b| push_subject_bucket(b, bucket))
                .await?;
            by_subject.insert(bucket.as_str().to_string(), count);
        }

        Ok(MessageTally {
            total,
            by_status: self.group_counts(OP, "contact_messages", "status", range).await?,
            by_subject,
        })
    }

    // --- Conference Settings ---

    async fn list_settings(&self) -> Result<Vec<ConferenceSetting>> {
        sqlx::query_as::<_, ConferenceSetting>("SELECT * FROM conference_settings ORDER BY key ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("list_settings"))
    }

    async fn upsert_settings(&self, entries: Vec<(String, String)>, now: DateTime<Utc>) -> Result<()> {
        // Dropping the transaction without commit rolls every entry back.
        let mut tx = self.pool.begin().await.map_err(db_err("upsert_settings"))?;
        for (key, value) in entries {
            sqlx::query(
                r#"
                INSERT INTO conference_settings (key, value, description, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
            )
            .bind(&key)
            .bind(&value)
            .bind(format!("Setting for {key}"))
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_err("upsert_settings"))?;
        }
        tx.commit().await.map_err(db_err("upsert_settings"))
    }

    // --- Admin Accounts ---

    async fn get_admin(&self, id: i64) -> Result<Option<AdminUser>> {
        sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("get_admin"))
    }

    async fn get_admin_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("get_admin_by_username"))
    }

    async fn list_admins(&self) -> Result<Vec<AdminUser>> {
        sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("list_admins"))
    }

    async fn create_admin(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<AdminUser> {
        sqlx::query_as::<_, AdminUser>(
            r#"
            INSERT INTO admin_users (username, email, password_hash, role, is_active, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("create_admin"))
    }

    async fn update_admin(&self, id: i64, changes: AdminChanges) -> Result<Option<AdminUser>> {
        sqlx::query_as::<_, AdminUser>(
            r#"
            UPDATE admin_users SET
                username = COALESCE(?, username),
                email = COALESCE(?, email),
                password_hash = COALESCE(?, password_hash),
                role = COALESCE(?, role),
                is_active = COALESCE(?, is_active)
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.role)
        .bind(changes.is_active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("update_admin"))
    }

    async fn delete_admin(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM admin_users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("delete_admin"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE admin_users SET last_login = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("touch_last_login"))?;
        Ok(())
    }

    async fn admin_identity_taken(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        if username.is_none() && email.is_none() {
            return Ok(false);
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM admin_users WHERE (0");
        if let Some(username) = username {
            builder.push(" OR username = ").push_bind(username.to_string());
        }
        if let Some(email) = email {
            builder.push(" OR email = ").push_bind(email.to_string());
        }
        builder.push(")");
        if let Some(id) = exclude_id {
            builder.push(" AND id != ").push_bind(id);
        }
        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("admin_identity_taken"))?;
        Ok(count > 0)
    }
}
