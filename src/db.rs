//! Database connection and idempotent schema setup.

use chrono::Utc;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::{str::FromStr, time::Duration};
use tracing::info;

use crate::{auth::hash_password, config::BootstrapAdmin, error::Result};

/// Rows inserted into `conference_settings` on first start. Existing keys are never overwritten.
pub const DEFAULT_SETTINGS: &[(&str, &str, &str)] = &[
    ("conference_name", "International Conference on Harmony Research 2026", "Official conference name"),
    ("conference_dates", "January 28-29, 2026", "Conference dates"),
    ("venue", "University of Vavuniya, Sri Lanka", "Conference venue"),
    ("registration_deadline", "2025-11-28", "Registration deadline"),
    ("paper_submission_deadline", "2025-11-15", "Paper submission deadline"),
    ("review_notification_date", "2025-12-20", "Review results notification date"),
    ("camera_ready_deadline", "2026-01-10", "Camera-ready submission deadline"),
    ("contact_email", "ichr2026@vau.ac.lk", "Main contact email"),
    ("website_url", "www.vau.ac.lk/ichr2026/", "Official website URL"),
    ("max_file_size_mb", "10", "Maximum file size for paper uploads in MB"),
];

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS registrations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        registration_id TEXT NOT NULL UNIQUE,
        full_name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT NOT NULL,
        affiliation TEXT NOT NULL,
        country TEXT NOT NULL,
        category TEXT NOT NULL,
        paper_title TEXT,
        special_requirements TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        payment_amount REAL,
        payment_currency TEXT DEFAULT 'LKR',
        payment_status TEXT DEFAULT 'pending',
        payment_reference TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS paper_submissions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        submission_id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        abstract TEXT NOT NULL,
        keywords TEXT NOT NULL,
        category TEXT NOT NULL,
        authors TEXT NOT NULL,
        corresponding_author_email TEXT NOT NULL,
        affiliation TEXT NOT NULL,
        phone TEXT NOT NULL,
        file_name TEXT,
        file_path TEXT,
        file_size INTEGER,
        file_type TEXT,
        status TEXT NOT NULL DEFAULT 'submitted',
        reviewer_comments TEXT,
        review_score REAL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        review_deadline TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contact_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        message_id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        subject TEXT NOT NULL,
        message TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'new',
        response TEXT,
        responded_by TEXT,
        responded_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS conference_settings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        key TEXT NOT NULL UNIQUE,
        value TEXT NOT NULL,
        description TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS admin_users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'admin',
        is_active INTEGER NOT NULL DEFAULT 1,
        last_login TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_registrations_created ON registrations (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_papers_created ON paper_submissions (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_messages_created ON contact_messages (created_at)",
];

/// init_database
///
/// Opens (creating if missing) the database named by `db_url`, then applies the schema
/// and default settings.
pub async fn init_database(db_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("Opened database: {}", db_url);
    init_schema(&pool).await?;
    Ok(pool)
}

/// connect_in_memory
///
/// A private in-memory database with the schema applied. The pool is pinned to one
/// connection that never expires, since every new SQLite memory connection would
/// start empty.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Creates all tables and indexes, then seeds default settings. Safe to run repeatedly.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    seed_default_settings(pool).await?;
    Ok(())
}

async fn seed_default_settings(pool: &SqlitePool) -> Result<()> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;
    for &(key, value, description) in DEFAULT_SETTINGS {
        sqlx::query(
            "INSERT OR IGNORE INTO conference_settings (key, value, description, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(key)
        .bind(value)
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Creates the configured administrator unless an account with that username or
/// email already exists. Returns whether a row was inserted.
pub async fn ensure_bootstrap_admin(pool: &SqlitePool, admin: &BootstrapAdmin) -> Result<bool> {
    let password_hash = hash_password(&admin.password)?;
    let result = sqlx::query(
        "INSERT OR IGNORE INTO admin_users (username, email, password_hash, role, is_active, created_at) \
         VALUES (?, ?, ?, 'admin', 1, ?)",
    )
    .bind(&admin.username)
    .bind(&admin.email)
    .bind(password_hash)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let created = result.rows_affected() > 0;
    if created {
        info!("Created bootstrap admin account '{}'", admin.username);
    }
    Ok(created)
}
