use chrono::{Duration, Utc};
use std::collections::HashSet;
use ichr_portal::{
    db,
    lifecycle::{self, SUBMISSION_PREFIX, generate_external_id},
    models::{
        AdminChanges, CreateContactRequest, CreateRegistrationRequest, MessageChanges,
        NewPaperSubmission, PaperCategory, PaperChanges, PaperStatus, RegistrationCategory,
        RegistrationChanges, RegistrationStatus,
    },
    query::{MessageFilter, PageRequest, PaperFilter, RegistrationFilter},
    reports::{DateRange, Entity, RegistrationTally, ReportPeriod},
    repository::{Repository, SqliteRepository},
    triage::SubjectBucket,
};

// --- Setup Utilities ---

async fn setup() -> SqliteRepository {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to open in-memory database");
    SqliteRepository::new(pool)
}

fn registration_form(name: &str, category: &str) -> CreateRegistrationRequest {
    CreateRegistrationRequest {
        full_name: Some(name.to_string()),
        email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
        phone: Some("0771234567".to_string()),
        affiliation: Some("University of Jaffna".to_string()),
        country: Some("Sri Lanka".to_string()),
        category: Some(category.to_string()),
        ..Default::default()
    }
}

fn new_paper(title: &str, email: &str, category: PaperCategory) -> NewPaperSubmission {
    let now = Utc::now();
    let submission_id = generate_external_id(SUBMISSION_PREFIX);
    let stored = format!("{submission_id}_paper.pdf");
    NewPaperSubmission {
        submission_id,
        title: title.to_string(),
        abstract_text: "Abstract".to_string(),
        keywords: "harmony, music".to_string(),
        category,
        authors: "First Author; Second Author".to_string(),
        corresponding_author_email: email.to_string(),
        affiliation: "University of Vavuniya".to_string(),
        phone: "0770000000".to_string(),
        file_name: stored.clone(),
        file_path: format!("mock-uploads/{stored}"),
        file_size: 1024,
        file_type: "pdf".to_string(),
        review_deadline: lifecycle::review_deadline_from(now),
    }
}

fn contact_form(subject: &str) -> CreateContactRequest {
    CreateContactRequest {
        name: Some("Visitor".to_string()),
        email: Some("visitor@example.com".to_string()),
        subject: Some(subject.to_string()),
        message: Some("Hello there".to_string()),
    }
}

fn first_page(per_page: i64) -> PageRequest {
    PageRequest { page: 1, per_page }
}

fn assert_external_id(id: &str, prefix: &str) {
    let (head, hex) = id.rsplit_once('-').unwrap();
    assert_eq!(head, prefix, "{id}");
    assert_eq!(hex.len(), 8, "{id}");
    assert!(
        hex.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)),
        "{id}"
    );
}

// --- Schema ---

#[tokio::test]
async fn test_schema_seeds_default_settings_once() {
    let repo = setup().await;
    db::init_schema(repo.pool()).await.unwrap();

    let settings = repo.list_settings().await.unwrap();
    assert_eq!(settings.len(), db::DEFAULT_SETTINGS.len());
    // Ordered by key.
    assert_eq!(settings[0].key, "camera_ready_deadline");
}

#[tokio::test]
async fn test_bootstrap_admin_is_idempotent() {
    let repo = setup().await;
    let admin = ichr_portal::config::BootstrapAdmin {
        username: "admin".to_string(),
        email: "admin@ichr2026.org".to_string(),
        password: "admin123".to_string(),
    };

    assert!(db::ensure_bootstrap_admin(repo.pool(), &admin).await.unwrap());
    assert!(!db::ensure_bootstrap_admin(repo.pool(), &admin).await.unwrap());

    let stored = repo.get_admin_by_username("admin").await.unwrap().unwrap();
    assert_eq!(stored.role, "admin");
    assert!(stored.is_active);
    assert!(stored.password_hash.starts_with("$argon2id$"));
    assert!(ichr_portal::auth::verify_password("admin123", &stored.password_hash));
}

// --- Registrations ---

#[tokio::test]
async fn test_registration_create_defaults() {
    let repo = setup().await;
    let new = lifecycle::prepare_registration(&registration_form("Ada Perera", "student")).unwrap();
    let id = new.registration_id.clone();

    let created = repo.create_registration(new, Utc::now()).await.unwrap();
    assert_eq!(created.registration_id, id);
    assert_eq!(created.status, RegistrationStatus::Pending);
    assert_eq!(created.category, RegistrationCategory::Student);
    assert_eq!(created.payment_amount, Some(0.0));
    assert_eq!(created.payment_currency.as_deref(), Some("LKR"));
    assert_eq!(created.payment_status.as_deref(), Some("pending"));

    let fetched = repo.get_registration(&id).await.unwrap().unwrap();
    assert_eq!(fetched.id, created.id);
    assert!(repo.get_registration("ICHR2026-REG-NOPE").await.unwrap().is_none());
}

#[tokio::test]
async fn test_registration_partial_update_keeps_other_fields() {
    let repo = setup().await;
    let new = lifecycle::prepare_registration(&registration_form("Ada Perera", "presenting")).unwrap();
    let created = repo.create_registration(new, Utc::now()).await.unwrap();

    let later = Utc::now() + Duration::seconds(5);
    let updated = repo
        .update_registration(
            &created.registration_id,
            RegistrationChanges {
                status: Some(RegistrationStatus::Paid),
                payment_reference: Some("TX-991".to_string()),
                ..Default::default()
            },
            later,
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.status, RegistrationStatus::Paid);
    assert_eq!(updated.payment_reference.as_deref(), Some("TX-991"));
    assert_eq!(updated.full_name, "Ada Perera");
    assert_eq!(updated.payment_amount, Some(5000.0));
    assert_eq!(updated.category, RegistrationCategory::Presenting);
    assert_eq!(updated.updated_at, later);

    let missing = repo
        .update_registration("ICHR2026-REG-NOPE", RegistrationChanges::default(), later)
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_registration_listing_filters_and_orders() {
    let repo = setup().await;
    let base = Utc::now();
    for (i, (name, category)) in [
        ("Ada Perera", "student"),
        ("Ben Silva", "presenting"),
        ("Cara Fernando", "student"),
    ]
    .into_iter()
    .enumerate()
    {
        let new = lifecycle::prepare_registration(&registration_form(name, category)).unwrap();
        repo.create_registration(new, base + Duration::seconds(i as i64))
            .await
            .unwrap();
    }

    let all = repo
        .list_registrations(&RegistrationFilter::default(), first_page(10))
        .await
        .unwrap();
    assert_eq!(all.pagination.total, 3);
    // Newest first.
    assert_eq!(all.items[0].full_name, "Cara Fernando");

    let students = repo
        .list_registrations(
            &RegistrationFilter {
                category: Some(RegistrationCategory::Student),
                ..Default::default()
            },
            first_page(10),
        )
        .await
        .unwrap();
    assert_eq!(students.items.len(), 2);

    let search = repo
        .list_registrations(
            &RegistrationFilter {
                search: Some("silva".to_string()),
                ..Default::default()
            },
            first_page(10),
        )
        .await
        .unwrap();
    assert_eq!(search.items.len(), 1);
    assert_eq!(search.items[0].full_name, "Ben Silva");

    let paged = repo
        .list_registrations(&RegistrationFilter::default(), PageRequest { page: 7, per_page: 2 })
        .await
        .unwrap();
    assert_eq!(paged.pagination.page, 2);
    assert_eq!(paged.items.len(), 1);
    assert_eq!(paged.items[0].full_name, "Ada Perera");

    assert_eq!(repo.count_registrations(None).await.unwrap(), 3);
    assert_eq!(
        repo.count_registrations(Some(RegistrationStatus::Confirmed)).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_registration_delete() {
    let repo = setup().await;
    let new = lifecycle::prepare_registration(&registration_form("Ada Perera", "spectator")).unwrap();
    let created = repo.create_registration(new, Utc::now()).await.unwrap();

    assert!(repo.delete_registration(&created.registration_id).await.unwrap());
    assert!(!repo.delete_registration(&created.registration_id).await.unwrap());
    assert!(repo.all_registrations().await.unwrap().is_empty());
}

// --- Papers ---

#[tokio::test]
async fn test_paper_create_and_review() {
    let repo = setup().await;
    let paper = repo
        .create_paper(new_paper("Modal Harmony", "lead@example.com", PaperCategory::Research), Utc::now())
        .await
        .unwrap();
    assert_eq!(paper.status, PaperStatus::Submitted);
    assert_eq!(paper.file_type.as_deref(), Some("pdf"));
    assert!(paper.review_deadline.is_some());

    let reviewed = repo
        .update_paper(
            &paper.submission_id,
            PaperChanges {
                status: Some(PaperStatus::Accepted),
                review_score: Some(8.5),
                ..Default::default()
            },
            Utc::now(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reviewed.status, PaperStatus::Accepted);
    assert_eq!(reviewed.review_score, Some(8.5));
    assert_eq!(reviewed.file_name, paper.file_name);
    assert_eq!(reviewed.category, PaperCategory::Research);
}

#[tokio::test]
async fn test_paper_listing_filters() {
    let repo = setup().await;
    repo.create_paper(new_paper("Modal Harmony", "lead@example.com", PaperCategory::Research), Utc::now())
        .await
        .unwrap();
    repo.create_paper(new_paper("Tuning Systems", "other@example.com", PaperCategory::Review), Utc::now())
        .await
        .unwrap();

    let by_author = repo
        .list_papers(
            &PaperFilter {
                author_email: Some("lead@example.com".to_string()),
                ..Default::default()
            },
            first_page(20),
        )
        .await
        .unwrap();
    assert_eq!(by_author.items.len(), 1);
    assert_eq!(by_author.items[0].title, "Modal Harmony");

    let by_category = repo
        .list_papers(
            &PaperFilter {
                category: Some(PaperCategory::Review),
                ..Default::default()
            },
            first_page(20),
        )
        .await
        .unwrap();
    assert_eq!(by_category.items.len(), 1);

    let search = repo
        .list_papers(
            &PaperFilter {
                search: Some("TUNING".to_string()),
                ..Default::default()
            },
            first_page(20),
        )
        .await
        .unwrap();
    assert_eq!(search.pagination.total, 1);
}

#[tokio::test]
async fn test_paper_delete_returns_row() {
    let repo = setup().await;
    let paper = repo
        .create_paper(new_paper("Modal Harmony", "lead@example.com", PaperCategory::Position), Utc::now())
        .await
        .unwrap();

    let deleted = repo.delete_paper(&paper.submission_id).await.unwrap().unwrap();
    assert_eq!(deleted.file_path, paper.file_path);
    assert!(repo.delete_paper(&paper.submission_id).await.unwrap().is_none());
}

// --- Contact Messages ---

#[tokio::test]
async fn test_message_lifecycle() {
    let repo = setup().await;
    let new = lifecycle::prepare_contact(&contact_form("Hotel booking")).unwrap();
    let message = repo.create_message(new, Utc::now()).await.unwrap();
    assert_eq!(message.status, "new");
    assert!(message.response.is_none());

    let now = Utc::now();
    let updated = repo
        .update_message(
            &message.message_id,
            MessageChanges {
                status: Some("responded".to_string()),
                response: Some("Rooms are reserved.".to_string()),
                responded_by: Some("chair".to_string()),
                responded_at: Some(now),
            },
            now,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "responded");
    assert_eq!(updated.responded_at, Some(now));

    assert!(repo.delete_message(&message.message_id).await.unwrap());
    assert!(repo.get_message(&message.message_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_message_subject_bucket_filter_is_case_sensitive() {
    let repo = setup().await;
    for subject in ["hotel near campus", "Hotel near campus", "call for papers"] {
        let new = lifecycle::prepare_contact(&contact_form(subject)).unwrap();
        repo.create_message(new, Utc::now()).await.unwrap();
    }

    let accommodation = repo
        .list_messages(
            &MessageFilter {
                subject: Some(SubjectBucket::Accommodation),
                ..Default::default()
            },
            first_page(20),
        )
        .await
        .unwrap();
    assert_eq!(accommodation.items.len(), 1);
    assert_eq!(accommodation.items[0].subject, "hotel near campus");

    let unknown_status = repo
        .list_messages(
            &MessageFilter {
                status: Some("archived".to_string()),
                ..Default::default()
            },
            first_page(20),
        )
        .await
        .unwrap();
    assert_eq!(unknown_status.pagination.total, 0);
}

// --- Settings ---

#[tokio::test]
async fn test_upsert_settings_overwrites_and_inserts() {
    let repo = setup().await;
    repo.upsert_settings(
        vec![
            ("venue".to_string(), "Main Hall".to_string()),
            ("banquet".to_string(), "true".to_string()),
        ],
        Utc::now(),
    )
    .await
    .unwrap();

    let settings = repo.list_settings().await.unwrap();
    let venue = settings.iter().find(|s| s.key == "venue").unwrap();
    assert_eq!(venue.value, "Main Hall");
    assert_eq!(venue.description.as_deref(), Some("Conference venue"));

    let banquet = settings.iter().find(|s| s.key == "banquet").unwrap();
    assert_eq!(banquet.description.as_deref(), Some("Setting for banquet"));
}

// --- Admin Accounts ---

#[tokio::test]
async fn test_admin_account_crud() {
    let repo = setup().await;
    let now = Utc::now();
    let reviewer = repo
        .create_admin("rev", "rev@example.com", "hash", "reviewer", now)
        .await
        .unwrap();
    assert!(reviewer.is_active);
    assert!(reviewer.last_login.is_none());

    assert!(repo.admin_identity_taken(Some("rev"), None, None).await.unwrap());
    assert!(repo.admin_identity_taken(None, Some("rev@example.com"), None).await.unwrap());
    assert!(!repo.admin_identity_taken(Some("rev"), None, Some(reviewer.id)).await.unwrap());
    assert!(!repo.admin_identity_taken(None, None, None).await.unwrap());

    let updated = repo
        .update_admin(
            reviewer.id,
            AdminChanges {
                role: Some("organizer".to_string()),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.role, "organizer");
    assert!(!updated.is_active);
    assert_eq!(updated.password_hash, "hash");

    repo.touch_last_login(reviewer.id, now).await.unwrap();
    let reloaded = repo.get_admin(reviewer.id).await.unwrap().unwrap();
    assert_eq!(reloaded.last_login, Some(now));

    assert_eq!(repo.list_admins().await.unwrap().len(), 1);
    assert!(repo.delete_admin(reviewer.id).await.unwrap());
    assert!(repo.get_admin(reviewer.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_admin_duplicate_username_is_rejected_by_schema() {
    let repo = setup().await;
    let now = Utc::now();
    repo.create_admin("rev", "rev@example.com", "hash", "reviewer", now)
        .await
        .unwrap();
    assert!(
        repo.create_admin("rev", "other@example.com", "hash", "reviewer", now)
            .await
            .is_err()
    );
}

// --- Aggregates ---

#[tokio::test]
async fn test_tallies_group_in_sql_and_respect_ranges() {
    let repo = setup().await;
    let now = Utc::now();
    let old = now - Duration::days(40);

    for (name, category, created) in [
        ("Ada Perera", "presenting", now),
        ("Ravi Kumar", "non-presenting", now),
        ("Mala Silva", "spectator", old),
    ] {
        let new = lifecycle::prepare_registration(&registration_form(name, category)).unwrap();
        let created = repo.create_registration(new, created).await.unwrap();
        if category != "spectator" {
            repo.update_registration(
                &created.registration_id,
                RegistrationChanges {
                    status: Some(RegistrationStatus::Confirmed),
                    payment_status: Some("paid".to_string()),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        }
    }

    let all = repo.registration_tally(DateRange::all()).await.unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.revenue, 9000.0);
    assert_eq!(all.by_status["confirmed"], 2);
    assert_eq!(all.by_status["pending"], 1);
    assert_eq!(all.by_category["non-presenting"], 1);
    // Only observed keys come back from the grouping.
    assert!(!all.by_category.contains_key("student"));

    let recent = repo.registration_tally(DateRange::since(now - Duration::days(7))).await.unwrap();
    assert_eq!(recent.total, 2);
    assert_eq!(recent.revenue, 9000.0);

    let empty = repo
        .registration_tally(DateRange::half_open(old - Duration::days(5), old))
        .await
        .unwrap();
    assert_eq!(empty, RegistrationTally::default());

    // The inclusive end keeps a row created exactly at the bound.
    let period = ReportPeriod { start_date: old, end_date: old };
    assert_eq!(repo.count_created(Entity::Registrations, DateRange::within(&period)).await.unwrap(), 1);
    assert_eq!(
        repo.count_created(Entity::Registrations, DateRange::half_open(old, now)).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_paper_tally_averages_scored_rows_only() {
    let repo = setup().await;
    let now = Utc::now();
    assert_eq!(repo.paper_tally(DateRange::all()).await.unwrap().average_score, None);

    for (title, score) in [("Modal Harmony", Some(8.0)), ("Tuning Systems", Some(5.5)), ("Raga Form", None)] {
        let paper = repo
            .create_paper(new_paper(title, "lead@example.com", PaperCategory::Research), now)
            .await
            .unwrap();
        if let Some(score) = score {
            repo.update_paper(
                &paper.submission_id,
                PaperChanges {
                    status: Some(PaperStatus::Accepted),
                    review_score: Some(score),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        }
    }

    let tally = repo.paper_tally(DateRange::all()).await.unwrap();
    assert_eq!(tally.total, 3);
    assert_eq!(tally.average_score, Some(6.75));
    assert_eq!(tally.by_status["accepted"], 2);
    assert_eq!(tally.by_status["submitted"], 1);
    assert_eq!(tally.by_category["research"], 3);
    assert_eq!(repo.count_created(Entity::Papers, DateRange::all()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_message_tally_counts_every_subject_bucket() {
    let repo = setup().await;
    for subject in ["registration question", "sponsor package", "unrelated", "Hotel booking"] {
        let new = lifecycle::prepare_contact(&contact_form(subject)).unwrap();
        repo.create_message(new, Utc::now()).await.unwrap();
    }

    let tally = repo.message_tally(DateRange::all()).await.unwrap();
    assert_eq!(tally.total, 4);
    assert_eq!(tally.by_status["new"], 4);
    assert_eq!(tally.by_subject.len(), SubjectBucket::ALL.len());
    assert_eq!(tally.by_subject["registration"], 1);
    // "question" is a general keyword too.
    assert_eq!(tally.by_subject["general"], 1);
    assert_eq!(tally.by_subject["sponsorship"], 1);
    // Matching is case-sensitive.
    assert_eq!(tally.by_subject["accommodation"], 0);
    assert_eq!(tally.by_subject["programme"], 0);
}

// --- External Ids ---

#[tokio::test]
async fn test_external_ids_are_well_formed_and_distinct() {
    let repo = setup().await;
    let now = Utc::now();
    let mut seen = HashSet::new();

    for i in 0..40 {
        let new = lifecycle::prepare_registration(&registration_form(&format!("Person {i}"), "spectator"))
            .unwrap();
        let created = repo.create_registration(new, now).await.unwrap();
        assert_external_id(&created.registration_id, "ICHR2026-REG");
        assert!(seen.insert(created.registration_id));

        let paper = repo
            .create_paper(new_paper(&format!("Paper {i}"), "a@example.com", PaperCategory::Research), now)
            .await
            .unwrap();
        assert_external_id(&paper.submission_id, "ICHR2026-SUB");
        assert!(seen.insert(paper.submission_id));

        let new = lifecycle::prepare_contact(&contact_form("general")).unwrap();
        let message = repo.create_message(new, now).await.unwrap();
        assert_external_id(&message.message_id, "ICHR2026-MSG");
        assert!(seen.insert(message.message_id));
    }
    assert_eq!(seen.len(), 120);
}
