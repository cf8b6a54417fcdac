use ichr_portal::{
    AppConfig, AppState, LocalFileStorage, SqliteRepository,
    config::BootstrapAdmin,
    create_router, db,
    repository::RepositoryState,
    storage::{StorageService, StorageState},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    // Held so the upload directory outlives the server.
    _uploads: TempDir,
}

async fn spawn_app() -> TestApp {
    let uploads = tempfile::tempdir().expect("Failed to create upload dir");
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to open in-memory SQLite in tests");

    let admin = BootstrapAdmin {
        username: "admin".to_string(),
        email: "admin@ichr2026.org".to_string(),
        password: "admin123".to_string(),
    };
    db::ensure_bootstrap_admin(&pool, &admin).await.unwrap();

    let storage = LocalFileStorage::new(uploads.path().join("papers"));
    storage.ensure_ready().await.unwrap();

    let config = AppConfig {
        upload_dir: uploads.path().join("papers").to_string_lossy().into_owned(),
        bootstrap_admin: Some(admin),
        ..AppConfig::default()
    };
    let state = AppState {
        repo: Arc::new(SqliteRepository::new(pool)) as RepositoryState,
        storage: Arc::new(storage) as StorageState,
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}/api", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
        _uploads: uploads,
    }
}

impl TestApp {
    async fn login(&self) -> String {
        let body: Value = self
            .client
            .post(format!("{}/admin/login", self.address))
            .json(&json!({"username": "admin", "password": "admin123"}))
            .send()
            .await
            .expect("req fail")
            .json()
            .await
            .unwrap();
        body["data"]["access_token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_registration_lifecycle() {
    let app = spawn_app().await;

    // 1. Register
    let response = app
        .client
        .post(format!("{}/registration", app.address))
        .json(&json!({
            "fullName": "Priya Nathan",
            "email": "priya@example.lk",
            "phone": "0779876543",
            "affiliation": "Eastern University",
            "country": "Sri Lanka",
            "category": "non-presenting",
            "specialRequirements": "Vegetarian meals"
        }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let id = body["data"]["registration_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["payment_amount"], 4000.0);

    // 2. Look it up
    let fetched: Value = app
        .client
        .get(format!("{}/registration/{}", app.address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["data"]["special_requirements"], "Vegetarian meals");

    // 3. Confirm it from the back office
    let token = app.login().await;
    let response = app
        .client
        .put(format!("{}/admin/registrations/{}", app.address, id))
        .bearer_auth(&token)
        .json(&json!({"status": "confirmed", "payment_status": "paid"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let dashboard: Value = app
        .client
        .get(format!("{}/admin/dashboard", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dashboard["data"]["overview"]["confirmed_registrations"], 1);
    assert_eq!(dashboard["data"]["overview"]["total_revenue"], 4000.0);
}

#[tokio::test]
async fn test_paper_upload_download_and_review() {
    let app = spawn_app().await;

    let file = reqwest::multipart::Part::bytes(b"PK\x03\x04 docx bytes".to_vec())
        .file_name("draft v2.docx");
    let form = reqwest::multipart::Form::new()
        .text("title", "Raga Perception")
        .text("abstract", "Listeners rate ragas.")
        .text("keywords", "raga, perception")
        .text("category", "research")
        .text("authors", "S. Kumar")
        .text("email", "kumar@example.lk")
        .text("affiliation", "University of Jaffna")
        .text("phone", "0712222222")
        .part("file", file);

    let response = app
        .client
        .post(format!("{}/papers/submit", app.address))
        .multipart(form)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let id = body["data"]["submission_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["file_type"], "docx");
    assert_eq!(body["data"]["status"], "submitted");

    // The stored upload comes back byte for byte.
    let response = app
        .client
        .get(format!("{}/papers/{}/download", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let disposition = response.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.starts_with(&format!("attachment; filename=\"{id}_")));
    assert!(disposition.ends_with("_draft_v2.docx\""));
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"PK\x03\x04 docx bytes");

    let token = app.login().await;
    let response = app
        .client
        .put(format!("{}/papers/{}/review", app.address, id))
        .bearer_auth(&token)
        .json(&json!({"status": "accepted", "review_score": 8.5, "reviewer_comments": "Clear"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let reviewed: Value = response.json().await.unwrap();
    assert_eq!(reviewed["data"]["status"], "accepted");
    assert_eq!(reviewed["data"]["review_score"], 8.5);

    let stats: Value = app
        .client
        .get(format!("{}/papers/stats", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["data"]["average_review_score"], 8.5);
}

#[tokio::test]
async fn test_admin_routes_reject_anonymous_callers() {
    let app = spawn_app().await;
    for path in ["admin/dashboard", "admin/users", "admin/settings", "contact/messages"] {
        let response = app
            .client
            .get(format!("{}/{}", app.address, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401, "{path}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Missing authorization token");
    }
}
