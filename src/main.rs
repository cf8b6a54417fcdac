use ichr_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router, db,
    repository::{RepositoryState, SqliteRepository},
    storage::{LocalFileStorage, StorageService, StorageState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: loads configuration, sets up logging, opens the database and the
/// upload store, then serves the API.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise the crate logs at debug and the HTTP stack at info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ichr_portal=debug,tower_http=info,axum=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: human-readable output.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON lines for log aggregation.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (SQLite)
    // Creates the file and schema on first start; safe to repeat.
    let pool = db::init_database(&config.db_url)
        .await
        .expect("FATAL: Failed to open the database. Check DATABASE_URL.");

    if let Some(admin) = &config.bootstrap_admin {
        db::ensure_bootstrap_admin(&pool, admin)
            .await
            .expect("FATAL: Failed to create the bootstrap admin account.");
    }

    let repo = Arc::new(SqliteRepository::new(pool)) as RepositoryState;

    // 5. Storage Initialization (local upload directory)
    let file_store = LocalFileStorage::new(&config.upload_dir);
    file_store
        .ensure_ready()
        .await
        .expect("FATAL: Upload directory is not writable. Check UPLOAD_DIR.");
    let storage = Arc::new(file_store) as StorageState;

    // 6. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        storage,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the listen address. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
