use std::env;

/// Default cap on request bodies (multipart uploads included): 16 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// AppConfig
///
/// Holds the application's entire configuration state. This struct is immutable once
/// loaded and is pulled into handlers and extractors via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects log format and development defaults.
    pub env: Env,
    // SQLite connection string, e.g. `sqlite://data/ichr2026.db`.
    pub db_url: String,
    // Directory that receives uploaded paper files.
    pub upload_dir: String,
    // HMAC secret used to sign and verify session tokens.
    pub jwt_secret: String,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    // Account created at startup when no admin with this username exists.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Credentials for the administrator account seeded on first start.
#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Env
///
/// Local uses development defaults and pretty logs; Production demands explicit
/// secrets and emits JSON logs.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Non-panicking configuration for test scaffolding. Never reads the environment.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: "sqlite::memory:".to_string(),
            upload_dir: "uploads/papers".to_string(),
            jwt_secret: "super-secure-test-secret-value-local".to_string(),
            bind_addr: "127.0.0.1:5002".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 30 * 24 * 3600,
            bootstrap_admin: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment at startup.
    ///
    /// # Panics
    /// Panics in production when `JWT_SECRET` or `DATABASE_URL` is missing, and in any
    /// environment when a numeric setting cannot be parsed.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let (jwt_secret, db_url) = match env {
            Env::Production => (
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
            ),
            Env::Local => (
                env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "super-secure-test-secret-value-local".to_string()),
                env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/ichr2026.db".to_string()),
            ),
        };

        // Production never falls back to a well-known password.
        let admin_password = match env {
            Env::Production => env::var("ADMIN_PASSWORD").ok(),
            Env::Local => Some(env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string())),
        };
        let bootstrap_admin = admin_password.map(|password| BootstrapAdmin {
            username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            email: env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@ichr2026.org".to_string()),
            password,
        });

        Self {
            env,
            db_url,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads/papers".to_string()),
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5002".to_string()),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            access_token_ttl_secs: parse_var("ACCESS_TOKEN_TTL_SECS", 3600),
            refresh_token_ttl_secs: parse_var("REFRESH_TOKEN_TTL_SECS", 30 * 24 * 3600),
            bootstrap_admin,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("FATAL: {key} must be a number, got {raw:?}")),
        Err(_) => default,
    }
}
