use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::{AppError, Result},
    models::{AdminProfile, AdminRole, AdminUser, LoginResponse, RefreshResponse},
    repository::RepositoryState,
};

// --- Password Hashing ---

/// hash_password
///
/// Argon2id with default parameters and a fresh random salt, encoded as a PHC string
/// (`$argon2id$v=19$...`).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// verify_password
///
/// A stored value that is not a valid PHC string never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// --- Tokens ---

/// Whether a token grants API access or only the right to mint a new access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims
///
/// JWT payload. Access tokens carry the admin's identity snapshot (username, role,
/// email) taken at issue time; refresh tokens carry the subject only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Admin id, as a decimal string.
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub kind: TokenKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Claims {
    pub fn admin_id(&self) -> Result<i64> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))
    }
}

fn issue(claims: &Claims, secret: &str) -> Result<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
}

pub fn issue_access_token(user: &AdminUser, config: &AppConfig) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.to_string(),
        iat: now as usize,
        exp: (now + config.access_token_ttl_secs) as usize,
        kind: TokenKind::Access,
        username: Some(user.username.clone()),
        role: Some(user.role.clone()),
        email: Some(user.email.clone()),
    };
    issue(&claims, &config.jwt_secret)
}

pub fn issue_refresh_token(user: &AdminUser, config: &AppConfig) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.to_string(),
        iat: now as usize,
        exp: (now + config.refresh_token_ttl_secs) as usize,
        kind: TokenKind::Refresh,
        username: None,
        role: None,
        email: None,
    };
    issue(&claims, &config.jwt_secret)
}

/// Verifies signature and expiry, then checks the token kind.
pub fn decode_token(token: &str, secret: &str, expected: TokenKind) -> Result<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::Unauthorized("Token has expired".to_string()),
        _ => AppError::Unauthorized("Invalid token".to_string()),
    })?;

    if data.claims.kind != expected {
        return Err(AppError::Unauthorized("Invalid token type".to_string()));
    }
    Ok(data.claims)
}

/// authorize
///
/// Stateless check of an access token. When `required_role` is given, the role claim
/// must match it exactly. The account is not looked up, so a deactivated admin keeps
/// access until the token expires.
pub fn authorize(token: &str, secret: &str, required_role: Option<AdminRole>) -> Result<Claims> {
    let claims = decode_token(token, secret, TokenKind::Access)?;
    if let Some(role) = required_role {
        if claims.role.as_deref() != Some(role.as_str()) {
            return Err(AppError::Forbidden);
        }
    }
    Ok(claims)
}

// --- Session Operations ---

/// authenticate
///
/// Verifies a username/password pair and issues a token pair. The password is checked
/// before the active flag, so a disabled account is only revealed to someone holding
/// its password. `last_login` is stamped here and nowhere else.
pub async fn authenticate(
    repo: &RepositoryState,
    config: &AppConfig,
    username: &str,
    password: &str,
) -> Result<LoginResponse> {
    let user = repo
        .get_admin_by_username(username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash) {
        tracing::warn!(username, "failed login attempt");
        return Err(AppError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(AppError::AccountInactive);
    }

    repo.touch_last_login(user.id, Utc::now()).await?;
    tracing::info!(admin_id = user.id, "admin logged in");

    Ok(LoginResponse {
        access_token: issue_access_token(&user, config)?,
        refresh_token: issue_refresh_token(&user, config)?,
        user: AdminProfile::from(&user),
    })
}

/// refresh
///
/// Mints a new access token from a refresh identity. The account is re-read so the new
/// token reflects its current role, and a deleted or disabled account gets nothing.
pub async fn refresh(
    repo: &RepositoryState,
    config: &AppConfig,
    identity: &RefreshIdentity,
) -> Result<RefreshResponse> {
    let user = repo
        .get_admin(identity.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if !user.is_active {
        return Err(AppError::AccountInactive);
    }
    Ok(RefreshResponse {
        access_token: issue_access_token(&user, config)?,
    })
}

// --- Extractors ---

fn bearer_token(parts: &Parts) -> Result<&str> {
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;
    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".to_string()))
}

/// AuthUser
///
/// The identity carried by a valid access token. Used as a handler argument on every
/// protected route; a missing or bad token rejects the request with 401 before the
/// handler runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub email: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == AdminRole::Admin.as_str()
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let config = AppConfig::from_ref(state);
        let token = bearer_token(parts)?;
        let claims = authorize(token, &config.jwt_secret, None)?;

        Ok(AuthUser {
            id: claims.admin_id()?,
            username: claims.username.unwrap_or_default(),
            role: claims.role.unwrap_or_default(),
            email: claims.email.unwrap_or_default(),
        })
    }
}

/// RefreshIdentity
///
/// The subject of a valid refresh token. Only accepted by `POST /admin/refresh`.
#[derive(Debug, Clone)]
pub struct RefreshIdentity {
    pub id: i64,
}

impl<S> FromRequestParts<S> for RefreshIdentity
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let config = AppConfig::from_ref(state);
        let token = bearer_token(parts)?;
        let claims = decode_token(token, &config.jwt_secret, TokenKind::Refresh)?;
        Ok(RefreshIdentity {
            id: claims.admin_id()?,
        })
    }
}
