//! HTTP handlers, one module per resource. Handlers validate through `lifecycle` /
//! `triage`, persist through `RepositoryState`, and wrap results in `ApiResponse`.

pub mod admin;
pub mod contact;
pub mod papers;
pub mod registration;

use crate::{auth::AuthUser, error::AppError};

/// Account and settings management is reserved for the exact `admin` role.
pub(crate) fn require_admin(auth: &AuthUser) -> Result<(), AppError> {
    if !auth.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
