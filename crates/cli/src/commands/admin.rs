//! Admin bootstrap command.
//!
//! The API only lets a logged-in admin register another admin, so the first
//! one is created here.

use festiv_api::db::{self, RepositoryError, admins};
use festiv_api::services::AuthError;
use festiv_api::services::auth::{hash_password, validate_password};
use festiv_core::{AdminId, Email, EmailError, Phone, PhoneError};

use super::{CommandError, database_url};

/// Errors from `festiv admin create`.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid phone: {0}")]
    InvalidPhone(#[from] PhoneError),

    #[error("Name cannot be empty")]
    EmptyName,

    #[error(transparent)]
    Password(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Create an admin and return its id.
///
/// # Errors
///
/// Returns an error for invalid input, a weak password, or an email or
/// phone that is already registered.
pub async fn create(
    name: &str,
    email: &str,
    phone: &str,
    password: &str,
) -> Result<AdminId, AdminError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AdminError::EmptyName);
    }
    let email = Email::parse(email)?;
    let phone = Phone::parse(phone)?;
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&url).await?;

    let admin = admins::create(
        &pool,
        &admins::NewAdmin {
            name: name.to_owned(),
            email,
            phone,
            password_hash,
        },
    )
    .await?;

    tracing::info!(email = %admin.email, "Admin created");
    Ok(admin.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_bad_input_before_connecting() {
        assert!(matches!(
            create(" ", "asha@festiv.in", "9876543210", "long enough").await,
            Err(AdminError::EmptyName)
        ));
        assert!(matches!(
            create("Asha", "not-an-email", "9876543210", "long enough").await,
            Err(AdminError::InvalidEmail(_))
        ));
        assert!(matches!(
            create("Asha", "asha@festiv.in", "12", "long enough").await,
            Err(AdminError::InvalidPhone(_))
        ));
        assert!(matches!(
            create("Asha", "asha@festiv.in", "9876543210", "short").await,
            Err(AdminError::Password(AuthError::WeakPassword(_)))
        ));
    }
}
