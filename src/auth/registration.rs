//! User registration and credential checks for FeedFlow.

use tracing::info;

use crate::auth::{hash_password, verify_password, PasswordError};
use crate::db::{
    config_keys, DbPool, NewUser, Role, SystemConfigRepository, User, UserRepository,
};
use crate::{FeedflowError, Result};

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub email: String,
    /// Plain-text password (8-128 characters).
    pub password: String,
    pub name: Option<String>,
}

impl RegistrationRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl From<PasswordError> for FeedflowError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::TooShort | PasswordError::TooLong => {
                FeedflowError::Validation(e.to_string())
            }
            PasswordError::VerificationFailed | PasswordError::InvalidHash => {
                FeedflowError::Auth("invalid email or password".to_string())
            }
            PasswordError::HashError(msg) => FeedflowError::Auth(msg),
        }
    }
}

/// Register a new ordinary user.
///
/// Fails with `Permission` when registration is switched off in the system
/// configuration and with `Conflict` when the email is taken.
pub async fn register(pool: &DbPool, request: RegistrationRequest) -> Result<User> {
    let enabled = SystemConfigRepository::new(pool)
        .get_bool(config_keys::REGISTRATION_ENABLED, true)
        .await?;
    if !enabled {
        return Err(FeedflowError::Permission(
            "registration is disabled".to_string(),
        ));
    }

    register_with_role(pool, request, Role::User).await
}

/// Register a user with an explicit role, bypassing the registration switch.
pub async fn register_with_role(
    pool: &DbPool,
    request: RegistrationRequest,
    role: Role,
) -> Result<User> {
    let email = request.email.trim();
    if email.is_empty() {
        return Err(FeedflowError::Validation("email is required".to_string()));
    }

    let hash = hash_password(&request.password)?;
    let mut new_user = NewUser::new(email, hash).with_role(role);
    if let Some(name) = request.name.filter(|n| !n.trim().is_empty()) {
        new_user = new_user.with_name(name);
    }

    let user = UserRepository::new(pool).create(&new_user).await?;
    info!(user_id = user.id, role = %user.role, "User registered");
    Ok(user)
}

/// Check credentials and return the matching user.
///
/// Unknown email and wrong password yield the same error.
pub async fn authenticate(pool: &DbPool, email: &str, password: &str) -> Result<User> {
    let user = UserRepository::new(pool)
        .get_by_email(email.trim())
        .await?
        .ok_or_else(|| FeedflowError::Auth("invalid email or password".to_string()))?;

    verify_password(password, &user.password)?;
    Ok(user)
}
