//! User service
//!
//! Implements business logic for seller accounts:
//! - Registration with email uniqueness and password rules
//! - Login with credential verification
//!
//! Input normalization happens here: emails are trimmed and lowercased,
//! names trimmed, optional fields collapsed to None when blank.

use crate::db::repositories::UserRepository;
use crate::models::{RegisterInput, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use std::sync::Arc;

/// Passwords are capped at 72 bytes; longer input is rejected up front.
const MAX_PASSWORD_BYTES: usize = 72;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (unknown email or wrong password)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Email already registered
    #[error("Email is already registered: {0}")]
    EmailTaken(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for registration and login
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a new user service with the given repository
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Register a new seller account.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the name, email or password is unacceptable
    /// - `EmailTaken` if the email is already registered
    /// - `InternalError` for database errors
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let full_name = input.full_name.trim().to_string();
        let email = input.email.trim().to_lowercase();
        let password = input.password.trim();

        validate_registration(&full_name, &email, password)?;

        if self
            .users
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::EmailTaken(email));
        }

        let password_hash = hash_password(password).context("Failed to hash password")?;

        let business_name = normalize_optional(input.business_name);
        let phone = normalize_optional(input.phone);

        let user = User::new(full_name, email, password_hash, business_name, phone);

        let created = self
            .users
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, "New seller registered");

        Ok(created)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` when the email is unknown or the password
    ///   doesn't match (indistinguishable to the caller)
    /// - `ValidationError` for over-long passwords
    /// - `InternalError` for database errors
    pub async fn login(&self, email: &str, password: &str) -> Result<User, UserServiceError> {
        let email = email.trim().to_lowercase();
        let password = password.trim();

        if password.len() > MAX_PASSWORD_BYTES {
            return Err(UserServiceError::ValidationError(
                "Password too long (max 72 bytes).".to_string(),
            ));
        }

        let user = self
            .users
            .get_by_email(&email)
            .await
            .context("Failed to look up user")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        let valid =
            verify_password(password, &user.password_hash).context("Failed to verify password")?;

        if !valid {
            return Err(UserServiceError::InvalidCredentials);
        }

        Ok(user)
    }
}

fn validate_registration(
    full_name: &str,
    email: &str,
    password: &str,
) -> Result<(), UserServiceError> {
    if full_name.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Name cannot be empty.".to_string(),
        ));
    }

    if email.is_empty() || !email.contains('@') {
        return Err(UserServiceError::ValidationError(
            "Invalid email address.".to_string(),
        ));
    }

    if password.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Password cannot be empty.".to_string(),
        ));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(UserServiceError::ValidationError(
            "Password too long (max 72 bytes).".to_string(),
        ));
    }

    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
