//! User model
//!
//! Defines the seller account entity. Every product, live session and order
//! in the system is owned by exactly one user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Display name shown in the dashboard header
    pub full_name: String,
    /// Email address (unique, stored lowercase)
    pub email: String,
    /// Optional business/shop name
    pub business_name: Option<String>,
    /// Optional contact phone
    pub phone: Option<String>,
    /// Password hash (argon2id PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed before calling this function.
    /// Use `services::password::hash_password()` to hash it.
    pub fn new(
        full_name: String,
        email: String,
        password_hash: String,
        business_name: Option<String>,
        phone: Option<String>,
    ) -> Self {
        Self {
            id: 0, // Will be set by the database
            full_name,
            email,
            business_name,
            phone,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Input for registering a new user (before password hashing)
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub full_name: String,
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    pub business_name: Option<String>,
    pub phone: Option<String>,
}

impl RegisterInput {
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            password: password.into(),
            business_name: None,
            phone: None,
        }
    }
}
