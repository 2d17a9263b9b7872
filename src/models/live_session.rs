//! Live session model
//!
//! A live session is a titled time window during which a seller records
//! orders. A session is active while `ended_at` is unset; ending it is
//! one-directional and terminal. At most one session per user is active at
//! any time, enforced by the lookup-or-create logic in the live service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default title used when a session is created implicitly.
pub const DEFAULT_SESSION_TITLE: &str = "Live Session";

/// LiveSession entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSession {
    /// Unique identifier
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Session title
    pub title: String,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// When the session ended, or None while it is active
    pub ended_at: Option<DateTime<Utc>>,
}

impl LiveSession {
    /// Create a new active session.
    pub fn new(user_id: i64, title: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            user_id,
            title,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Whether the session is still open for orders.
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_active() {
        let session = LiveSession::new(1, DEFAULT_SESSION_TITLE.to_string());
        assert!(session.is_active());
    }

    #[test]
    fn test_ended_session_is_not_active() {
        let mut session = LiveSession::new(1, DEFAULT_SESSION_TITLE.to_string());
        session.ended_at = Some(Utc::now());
        assert!(!session.is_active());
    }
}
