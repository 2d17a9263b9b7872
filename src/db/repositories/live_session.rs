//! Live session repository
//!
//! Database operations for live sessions. The active session for a user is
//! the most recent row with `ended_at IS NULL`; ending stamps the timestamp
//! and is terminal.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::LiveSession;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Live session repository trait
#[async_trait]
pub trait LiveSessionRepository: Send + Sync {
    /// Create a new (active) session
    async fn create(&self, session: &LiveSession) -> Result<LiveSession>;

    /// Find the user's most recent unended session, if any
    async fn find_active(&self, user_id: i64) -> Result<Option<LiveSession>>;

    /// Stamp `ended_at` on every unended session of the user.
    ///
    /// Returns the number of rows affected (0 when no session was active;
    /// 1 in the steady state, since lookup-or-create keeps at most one
    /// session open per user).
    async fn end_active(&self, user_id: i64, ended_at: DateTime<Utc>) -> Result<u64>;
}

/// SQLx-based live session repository implementation.
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxLiveSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxLiveSessionRepository {
    /// Create a new SQLx live session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn shared(pool: DynDatabasePool) -> Arc<dyn LiveSessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LiveSessionRepository for SqlxLiveSessionRepository {
    async fn create(&self, session: &LiveSession) -> Result<LiveSession> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), session).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), session).await,
        }
    }

    async fn find_active(&self, user_id: i64) -> Result<Option<LiveSession>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_active_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                find_active_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }

    async fn end_active(&self, user_id: i64, ended_at: DateTime<Utc>) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                end_active_sqlite(self.pool.as_sqlite().unwrap(), user_id, ended_at).await
            }
            DatabaseDriver::Mysql => {
                end_active_mysql(self.pool.as_mysql().unwrap(), user_id, ended_at).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, session: &LiveSession) -> Result<LiveSession> {
    let result = sqlx::query(
        r#"
        INSERT INTO live_sessions (user_id, title, started_at, ended_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(session.user_id)
    .bind(&session.title)
    .bind(session.started_at)
    .bind(session.ended_at)
    .execute(pool)
    .await
    .context("Failed to create live session")?;

    let mut created = session.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn find_active_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Option<LiveSession>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, title, started_at, ended_at
        FROM live_sessions
        WHERE user_id = ? AND ended_at IS NULL
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to find active session")?;

    Ok(row.map(|row| row_to_session_sqlite(&row)))
}

async fn end_active_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    ended_at: DateTime<Utc>,
) -> Result<u64> {
    let result =
        sqlx::query("UPDATE live_sessions SET ended_at = ? WHERE user_id = ? AND ended_at IS NULL")
            .bind(ended_at)
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to end live session")?;

    Ok(result.rows_affected())
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> LiveSession {
    LiveSession {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        started_at: row.get("started_at"),
        ended_at: row.get("ended_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, session: &LiveSession) -> Result<LiveSession> {
    let result = sqlx::query(
        r#"
        INSERT INTO live_sessions (user_id, title, started_at, ended_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(session.user_id)
    .bind(&session.title)
    .bind(session.started_at)
    .bind(session.ended_at)
    .execute(pool)
    .await
    .context("Failed to create live session")?;

    let mut created = session.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn find_active_mysql(pool: &MySqlPool, user_id: i64) -> Result<Option<LiveSession>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, title, started_at, ended_at
        FROM live_sessions
        WHERE user_id = ? AND ended_at IS NULL
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to find active session")?;

    Ok(row.map(|row| row_to_session_mysql(&row)))
}

async fn end_active_mysql(pool: &MySqlPool, user_id: i64, ended_at: DateTime<Utc>) -> Result<u64> {
    let result =
        sqlx::query("UPDATE live_sessions SET ended_at = ? WHERE user_id = ? AND ended_at IS NULL")
            .bind(ended_at)
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to end live session")?;

    Ok(result.rows_affected())
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> LiveSession {
    LiveSession {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        started_at: row.get("started_at"),
        ended_at: row.get("ended_at"),
    }
}
