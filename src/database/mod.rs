pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, sqlite::SqlitePool};
use std::sync::Arc;

use crate::models::access_log::{AccessLogEntry, AccessLogFilter};
use crate::models::user::{FailedAttempt, NewUser, UserAccount, UserUpdate};
use crate::utils::error::AppResult;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type DbPool = Arc<Pool<Sqlite>>;

pub async fn create_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let pool = SqlitePool::connect(database_url).await?;
    run_migrations(&pool).await?;
    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &Pool<Sqlite>) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Persistence of user accounts as seen by authentication and administration.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact, case-sensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserAccount>>;

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<UserAccount>>;

    /// Fails with `BadRequest` when the email is already taken.
    async fn create_user(&self, new_user: NewUser) -> AppResult<UserAccount>;

    /// Fails with `NotFound` when no user has this id.
    async fn update_user(&self, id: &str, update: UserUpdate) -> AppResult<()>;

    /// Increments `failed_attempts` by one and, when the new count reaches
    /// `threshold`, sets `locked_until` in the same atomic step.
    async fn record_failed_attempt(
        &self,
        id: &str,
        threshold: i64,
        lock_until: DateTime<Utc>,
    ) -> AppResult<FailedAttempt>;
}

/// Append-only audit trail of access events.
#[async_trait]
pub trait AccessLogStore: Send + Sync {
    async fn append_access_log(&self, entry: &AccessLogEntry) -> AppResult<()>;

    /// Newest entries first.
    async fn list_access_logs(&self, filter: &AccessLogFilter) -> AppResult<Vec<AccessLogEntry>>;
}
