use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use super::{AccessLogStore, DbPool, UserStore};
use crate::models::access_log::{AccessLogEntry, AccessLogFilter};
use crate::models::user::{FailedAttempt, NewUser, UserAccount, UserUpdate};
use crate::utils::error::{AppError, AppResult};

#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        let user = sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<UserAccount>> {
        let user = sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn create_user(&self, new_user: NewUser) -> AppResult<UserAccount> {
        let user = UserAccount::new(new_user);

        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, role, is_active, failed_attempts, locked_until, last_login, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.is_active)
        .bind(user.failed_attempts)
        .bind(user.locked_until)
        .bind(user.last_login)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::BadRequest("Email already registered".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(user)
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> AppResult<()> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET updated_at = ");
        builder.push_bind(Utc::now());

        if let Some(name) = update.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(password_hash) = update.password_hash {
            builder.push(", password_hash = ").push_bind(password_hash);
        }
        if let Some(role) = update.role {
            builder.push(", role = ").push_bind(role);
        }
        if let Some(is_active) = update.is_active {
            builder.push(", is_active = ").push_bind(is_active);
        }
        if let Some(failed_attempts) = update.failed_attempts {
            builder.push(", failed_attempts = ").push_bind(failed_attempts);
        }
        if let Some(locked_until) = update.locked_until {
            builder.push(", locked_until = ").push_bind(locked_until);
        }
        if let Some(last_login) = update.last_login {
            builder.push(", last_login = ").push_bind(last_login);
        }

        builder.push(" WHERE id = ").push_bind(id.to_string());

        let result = builder.build().execute(self.pool.as_ref()).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        Ok(())
    }

    async fn record_failed_attempt(
        &self,
        id: &str,
        threshold: i64,
        lock_until: DateTime<Utc>,
    ) -> AppResult<FailedAttempt> {
        // Right-hand sides see the pre-update row, RETURNING sees the new one.
        let row = sqlx::query_as::<_, (i64, Option<DateTime<Utc>>)>(
            "UPDATE users
             SET failed_attempts = failed_attempts + 1,
                 locked_until = CASE WHEN failed_attempts + 1 >= ? THEN ? ELSE locked_until END,
                 updated_at = ?
             WHERE id = ?
             RETURNING failed_attempts, locked_until",
        )
        .bind(threshold)
        .bind(lock_until)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        let (failed_attempts, locked_until) =
            row.ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        Ok(FailedAttempt {
            failed_attempts,
            locked_until,
            locked: failed_attempts >= threshold,
        })
    }
}

#[async_trait]
impl AccessLogStore for SqliteStore {
    async fn append_access_log(&self, entry: &AccessLogEntry) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO access_logs (id, user_id, action, details, ip_address, user_agent, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(entry.action)
        .bind(&entry.details)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.created_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn list_access_logs(&self, filter: &AccessLogFilter) -> AppResult<Vec<AccessLogEntry>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM access_logs WHERE 1 = 1");

        if let Some(user_id) = &filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id.clone());
        }
        if let Some(action) = filter.action {
            builder.push(" AND action = ").push_bind(action);
        }

        builder
            .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(filter.clamped_limit())
            .push(" OFFSET ")
            .push_bind(filter.clamped_offset());

        let entries = builder
            .build_query_as::<AccessLogEntry>()
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(entries)
    }
}
