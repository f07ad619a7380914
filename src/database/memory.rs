use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{AccessLogStore, UserStore};
use crate::models::access_log::{AccessLogEntry, AccessLogFilter};
use crate::models::user::{FailedAttempt, NewUser, UserAccount, UserUpdate};
use crate::utils::error::{AppError, AppResult};

/// Process-local store keeping users by id and the audit trail in insertion
/// order. Every mutation of a user happens under one write guard.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserAccount>>,
    access_logs: RwLock<Vec<AccessLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed account, replacing any user with the same id.
    pub async fn insert_user(&self, user: UserAccount) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    pub async fn access_logs(&self) -> Vec<AccessLogEntry> {
        self.access_logs.read().await.clone()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<UserAccount>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> AppResult<UserAccount> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == new_user.email) {
            return Err(AppError::BadRequest("Email already registered".to_string()));
        }

        let user = UserAccount::new(new_user);
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        user.apply(&update, Utc::now());
        Ok(())
    }

    async fn record_failed_attempt(
        &self,
        id: &str,
        threshold: i64,
        lock_until: DateTime<Utc>,
    ) -> AppResult<FailedAttempt> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        user.failed_attempts += 1;
        let locked = user.failed_attempts >= threshold;
        if locked {
            user.locked_until = Some(lock_until);
        }
        user.updated_at = Utc::now();

        Ok(FailedAttempt {
            failed_attempts: user.failed_attempts,
            locked_until: user.locked_until,
            locked,
        })
    }
}

#[async_trait]
impl AccessLogStore for MemoryStore {
    async fn append_access_log(&self, entry: &AccessLogEntry) -> AppResult<()> {
        self.access_logs.write().await.push(entry.clone());
        Ok(())
    }

    async fn list_access_logs(&self, filter: &AccessLogFilter) -> AppResult<Vec<AccessLogEntry>> {
        let logs = self.access_logs.read().await;

        Ok(logs
            .iter()
            .rev()
            .filter(|entry| filter.matches(entry))
            .skip(filter.clamped_offset() as usize)
            .take(filter.clamped_limit() as usize)
            .cloned()
            .collect())
    }
}
