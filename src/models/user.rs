use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const ADMIN_ROLE: &str = "admin";
pub const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub failed_attempts: i64,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(new_user: NewUser) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            email: new_user.email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            role: new_user.role,
            is_active: new_user.is_active,
            failed_attempts: 0,
            locked_until: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A past `locked_until` is left in place until the next successful login,
    /// so the lock is only in effect while it is still ahead of `now`.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked_at(Utc::now())
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    /// Applies a partial update the same way the stores persist it.
    pub fn apply(&mut self, update: &UserUpdate, now: DateTime<Utc>) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(password_hash) = &update.password_hash {
            self.password_hash = password_hash.clone();
        }
        if let Some(role) = &update.role {
            self.role = role.clone();
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(failed_attempts) = update.failed_attempts {
            self.failed_attempts = failed_attempts;
        }
        if let Some(locked_until) = update.locked_until {
            self.locked_until = locked_until;
        }
        if let Some(last_login) = update.last_login {
            self.last_login = last_login;
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
}

/// Partial update of a user record. `None` leaves a column untouched; the
/// nested options on nullable columns distinguish "set to NULL" from "skip".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub failed_attempts: Option<i64>,
    pub locked_until: Option<Option<DateTime<Utc>>>,
    pub last_login: Option<Option<DateTime<Utc>>>,
}

impl UserUpdate {
    pub fn login_success(now: DateTime<Utc>) -> Self {
        Self {
            failed_attempts: Some(0),
            locked_until: Some(None),
            last_login: Some(Some(now)),
            ..Default::default()
        }
    }

    pub fn unlock() -> Self {
        Self {
            failed_attempts: Some(0),
            locked_until: Some(None),
            ..Default::default()
        }
    }
}

/// Result of the atomic increment performed after a wrong password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttempt {
    pub failed_attempts: i64,
    pub locked_until: Option<DateTime<Utc>>,
    /// True when this attempt reached the threshold and set a fresh lock.
    pub locked: bool,
}

/// The identity handed to the session layer after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<&UserAccount> for UserIdentity {
    fn from(user: &UserAccount) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
        }
    }
}
