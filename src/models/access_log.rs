use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AccessAction {
    Login,
    Logout,
    FailedLogin,
    AccountLocked,
}

impl AccessAction {
    pub fn as_str(&self) -> &str {
        match self {
            AccessAction::Login => "login",
            AccessAction::Logout => "logout",
            AccessAction::FailedLogin => "failed_login",
            AccessAction::AccountLocked => "account_locked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "login" => Some(AccessAction::Login),
            "logout" => Some(AccessAction::Logout),
            "failed_login" => Some(AccessAction::FailedLogin),
            "account_locked" => Some(AccessAction::AccountLocked),
            _ => None,
        }
    }
}

/// Best-effort origin of a request, recorded with every audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip_address: String,
    pub user_agent: String,
}

impl RequestContext {
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address: ip_address.unwrap_or_else(|| UNKNOWN.to_string()),
            user_agent: user_agent.unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccessLogEntry {
    pub id: String,
    pub user_id: Option<String>,
    pub action: AccessAction,
    pub details: String,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

impl AccessLogEntry {
    pub fn new(
        user_id: Option<String>,
        action: AccessAction,
        details: String,
        context: &RequestContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            action,
            details,
            ip_address: context.ip_address.clone(),
            user_agent: context.user_agent.clone(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogFilter {
    pub user_id: Option<String>,
    pub action: Option<AccessAction>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

impl Default for AccessLogFilter {
    fn default() -> Self {
        Self {
            user_id: None,
            action: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl AccessLogFilter {
    pub fn matches(&self, entry: &AccessLogEntry) -> bool {
        if let Some(user_id) = &self.user_id
            && entry.user_id.as_deref() != Some(user_id.as_str())
        {
            return false;
        }

        self.action.is_none_or(|action| entry.action == action)
    }

    pub fn clamped_limit(&self) -> i64 {
        self.limit.clamp(1, 500)
    }

    pub fn clamped_offset(&self) -> i64 {
        self.offset.max(0)
    }
}
