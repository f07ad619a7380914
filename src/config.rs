use anyhow::{Context, anyhow};
use chrono::Duration;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://erp.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Lockout and session knobs shared by the authenticator and the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    pub max_login_attempts: i64,
    pub lockout_duration_minutes: i64,
    pub session_timeout_secs: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_login_attempts: 5,
            lockout_duration_minutes: 15,
            session_timeout_secs: 1800,
        }
    }
}

impl SecurityConfig {
    pub fn lockout_duration(&self) -> Duration {
        Duration::minutes(self.lockout_duration_minutes)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::seconds(self.session_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: "admin@erp.com".to_string(),
            name: "Administrador".to_string(),
            password: "Admin@123".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub secret_key: String,
    pub security: SecurityConfig,
    pub admin: AdminConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let security_defaults = SecurityConfig::default();
        let admin_defaults = AdminConfig::default();

        let security = SecurityConfig {
            max_login_attempts: parse_or(
                &lookup,
                "MAX_LOGIN_ATTEMPTS",
                security_defaults.max_login_attempts,
            )?,
            lockout_duration_minutes: parse_or(
                &lookup,
                "LOCKOUT_DURATION",
                security_defaults.lockout_duration_minutes,
            )?,
            session_timeout_secs: parse_or(
                &lookup,
                "SESSION_TIMEOUT",
                security_defaults.session_timeout_secs,
            )?,
        };

        if security.max_login_attempts < 1 {
            return Err(anyhow!("MAX_LOGIN_ATTEMPTS must be at least 1"));
        }
        if security.lockout_duration_minutes < 0 || security.session_timeout_secs < 1 {
            return Err(anyhow!(
                "LOCKOUT_DURATION must not be negative and SESSION_TIMEOUT must be positive"
            ));
        }

        let secret_key = lookup("SECRET_KEY")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("SECRET_KEY not set"))?;

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            secret_key,
            security,
            admin: AdminConfig {
                email: lookup("ADMIN_EMAIL").unwrap_or(admin_defaults.email),
                name: lookup("ADMIN_NAME").unwrap_or(admin_defaults.name),
                password: lookup("ADMIN_PASSWORD").unwrap_or(admin_defaults.password),
            },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
