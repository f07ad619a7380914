//! Credential authentication with failed-attempt lockout and an access audit
//! trail.
//!
//! Every attempt that resolves an account leaves one or two access log
//! entries. Unknown emails, wrong passwords and deactivated accounts all map
//! to [`AuthOutcome::InvalidCredentials`] and all of them pay for one full
//! password verification, so neither the response nor its timing reveals
//! whether an email is registered. Only an active lock is reported
//! separately so callers can show when to retry.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::SecurityConfig;
use crate::database::{AccessLogStore, UserStore};
use crate::models::access_log::{AccessAction, AccessLogEntry, RequestContext};
use crate::models::user::{UserIdentity, UserUpdate};
use crate::utils::crypto::{dummy_hash, verify_dummy_password_blocking, verify_password_blocking};
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(UserIdentity),
    InvalidCredentials,
    AccountLocked { locked_until: DateTime<Utc> },
}

impl AuthOutcome {
    /// Maps a rejected attempt onto the error the HTTP layer renders.
    pub fn into_identity(self) -> AppResult<UserIdentity> {
        match self {
            AuthOutcome::Authenticated(identity) => Ok(identity),
            AuthOutcome::InvalidCredentials => {
                Err(AppError::Auth("Invalid credentials".to_string()))
            }
            AuthOutcome::AccountLocked { locked_until } => {
                Err(AppError::AccountLocked { locked_until })
            }
        }
    }
}

pub struct Authenticator {
    users: Arc<dyn UserStore>,
    access_logs: Arc<dyn AccessLogStore>,
    security: SecurityConfig,
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn UserStore>,
        access_logs: Arc<dyn AccessLogStore>,
        security: SecurityConfig,
    ) -> Self {
        if dummy_hash().is_none() {
            tracing::warn!("Dummy password hash unavailable; unknown emails will answer faster");
        }

        Self {
            users,
            access_logs,
            security,
        }
    }

    pub fn security(&self) -> &SecurityConfig {
        &self.security
    }

    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        context: &RequestContext,
    ) -> AppResult<AuthOutcome> {
        if email.is_empty() || password.is_empty() {
            return Ok(AuthOutcome::InvalidCredentials);
        }

        let Some(user) = self.users.find_user_by_email(email).await? else {
            verify_dummy_password_blocking(password.to_string()).await;
            self.record_access(
                None,
                AccessAction::FailedLogin,
                format!("Attempt with unknown email: {}", email),
                context,
            )
            .await;
            return Ok(AuthOutcome::InvalidCredentials);
        };

        let now = Utc::now();

        if let Some(locked_until) = user.locked_until.filter(|until| *until > now) {
            self.record_access(
                Some(&user.id),
                AccessAction::FailedLogin,
                "Account locked - attempt during lockout".to_string(),
                context,
            )
            .await;
            return Ok(AuthOutcome::AccountLocked { locked_until });
        }

        if !user.is_active {
            verify_dummy_password_blocking(password.to_string()).await;
            self.record_access(
                Some(&user.id),
                AccessAction::FailedLogin,
                "Attempt on deactivated account".to_string(),
                context,
            )
            .await;
            return Ok(AuthOutcome::InvalidCredentials);
        }

        let is_valid =
            verify_password_blocking(password.to_string(), user.password_hash.clone()).await?;

        if !is_valid {
            let attempt = self
                .users
                .record_failed_attempt(
                    &user.id,
                    self.security.max_login_attempts,
                    now + self.security.lockout_duration(),
                )
                .await?;

            if attempt.locked {
                tracing::warn!(
                    user_id = %user.id,
                    failed_attempts = attempt.failed_attempts,
                    "Account locked after repeated failed logins"
                );
                self.record_access(
                    Some(&user.id),
                    AccessAction::AccountLocked,
                    format!(
                        "Account locked after {} failed attempts",
                        self.security.max_login_attempts
                    ),
                    context,
                )
                .await;
            }

            self.record_access(
                Some(&user.id),
                AccessAction::FailedLogin,
                format!("Wrong password - attempt {}", attempt.failed_attempts),
                context,
            )
            .await;
            return Ok(AuthOutcome::InvalidCredentials);
        }

        self.users
            .update_user(&user.id, UserUpdate::login_success(now))
            .await?;

        self.record_access(
            Some(&user.id),
            AccessAction::Login,
            "success".to_string(),
            context,
        )
        .await;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(AuthOutcome::Authenticated(UserIdentity::from(&user)))
    }

    /// Appends an audit entry. A failed write is logged and dropped so it
    /// never changes the outcome of the attempt.
    pub async fn record_access(
        &self,
        user_id: Option<&str>,
        action: AccessAction,
        details: String,
        context: &RequestContext,
    ) {
        let entry = AccessLogEntry::new(user_id.map(str::to_string), action, details, context);

        if let Err(e) = self.access_logs.append_access_log(&entry).await {
            tracing::error!(
                action = action.as_str(),
                user_id = ?entry.user_id,
                "Failed to write access log: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::access_log::AccessLogFilter;
    use crate::models::user::{NewUser, UserAccount};
    use crate::utils::crypto::hash_password;
    use async_trait::async_trait;
    use chrono::Duration;

    const EMAIL: &str = "admin@erp.com";
    const PASSWORD: &str = "Admin@123";

    struct FailingLogStore;

    #[async_trait]
    impl AccessLogStore for FailingLogStore {
        async fn append_access_log(&self, _entry: &AccessLogEntry) -> AppResult<()> {
            Err(AppError::Internal("audit store offline".to_string()))
        }

        async fn list_access_logs(
            &self,
            _filter: &AccessLogFilter,
        ) -> AppResult<Vec<AccessLogEntry>> {
            Ok(Vec::new())
        }
    }

    fn admin_account() -> UserAccount {
        UserAccount::new(NewUser {
            email: EMAIL.to_string(),
            name: "Administrador".to_string(),
            password_hash: hash_password(PASSWORD).unwrap(),
            role: "admin".to_string(),
            is_active: true,
        })
    }

    async fn setup(user: UserAccount) -> (Arc<MemoryStore>, Authenticator, String) {
        let store = Arc::new(MemoryStore::new());
        let id = user.id.clone();
        store.insert_user(user).await;
        let authenticator =
            Authenticator::new(store.clone(), store.clone(), SecurityConfig::default());
        (store, authenticator, id)
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Some("10.0.0.1".to_string()), Some("test-agent".to_string()))
    }

    async fn stored(store: &MemoryStore, id: &str) -> UserAccount {
        store.find_user_by_id(id).await.unwrap().unwrap()
    }

    fn actions(logs: &[AccessLogEntry]) -> Vec<AccessAction> {
        logs.iter().map(|e| e.action).collect()
    }

    #[tokio::test]
    async fn test_successful_login() {
        let (store, auth, id) = setup(admin_account()).await;
        let before = Utc::now();

        let outcome = auth.authenticate(EMAIL, PASSWORD, &ctx()).await.unwrap();

        match outcome {
            AuthOutcome::Authenticated(identity) => {
                assert_eq!(identity.id, id);
                assert_eq!(identity.email, EMAIL);
                assert_eq!(identity.name, "Administrador");
                assert_eq!(identity.role, "admin");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let user = stored(&store, &id).await;
        assert!(user.last_login.is_some_and(|t| t >= before));

        let logs = store.access_logs().await;
        assert_eq!(actions(&logs), vec![AccessAction::Login]);
        assert_eq!(logs[0].user_id.as_deref(), Some(id.as_str()));
        assert_eq!(logs[0].details, "success");
        assert_eq!(logs[0].ip_address, "10.0.0.1");
        assert_eq!(logs[0].user_agent, "test-agent");
    }

    #[tokio::test]
    async fn test_unknown_email() {
        let (store, auth, _) = setup(admin_account()).await;

        let outcome = auth
            .authenticate("ghost@erp.com", PASSWORD, &ctx())
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::InvalidCredentials);

        let logs = store.access_logs().await;
        assert_eq!(actions(&logs), vec![AccessAction::FailedLogin]);
        assert_eq!(logs[0].user_id, None);
        assert!(logs[0].details.contains("ghost@erp.com"));
    }

    #[tokio::test]
    async fn test_email_match_is_case_sensitive() {
        let (_, auth, _) = setup(admin_account()).await;
        let outcome = auth
            .authenticate("Admin@erp.com", PASSWORD, &ctx())
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_missing_credentials_short_circuit() {
        let (store, auth, _) = setup(admin_account()).await;

        assert_eq!(
            auth.authenticate("", PASSWORD, &ctx()).await.unwrap(),
            AuthOutcome::InvalidCredentials
        );
        assert_eq!(
            auth.authenticate(EMAIL, "", &ctx()).await.unwrap(),
            AuthOutcome::InvalidCredentials
        );
        assert!(store.access_logs().await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_password_counts_attempt() {
        let (store, auth, id) = setup(admin_account()).await;

        let outcome = auth.authenticate(EMAIL, "wrong", &ctx()).await.unwrap();
        assert_eq!(outcome, AuthOutcome::InvalidCredentials);

        let user = stored(&store, &id).await;
        assert_eq!(user.failed_attempts, 1);
        assert_eq!(user.locked_until, None);

        let logs = store.access_logs().await;
        assert_eq!(actions(&logs), vec![AccessAction::FailedLogin]);
        assert_eq!(logs[0].details, "Wrong password - attempt 1");
    }

    #[tokio::test]
    async fn test_fifth_failure_locks_account() {
        let mut account = admin_account();
        account.failed_attempts = 4;
        let (store, auth, id) = setup(account).await;

        let before = Utc::now();
        let outcome = auth.authenticate(EMAIL, "wrong", &ctx()).await.unwrap();
        let after = Utc::now();
        assert_eq!(outcome, AuthOutcome::InvalidCredentials);

        let user = stored(&store, &id).await;
        assert_eq!(user.failed_attempts, 5);
        let locked_until = user.locked_until.unwrap();
        assert!(locked_until >= before + Duration::minutes(15));
        assert!(locked_until <= after + Duration::minutes(15));

        let logs = store.access_logs().await;
        assert_eq!(
            actions(&logs),
            vec![AccessAction::AccountLocked, AccessAction::FailedLogin]
        );
        assert_eq!(logs[0].details, "Account locked after 5 failed attempts");
        assert_eq!(logs[1].details, "Wrong password - attempt 5");
    }

    #[tokio::test]
    async fn test_active_lock_rejects_without_checking_password() {
        let mut account = admin_account();
        // An unparseable hash makes any verification attempt an error.
        account.password_hash = "not-a-hash".to_string();
        account.failed_attempts = 5;
        let locked_until = Utc::now() + Duration::minutes(5);
        account.locked_until = Some(locked_until);
        let (store, auth, id) = setup(account).await;

        let outcome = auth.authenticate(EMAIL, PASSWORD, &ctx()).await.unwrap();
        assert_eq!(outcome, AuthOutcome::AccountLocked { locked_until });

        let user = stored(&store, &id).await;
        assert_eq!(user.failed_attempts, 5);

        let logs = store.access_logs().await;
        assert_eq!(actions(&logs), vec![AccessAction::FailedLogin]);
        assert_eq!(logs[0].user_id.as_deref(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_expired_lock_allows_login_and_resets() {
        let mut account = admin_account();
        account.failed_attempts = 5;
        account.locked_until = Some(Utc::now() - Duration::minutes(1));
        let (store, auth, id) = setup(account).await;

        let outcome = auth.authenticate(EMAIL, PASSWORD, &ctx()).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Authenticated(_)));

        let user = stored(&store, &id).await;
        assert_eq!(user.failed_attempts, 0);
        assert_eq!(user.locked_until, None);
    }

    #[tokio::test]
    async fn test_expired_lock_relocks_on_next_failure() {
        let mut account = admin_account();
        account.failed_attempts = 5;
        account.locked_until = Some(Utc::now() - Duration::minutes(1));
        let (store, auth, id) = setup(account).await;

        let outcome = auth.authenticate(EMAIL, "wrong", &ctx()).await.unwrap();
        assert_eq!(outcome, AuthOutcome::InvalidCredentials);

        let user = stored(&store, &id).await;
        assert_eq!(user.failed_attempts, 6);
        assert!(user.is_locked());
        assert_eq!(
            actions(&store.access_logs().await),
            vec![AccessAction::AccountLocked, AccessAction::FailedLogin]
        );
    }

    #[tokio::test]
    async fn test_success_resets_prior_failures() {
        let mut account = admin_account();
        account.failed_attempts = 3;
        let (store, auth, id) = setup(account).await;

        auth.authenticate(EMAIL, PASSWORD, &ctx()).await.unwrap();
        assert_eq!(stored(&store, &id).await.failed_attempts, 0);
    }

    #[tokio::test]
    async fn test_inactive_account_is_indistinguishable() {
        let mut account = admin_account();
        account.is_active = false;
        let (store, auth, id) = setup(account).await;

        let outcome = auth.authenticate(EMAIL, PASSWORD, &ctx()).await.unwrap();
        assert_eq!(outcome, AuthOutcome::InvalidCredentials);
        assert_eq!(stored(&store, &id).await.failed_attempts, 0);

        let logs = store.access_logs().await;
        assert_eq!(actions(&logs), vec![AccessAction::FailedLogin]);
        assert_eq!(logs[0].details, "Attempt on deactivated account");
    }

    #[tokio::test]
    async fn test_consecutive_failures_then_locked() {
        let (store, auth, id) = setup(admin_account()).await;

        for _ in 0..5 {
            let outcome = auth.authenticate(EMAIL, "wrong", &ctx()).await.unwrap();
            assert_eq!(outcome, AuthOutcome::InvalidCredentials);
        }
        assert!(stored(&store, &id).await.is_locked());

        let outcome = auth.authenticate(EMAIL, PASSWORD, &ctx()).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::AccountLocked { .. }));

        let logs = store.access_logs().await;
        let locked_entries = logs
            .iter()
            .filter(|e| e.action == AccessAction::AccountLocked)
            .count();
        assert_eq!(locked_entries, 1);
        assert_eq!(logs.len(), 7);
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_outcome() {
        let store = Arc::new(MemoryStore::new());
        let account = admin_account();
        let id = account.id.clone();
        store.insert_user(account).await;
        let auth = Authenticator::new(
            store.clone(),
            Arc::new(FailingLogStore),
            SecurityConfig::default(),
        );

        let outcome = auth.authenticate(EMAIL, PASSWORD, &ctx()).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Authenticated(_)));
        assert!(stored(&store, &id).await.last_login.is_some());

        let outcome = auth.authenticate(EMAIL, "wrong", &ctx()).await.unwrap();
        assert_eq!(outcome, AuthOutcome::InvalidCredentials);
        assert_eq!(stored(&store, &id).await.failed_attempts, 1);
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let store = Arc::new(MemoryStore::new());
        let account = admin_account();
        let id = account.id.clone();
        store.insert_user(account).await;
        let auth = Authenticator::new(
            store.clone(),
            store.clone(),
            SecurityConfig {
                max_login_attempts: 2,
                lockout_duration_minutes: 30,
                ..Default::default()
            },
        );

        auth.authenticate(EMAIL, "wrong", &ctx()).await.unwrap();
        assert!(!stored(&store, &id).await.is_locked());

        auth.authenticate(EMAIL, "wrong", &ctx()).await.unwrap();
        let user = stored(&store, &id).await;
        assert!(user.locked_until.unwrap() > Utc::now() + Duration::minutes(29));
    }

    async fn fastest_rejection(auth: &Authenticator, email: &str) -> std::time::Duration {
        let mut fastest = std::time::Duration::MAX;
        for _ in 0..3 {
            let started = std::time::Instant::now();
            let outcome = auth.authenticate(email, "wrong", &ctx()).await.unwrap();
            assert_eq!(outcome, AuthOutcome::InvalidCredentials);
            fastest = fastest.min(started.elapsed());
        }
        fastest
    }

    #[tokio::test]
    async fn test_rejections_take_as_long_as_a_password_check() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(admin_account()).await;
        let inactive = UserAccount::new(NewUser {
            email: "former@erp.com".to_string(),
            name: "Former".to_string(),
            password_hash: hash_password(PASSWORD).unwrap(),
            role: "user".to_string(),
            is_active: false,
        });
        store.insert_user(inactive).await;

        let auth = Authenticator::new(
            store.clone(),
            store.clone(),
            SecurityConfig {
                max_login_attempts: 100,
                ..Default::default()
            },
        );

        let wrong_password = fastest_rejection(&auth, EMAIL).await;
        let unknown_email = fastest_rejection(&auth, "ghost@erp.com").await;
        let deactivated = fastest_rejection(&auth, "former@erp.com").await;

        assert!(
            unknown_email * 4 >= wrong_password,
            "unknown={:?} wrong={:?}",
            unknown_email,
            wrong_password
        );
        assert!(
            deactivated * 4 >= wrong_password,
            "deactivated={:?} wrong={:?}",
            deactivated,
            wrong_password
        );
    }

    #[tokio::test]
    async fn test_sqlite_lock_expiry_and_recovery() {
        use crate::database::{SqliteStore, run_migrations};
        use sqlx::sqlite::SqlitePoolOptions;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        let store = Arc::new(SqliteStore::new(Arc::new(pool)));
        let user = store
            .create_user(NewUser {
                email: EMAIL.to_string(),
                name: "Administrador".to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
                role: "admin".to_string(),
                is_active: true,
            })
            .await
            .unwrap();
        let auth = Authenticator::new(store.clone(), store.clone(), SecurityConfig::default());

        for _ in 0..5 {
            let outcome = auth.authenticate(EMAIL, "wrong", &ctx()).await.unwrap();
            assert_eq!(outcome, AuthOutcome::InvalidCredentials);
        }

        let locked = store.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(locked.failed_attempts, 5);
        assert!(locked.is_locked());

        let outcome = auth.authenticate(EMAIL, PASSWORD, &ctx()).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::AccountLocked { .. }));

        let newest_first = store
            .list_access_logs(&AccessLogFilter::default())
            .await
            .unwrap();
        assert_eq!(
            actions(&newest_first[..3]),
            vec![
                AccessAction::FailedLogin,
                AccessAction::FailedLogin,
                AccessAction::AccountLocked,
            ]
        );
        assert_eq!(newest_first[0].details, "Account locked - attempt during lockout");
        assert_eq!(newest_first[1].details, "Wrong password - attempt 5");

        store
            .update_user(
                &user.id,
                UserUpdate {
                    locked_until: Some(Some(Utc::now() - Duration::minutes(1))),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let outcome = auth.authenticate(EMAIL, PASSWORD, &ctx()).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Authenticated(_)));

        let recovered = store.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(recovered.failed_attempts, 0);
        assert_eq!(recovered.locked_until, None);
        assert!(recovered.last_login.is_some());
    }

    #[test]
    fn test_outcome_into_identity() {
        assert!(matches!(
            AuthOutcome::InvalidCredentials.into_identity(),
            Err(AppError::Auth(_))
        ));
        assert!(matches!(
            AuthOutcome::AccountLocked {
                locked_until: Utc::now()
            }
            .into_identity(),
            Err(AppError::AccountLocked { .. })
        ));
    }
}
