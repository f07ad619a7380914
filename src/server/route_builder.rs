use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::AppState;
use crate::config::{Config, SecurityConfig};
use crate::database::{self, AccessLogStore, SqliteStore, UserStore};
use crate::services::auth::Authenticator;
use crate::services::init::ensure_admin_account;
use crate::utils::jwt::JwtService;

pub fn build_state(
    users: Arc<dyn UserStore>,
    access_logs: Arc<dyn AccessLogStore>,
    secret_key: &str,
    security: SecurityConfig,
) -> Arc<AppState> {
    let jwt_service = Arc::new(JwtService::new(secret_key, security.session_timeout()));
    let authenticator = Arc::new(Authenticator::new(
        users.clone(),
        access_logs.clone(),
        security,
    ));

    Arc::new(AppState {
        authenticator,
        users,
        access_logs,
        jwt_service,
    })
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", crate::api::routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Connects the database, seeds the admin account and assembles the router.
pub async fn register_routes(config: &Config) -> anyhow::Result<Router> {
    let db = database::create_pool(&config.database_url).await?;

    tracing::info!("Database connected and migrations applied");

    let store = Arc::new(SqliteStore::new(db));

    ensure_admin_account(&*store, &config.admin).await?;

    tracing::info!(
        max_login_attempts = config.security.max_login_attempts,
        lockout_minutes = config.security.lockout_duration_minutes,
        session_timeout_secs = config.security.session_timeout_secs,
        "Security policy loaded"
    );

    let state = build_state(
        store.clone(),
        store,
        &config.secret_key,
        config.security.clone(),
    );

    Ok(build_router(state))
}
