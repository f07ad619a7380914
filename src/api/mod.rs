pub mod admin;
pub mod auth;

use axum::Router;
use std::sync::Arc;

use crate::database::{AccessLogStore, UserStore};
use crate::services::auth::Authenticator;
use crate::utils::jwt::JwtService;

pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub users: Arc<dyn UserStore>,
    pub access_logs: Arc<dyn AccessLogStore>,
    pub jwt_service: Arc<JwtService>,
}

pub fn routes(state: Arc<AppState>) -> Router {
    let admin_routes = admin::routes(state.clone())
        .layer(axum::middleware::from_fn(
            crate::middleware::auth::admin_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    Router::new()
        .nest("/auth", auth::routes(state.clone()))
        .nest("/admin", admin_routes)
}
