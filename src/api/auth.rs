use axum::{
    Extension, Json, Router,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::AppState;
use crate::models::access_log::AccessAction;
use crate::models::user::UserIdentity;
use crate::utils::error::AppResult;
use crate::utils::helpers::request_context;
use crate::utils::jwt::Claims;

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserIdentity,
    pub token: String,
    pub expires_in: i64,
}

async fn health_check() -> &'static str {
    "OK"
}

async fn login(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let context = request_context(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    let identity = state
        .authenticator
        .authenticate(&payload.email, &payload.password, &context)
        .await?
        .into_identity()?;

    let token = state.jwt_service.generate_token(&identity)?;

    Ok(Json(LoginResponse {
        user: identity,
        token,
        expires_in: state.jwt_service.session_timeout().num_seconds(),
    }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> StatusCode {
    let context = request_context(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    state
        .authenticator
        .record_access(
            Some(&claims.sub),
            AccessAction::Logout,
            "Logout".to_string(),
            &context,
        )
        .await;

    StatusCode::OK
}

async fn session(Extension(claims): Extension<Claims>) -> Json<Claims> {
    Json(claims)
}

pub fn routes(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/session", get(session))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/login", post(login))
        .merge(protected)
        .with_state(state)
}
