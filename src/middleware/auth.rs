use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::api::AppState;
use crate::models::user::ADMIN_ROLE;
use crate::utils::error::AppError;
use crate::utils::helpers::bearer_token;
use crate::utils::jwt::Claims;

/// Verifies the bearer token and exposes its [`Claims`] as a request
/// extension. Tokens of deleted or deactivated accounts are refused.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Auth("Missing or invalid authorization header".to_string()))?;

    let claims = state.jwt_service.verify_token(token)?;

    let user = state.users.find_user_by_id(&claims.sub).await?;
    if !user.is_some_and(|u| u.is_active) {
        return Err(AppError::Auth("Account is no longer active".to_string()));
    }

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    let is_admin = request
        .extensions()
        .get::<Claims>()
        .is_some_and(|claims| claims.role == ADMIN_ROLE);

    if !is_admin {
        return Err(AppError::Forbidden("Admin privileges required".to_string()));
    }

    Ok(next.run(request).await)
}
