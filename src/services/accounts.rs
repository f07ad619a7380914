use serde::{Deserialize, Serialize};

use crate::database::UserStore;
use crate::models::user::{DEFAULT_ROLE, NewUser, UserAccount, UserUpdate};
use crate::utils::crypto::hash_password_blocking;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::{validate_email, validate_password_strength};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Option<String>,
}

pub async fn create_account(
    users: &dyn UserStore,
    request: CreateAccountRequest,
) -> AppResult<UserAccount> {
    validate_email(&request.email)?;
    validate_password_strength(&request.password)?;

    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name cannot be empty".to_string()));
    }

    let password_hash = hash_password_blocking(request.password).await?;

    let user = users
        .create_user(NewUser {
            email: request.email,
            name: request.name,
            password_hash,
            role: request.role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            is_active: true,
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "Account created");

    Ok(user)
}

/// Clears the failed-attempt counter and any lock, active or stale. Returns
/// whether the lock was in effect.
pub async fn unlock_account(users: &dyn UserStore, id: &str) -> AppResult<bool> {
    let user = users
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

    let was_locked = user.is_locked();
    users.update_user(id, UserUpdate::unlock()).await?;

    tracing::info!(user_id = %id, was_locked, "Account unlocked");

    Ok(was_locked)
}
