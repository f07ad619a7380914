use crate::config::AdminConfig;
use crate::database::UserStore;
use crate::models::user::ADMIN_ROLE;
use crate::services::accounts::{CreateAccountRequest, create_account};
use crate::utils::error::AppResult;

pub async fn ensure_admin_account(users: &dyn UserStore, admin: &AdminConfig) -> AppResult<()> {
    if users.find_user_by_email(&admin.email).await?.is_some() {
        tracing::info!("Admin account already exists");
        return Ok(());
    }

    tracing::info!(email = %admin.email, "Creating admin account");

    create_account(
        users,
        CreateAccountRequest {
            email: admin.email.clone(),
            name: admin.name.clone(),
            password: admin.password.clone(),
            role: Some(ADMIN_ROLE.to_string()),
        },
    )
    .await?;

    Ok(())
}
