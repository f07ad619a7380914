use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use std::sync::LazyLock;

use crate::utils::error::{AppError, AppResult};

/// Prefixes of bcrypt hashes carried over from accounts created before the
/// switch to argon2.
const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    if BCRYPT_PREFIXES
        .iter()
        .any(|prefix| password_hash.starts_with(prefix))
    {
        return bcrypt::verify(password, password_hash)
            .map_err(|e| AppError::Internal(format!("Failed to verify bcrypt hash: {}", e)));
    }

    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::Internal(format!("Failed to parse password hash: {}", e)))?;

    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}

/// Argon2 hash of a credential nobody holds, built with the same parameters
/// as real hashes so verifying against it takes as long as a real check.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("erp-auth::no-such-account").ok());

pub fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH.as_deref()
}

/// Verifies `password` against [`dummy_hash`] and discards the result, so a
/// rejection that needs no real comparison costs the same as a wrong password.
pub async fn verify_dummy_password_blocking(password: String) {
    let result = tokio::task::spawn_blocking(move || match dummy_hash() {
        Some(hash) => verify_password(&password, hash).map(|_| ()),
        None => Err(AppError::Internal("Dummy password hash unavailable".to_string())),
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Dummy password verification failed: {}", e),
        Err(e) => tracing::warn!("Dummy password verification task failed: {}", e),
    }
}

/// Hashes on the blocking pool so request workers are not stalled.
pub async fn hash_password_blocking(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

pub async fn verify_password_blocking(password: String, password_hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
}
