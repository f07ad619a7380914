use crate::utils::error::{AppError, AppResult};

const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Returns every rule the password breaks, in a stable order.
pub fn password_policy_violations(password: &str) -> Vec<&'static str> {
    let mut errors = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push("at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("at least one digit");
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        errors.push("at least one special character");
    }

    errors
}

pub fn validate_password_strength(password: &str) -> AppResult<()> {
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(
            "Password must be at most 128 characters long".to_string(),
        ));
    }

    let violations = password_policy_violations(password);
    if !violations.is_empty() {
        return Err(AppError::Validation(format!(
            "Password requires {}",
            violations.join(", ")
        )));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if email.trim().is_empty() {
        return Err(AppError::Validation("Email cannot be empty".to_string()));
    }

    if email.len() > 254 {
        return Err(AppError::Validation(
            "Email must be at most 254 characters long".to_string(),
        ));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::Validation("Email is not valid".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_password_passes() {
        assert!(validate_password_strength("Admin@123").is_ok());
    }

    #[test]
    fn test_all_violations_reported() {
        let violations = password_policy_violations("abc");
        assert_eq!(
            violations,
            vec![
                "at least 8 characters",
                "at least one uppercase letter",
                "at least one digit",
                "at least one special character",
            ]
        );
    }

    #[test]
    fn test_weak_password_rejected() {
        match validate_password_strength("password") {
            Err(AppError::Validation(msg)) => assert!(msg.contains("uppercase")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_max_length_counts_characters() {
        // 100 two-byte characters are 200 bytes but only 100 characters.
        let password = format!("Aa1!{}", "é".repeat(100));
        assert!(password.len() > MAX_PASSWORD_LENGTH);
        assert!(validate_password_strength(&password).is_ok());

        let too_long = format!("Aa1!{}", "é".repeat(125));
        assert!(matches!(
            validate_password_strength(&too_long),
            Err(AppError::Validation(msg)) if msg.contains("128")
        ));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("admin@erp.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("admin").is_err());
        assert!(validate_email("@erp.com").is_err());
    }
}
