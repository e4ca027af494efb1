use crate::error::{AppError, Result};

/// Validates registration / login input.
///
/// Both fields are required. No format or strength rules apply: the email is
/// an opaque login name matched exactly.
///
/// # Arguments
///
/// * `email` - The login name.
/// * `password` - The plaintext password.
///
/// # Returns
///
/// A `Result<()>` indicating whether the input is usable.
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Missing fields".to_string()));
    }

    if email.len() > 255 {
        return Err(AppError::Validation(
            "Email must be at most 255 characters".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_rejected() {
        assert!(validate_credentials("", "pw").is_err());
        assert!(validate_credentials("a@x.com", "").is_err());
        assert!(validate_credentials("", "").is_err());
    }

    #[test]
    fn any_non_empty_pair_is_accepted() {
        assert!(validate_credentials("a@x.com", "pw1").is_ok());
        assert!(validate_credentials("not an email", "x").is_ok());
    }

    #[test]
    fn overlong_email_is_rejected() {
        let email = "a".repeat(256);
        assert!(validate_credentials(&email, "pw").is_err());
    }
}
