//! Credential normalization and validation.

use regex::Regex;

use super::error::ValidationError;

/// Shortest accepted password, counted in Unicode scalar values.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Normalize email input to avoid case-sensitive duplicates.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Very light email check. Delivery is out of scope, so this only rejects obvious junk.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Check registration input. `email` must already be normalized.
///
/// # Errors
/// Returns the first rule the input breaks.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    if !valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_email("bob@example.com"), "bob@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
        assert!(!valid_email("no-tld@example"));
        assert!(!valid_email("spaces in@example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn validate_credentials_checks_email_first() {
        assert_eq!(
            validate_credentials("bad", "short"),
            Err(ValidationError::InvalidEmail)
        );
    }

    #[test]
    fn validate_credentials_enforces_password_length() {
        assert_eq!(
            validate_credentials("a@example.com", "1234567"),
            Err(ValidationError::PasswordTooShort)
        );
        assert_eq!(validate_credentials("a@example.com", "12345678"), Ok(()));
    }

    #[test]
    fn password_length_counts_characters_not_bytes() {
        // Eight characters, sixteen bytes.
        assert_eq!(validate_credentials("a@example.com", "ääääääää"), Ok(()));
        // Seven characters, fourteen bytes.
        assert_eq!(
            validate_credentials("a@example.com", "äääääää"),
            Err(ValidationError::PasswordTooShort)
        );
    }
}
