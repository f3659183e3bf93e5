//! Password policy enforcement for new passwords.

use quill_core::config::PasswordConfig;
use quill_core::error::AppError;
use quill_core::result::AppResult;

/// Validates password strength against the configured policy.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    /// Minimum password length in characters.
    min_length: usize,
}

impl PasswordValidator {
    /// Creates a validator from password configuration.
    pub fn new(config: &PasswordConfig) -> Self {
        Self {
            min_length: config.min_length,
        }
    }

    /// Validates a password against every policy rule.
    ///
    /// Returns the first violation found as a `Validation` error.
    pub fn validate(&self, password: &str) -> AppResult<()> {
        if password.chars().count() < self.min_length {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }

        if !password.chars().any(char::is_uppercase) {
            return Err(AppError::validation(
                "Password must contain at least one uppercase letter",
            ));
        }

        if !password.chars().any(char::is_lowercase) {
            return Err(AppError::validation(
                "Password must contain at least one lowercase letter",
            ));
        }

        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(AppError::validation(
                "Password must contain at least one digit",
            ));
        }

        let estimate = zxcvbn::zxcvbn(password, &[]);
        if estimate.score() < zxcvbn::Score::Three {
            return Err(AppError::validation(
                "Password is too weak. Please use a stronger password with more entropy.",
            ));
        }

        Ok(())
    }

    /// Validates that a new password differs from the current one.
    pub fn validate_not_same(&self, current: &str, new: &str) -> AppResult<()> {
        if current == new {
            return Err(AppError::validation(
                "New password must be different from the current password",
            ));
        }
        Ok(())
    }
}
