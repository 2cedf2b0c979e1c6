//! Account validation.

use super::model::AccountConfig;

/// Validation error for account configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Host is empty.
    EmptyHost,
    /// Port is zero.
    InvalidPort,
    /// Username is empty.
    EmptyUsername,
    /// Password is empty.
    EmptyPassword,
    /// Username contains CR, LF or another control character.
    UsernameControlCharacter,
    /// Password contains CR, LF or another control character.
    PasswordControlCharacter,
    /// A timeout is zero.
    ZeroTimeout,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyHost => "POP3 server is required",
            Self::InvalidPort => "POP3 port must be 1-65535",
            Self::EmptyUsername => "Username is required",
            Self::EmptyPassword => "Password is required",
            Self::UsernameControlCharacter => "Username must not contain line breaks or control characters",
            Self::PasswordControlCharacter => "Password must not contain line breaks or control characters",
            Self::ZeroTimeout => "Timeouts must be at least one second",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyHost => "host",
            Self::InvalidPort => "port",
            Self::EmptyUsername | Self::UsernameControlCharacter => "username",
            Self::EmptyPassword | Self::PasswordControlCharacter => "password",
            Self::ZeroTimeout => "options",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

fn has_control_character(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_control())
}

/// Result of validating an account.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate an account configuration.
///
/// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all errors.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are invalid.
pub fn validate_account(account: &AccountConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if account.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if account.port == Some(0) {
        errors.push(ValidationError::InvalidPort);
    }
    if account.username.trim().is_empty() {
        errors.push(ValidationError::EmptyUsername);
    }
    if account.password.is_empty() {
        errors.push(ValidationError::EmptyPassword);
    }
    if has_control_character(&account.username) {
        errors.push(ValidationError::UsernameControlCharacter);
    }
    if has_control_character(&account.password) {
        errors.push(ValidationError::PasswordControlCharacter);
    }
    if account.options.connect_timeout_secs == 0 || account.options.io_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_account() {
        let mut account = AccountConfig::new("", "", "");
        account.port = Some(0);

        let errors = validate_account(&account).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyHost,
                ValidationError::InvalidPort,
                ValidationError::EmptyUsername,
                ValidationError::EmptyPassword,
            ]
        );
    }

    #[test]
    fn test_validate_complete_account() {
        let account = AccountConfig::new("pop.example.com", "alice", "secret");
        assert!(validate_account(&account).is_ok());
    }

    #[test]
    fn test_zero_timeout() {
        let mut account = AccountConfig::new("pop.example.com", "alice", "secret");
        account.options.io_timeout_secs = 0;

        let errors = validate_account(&account).unwrap_err();
        assert_eq!(errors, vec![ValidationError::ZeroTimeout]);
        assert_eq!(errors[0].field(), "options");
    }

    #[test]
    fn test_line_breaks_in_credentials() {
        let account = AccountConfig::new("pop.example.com", "alice\r\nDELE 1", "pw\n");

        let errors = validate_account(&account).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::UsernameControlCharacter,
                ValidationError::PasswordControlCharacter,
            ]
        );
        assert_eq!(errors[0].field(), "username");
    }
}
