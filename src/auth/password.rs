//! Password policy and argon2 password storage.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use thiserror::Error;
use validator::ValidationError;

use crate::errors::ServiceError;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password too short: minimum {min_length} characters required")]
    TooShort { min_length: usize },

    #[error("Password too long: maximum {max_length} characters allowed")]
    TooLong { max_length: usize },

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one number")]
    MissingNumber,

    #[error("Password must contain at least one special character")]
    MissingSpecialChar,
}

impl PasswordPolicyError {
    fn code(&self) -> &'static str {
        match self {
            Self::TooShort { .. } => "password_too_short",
            Self::TooLong { .. } => "password_too_long",
            Self::MissingUppercase => "password_missing_uppercase",
            Self::MissingLowercase => "password_missing_lowercase",
            Self::MissingNumber => "password_missing_number",
            Self::MissingSpecialChar => "password_missing_special_char",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special_chars: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: 14,
            require_uppercase: true,
            require_lowercase: true,
            require_numbers: true,
            require_special_chars: true,
        }
    }
}

impl PasswordPolicy {
    pub fn check(&self, password: &str) -> Result<(), PasswordPolicyError> {
        let length = password.chars().count();
        if length < self.min_length {
            return Err(PasswordPolicyError::TooShort {
                min_length: self.min_length,
            });
        }
        if length > self.max_length {
            return Err(PasswordPolicyError::TooLong {
                max_length: self.max_length,
            });
        }
        if self.require_uppercase && !password.chars().any(char::is_uppercase) {
            return Err(PasswordPolicyError::MissingUppercase);
        }
        if self.require_lowercase && !password.chars().any(char::is_lowercase) {
            return Err(PasswordPolicyError::MissingLowercase);
        }
        if self.require_numbers && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordPolicyError::MissingNumber);
        }
        if self.require_special_chars && password.chars().all(char::is_alphanumeric) {
            return Err(PasswordPolicyError::MissingSpecialChar);
        }
        Ok(())
    }
}

/// `validator` hook applying the default [`PasswordPolicy`].
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    PasswordPolicy::default().check(password).map_err(|err| {
        let mut error = ValidationError::new(err.code());
        error.message = Some(err.to_string().into());
        error
    })
}

/// Argon2id hash in PHC string form with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {e}")))
}

/// False for a wrong password and for a stored hash that does not parse.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_requires_every_character_class() {
        let policy = PasswordPolicy::default();
        assert_eq!(policy.check("Ab1!xy"), Ok(()));
        assert_eq!(
            policy.check("Ab1!"),
            Err(PasswordPolicyError::TooShort { min_length: 6 })
        );
        assert_eq!(
            policy.check("Ab1!Ab1!Ab1!Ab1!"),
            Err(PasswordPolicyError::TooLong { max_length: 14 })
        );
        assert_eq!(policy.check("ab1!xyz"), Err(PasswordPolicyError::MissingUppercase));
        assert_eq!(policy.check("AB1!XYZ"), Err(PasswordPolicyError::MissingLowercase));
        assert_eq!(policy.check("Abc!xyz"), Err(PasswordPolicyError::MissingNumber));
        assert_eq!(policy.check("Abc1xyz"), Err(PasswordPolicyError::MissingSpecialChar));
    }

    #[test]
    fn validator_hook_reports_the_failed_rule() {
        let err = validate_password("short").unwrap_err();
        assert_eq!(err.code, "password_too_short");
    }

    #[test]
    fn hashes_verify_and_are_salted() {
        let first = hash_password("S3cret!pw").unwrap();
        let second = hash_password("S3cret!pw").unwrap();

        assert_ne!(first, second);
        assert!(first.starts_with("$argon2"));
        assert!(verify_password("S3cret!pw", &first));
        assert!(!verify_password("s3cret!pw", &first));
        assert!(!verify_password("S3cret!pw", "not-a-phc-string"));
    }
}
