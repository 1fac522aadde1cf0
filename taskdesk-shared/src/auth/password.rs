//! Password hashing with Argon2id
//!
//! Hashes are stored as PHC strings, so the parameters travel with each hash
//! and can be raised later without invalidating existing accounts.
//!
//! # Parameters
//!
//! - **Algorithm**: Argon2id, version 0x13
//! - **Memory**: 19 MiB (19456 KiB)
//! - **Iterations**: 2
//! - **Parallelism**: 1
//!
//! # Example
//!
//! ```
//! use taskdesk_shared::auth::password::{hash_password, verify_password};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("correct horse battery")?;
//! assert!(verify_password("correct horse battery", &hash)?);
//! assert!(!verify_password("wrong", &hash)?);
//! # Ok(())
//! # }
//! ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a valid PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(19456, 2, 1, Some(32))
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// Returns `Ok(false)` on mismatch; errors are reserved for unusable hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters come from the hash itself
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Checks a new password against the account policy
///
/// Rejects passwords that are shorter than [`MIN_PASSWORD_LENGTH`], made only
/// of digits, or equal to the account email.
///
/// ```
/// use taskdesk_shared::auth::password::validate_password;
///
/// assert!(validate_password("TestPass123!", "a@example.com").is_ok());
/// assert!(validate_password("12345678901", "a@example.com").is_err());
/// ```
pub fn validate_password(password: &str, email: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("Password cannot be entirely numeric".to_string());
    }

    if password.trim().eq_ignore_ascii_case(email.trim()) {
        return Err("Password cannot be the same as the email address".to_string());
    }

    Ok(())
}
