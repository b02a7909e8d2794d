//! Argon2id password hashing in PHC string format.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

use crate::core::error::{AppError, Result};

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::Password;
    use fake::Fake;

    #[test]
    fn test_hash_and_verify() {
        let password: String = Password(8..24).fake();
        let hash = hash_password(&password).unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&password, &hash));
        assert!(!verify_password("definitely-wrong", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("testpass123").unwrap();
        let b = hash_password("testpass123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("testpass123", "not-a-phc-string"));
    }
}
