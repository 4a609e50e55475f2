//! Password hashing
//!
//! Argon2id, stored as a PHC string
//! (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`). Verification reads the
//! cost parameters back out of the stored string.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

const SALT_LEN: usize = 16;

/// Production cost (the argon2 crate's recommended defaults).
pub fn default_params() -> Params {
    Params::default()
}

/// Minimum cost. For fixtures and tests only.
pub fn low_cost_params() -> Params {
    Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None).unwrap_or_default()
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    hash_with_params(password, default_params())
}

pub fn hash_with_params(password: &str, params: Params) -> Result<String, password_hash::Error> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt)?;

    let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params).hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// False for a wrong password and for anything that is not a PHC string.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verifies_and_is_salted() {
        let a = hash_with_params("testpassword123", low_cost_params()).unwrap();
        let b = hash_with_params("testpassword123", low_cost_params()).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$v=19$"));
        assert!(verify_password("testpassword123", &a));
        assert!(verify_password("testpassword123", &b));
        assert!(!verify_password("wrongpassword", &a));
    }

    #[test]
    fn test_malformed_hashes_never_verify() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "plain-text"));
        assert!(!verify_password("x", "sha256$10$00$00"));
        assert!(!verify_password("x", "$argon2id$v=19$m=8,t=1,p=1$bm90LWEtc2FsdA$"));
    }

    #[test]
    fn test_cost_is_read_from_the_stored_hash() {
        let cheap = hash_with_params("abc", low_cost_params()).unwrap();
        assert!(cheap.contains("m=8,t=1,p=1"));
        assert!(verify_password("abc", &cheap));

        let h = hash_password("abc").unwrap();
        assert!(h.contains(&format!("m={}", Params::DEFAULT_M_COST)));
        assert!(verify_password("abc", &h));
    }
}
