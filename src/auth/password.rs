//! Password hashing module
//!
//! Argon2id hashing in the PHC string format. `needs_rehash` reports whether a
//! stored hash was produced with parameters older than the current defaults,
//! so credentials upgrade transparently on successful login.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, Params};

/// Hash a plaintext password with the current default parameters
pub fn hash_password(plain: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(plain.as_bytes(), &salt)?;

    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC hash string
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };

    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Whether a stored hash predates the current algorithm or parameters
pub fn needs_rehash(stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return true;
    };

    if parsed.algorithm != argon2::ARGON2ID_IDENT {
        return true;
    }

    let current = Params::default();
    let m = parsed.params.get_decimal("m");
    let t = parsed.params.get_decimal("t");
    let p = parsed.params.get_decimal("p");

    m != Some(current.m_cost()) || t != Some(current.t_cost()) || p != Some(current.p_cost())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("correct horse").expect("hashing succeeds");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same input").unwrap();
        let b = hash_password("same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fresh_hash_needs_no_rehash() {
        let hash = hash_password("some password").unwrap();
        assert!(!needs_rehash(&hash));
    }

    #[test]
    fn test_garbage_hash_needs_rehash() {
        assert!(needs_rehash("not-a-phc-string"));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
