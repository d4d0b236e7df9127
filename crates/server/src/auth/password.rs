use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Result of checking a password against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordCheck {
    pub valid: bool,
    /// The stored hash is a legacy bcrypt hash and should be replaced.
    pub needs_rehash: bool,
}

/// Hash a password with argon2id.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verify a password. Accounts migrated from the previous service
/// still hold bcrypt hashes; those verify and ask for a rehash.
pub fn check_password(password: &str, hash: &str) -> Result<PasswordCheck, String> {
    if hash.starts_with("$argon2") {
        let parsed = PasswordHash::new(hash).map_err(|e| e.to_string())?;
        let valid = Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();
        Ok(PasswordCheck {
            valid,
            needs_rehash: false,
        })
    } else if hash.starts_with("$2a$") || hash.starts_with("$2b$") || hash.starts_with("$2y$") {
        let valid = bcrypt::verify(password, hash).unwrap_or(false);
        Ok(PasswordCheck {
            valid,
            needs_rehash: valid,
        })
    } else {
        Err("Unknown hash format".to_string())
    }
}
